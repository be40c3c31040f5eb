//! Labeled corpus handling: record schema, delimited-file loading and the
//! train/test split.

pub mod loader;
pub mod record;
pub mod split;

pub use loader::{DatasetLoader, load_examples};
pub use record::{LabeledExample, parse_label};
pub use split::split;
