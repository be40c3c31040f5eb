//! Analyzer implementations that combine tokenizers and filters.

mod analyzer;
mod options;
mod pipeline;

pub use analyzer::Analyzer;
pub use options::{AnalyzerOptions, TokenizerKind};
pub use pipeline::PipelineAnalyzer;
