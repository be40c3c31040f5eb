//! Text analysis module for Polarity.
//!
//! Turns raw review text into a stream of normalized tokens that the
//! featurizer counts. An analysis pipeline is a tokenizer followed by a chain
//! of filters:
//!
//! ```text
//! Raw Text → Tokenizer → Filter 1 → ... → Filter N → Token Stream
//! ```
//!
//! Pipelines are described by [`AnalyzerOptions`], which is serializable so a
//! persisted model can rebuild exactly the analyzer it was trained with.

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::{Analyzer, AnalyzerOptions, PipelineAnalyzer, TokenizerKind};
pub use token::{Token, TokenStream};
pub use token_filter::Filter;
pub use tokenizer::Tokenizer;
