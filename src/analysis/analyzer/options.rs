//! Serializable description of an analysis pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token_filter::{LowercaseFilter, StopFilter};
use crate::analysis::tokenizer::{RegexTokenizer, Tokenizer, UnicodeWordTokenizer};
use crate::error::Result;

/// Which tokenizer the pipeline starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// Unicode word boundaries (UAX #29).
    UnicodeWord,
    /// Every match of the given regular expression.
    Regex(String),
}

/// Options describing how raw text is analyzed before featurization.
///
/// These travel with a persisted model so inference tokenizes exactly the way
/// training did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    /// Tokenizer at the head of the pipeline.
    pub tokenizer: TokenizerKind,
    /// Lowercase every token.
    pub lowercase: bool,
    /// Drop English function words (negations are kept).
    pub remove_stop_words: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerKind::UnicodeWord,
            lowercase: true,
            remove_stop_words: false,
        }
    }
}

impl AnalyzerOptions {
    /// Build the analyzer these options describe.
    pub fn build(&self) -> Result<PipelineAnalyzer> {
        let tokenizer: Arc<dyn Tokenizer> = match &self.tokenizer {
            TokenizerKind::UnicodeWord => Arc::new(UnicodeWordTokenizer::new()),
            TokenizerKind::Regex(pattern) => Arc::new(RegexTokenizer::with_pattern(pattern)?),
        };

        let mut analyzer = PipelineAnalyzer::new(tokenizer);
        if self.lowercase {
            analyzer = analyzer.add_filter(Arc::new(LowercaseFilter::new()));
        }
        if self.remove_stop_words {
            analyzer = analyzer.add_filter(Arc::new(StopFilter::new()));
        }

        Ok(analyzer)
    }
}
