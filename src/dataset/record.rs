//! Record schema for labeled examples.

use serde::{Deserialize, Serialize};

/// One labeled training or evaluation example.
///
/// `label == true` means positive sentiment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledExample {
    /// Raw review text.
    pub text: String,
    /// Ground truth.
    pub label: bool,
}

impl LabeledExample {
    pub fn new<S: Into<String>>(text: S, label: bool) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }

    pub fn positive<S: Into<String>>(text: S) -> Self {
        Self::new(text, true)
    }

    pub fn negative<S: Into<String>>(text: S) -> Self {
        Self::new(text, false)
    }
}

/// Parse a boolean-like label: `1`/`0` or `true`/`false` (case-insensitive).
pub fn parse_label(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    match raw {
        "1" => Some(true),
        "0" => Some(false),
        _ if raw.eq_ignore_ascii_case("true") => Some(true),
        _ if raw.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}
