//! Error types for the Polarity library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`PolarityError`] enum. Load, parse, train and save failures are fatal for
//! the pipeline; inference failures are reported per item.
//!
//! # Examples
//!
//! ```
//! use polarity::error::{PolarityError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(PolarityError::invalid_input("labels and features differ in length"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;
use std::path::Path;

use thiserror::Error;

/// The main error type for Polarity operations.
#[derive(Error, Debug)]
pub enum PolarityError {
    /// I/O errors (missing input file, unwritable model path, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed input rows (wrong column count, unparseable label).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid arguments handed to a component (length mismatch, empty training set).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No persisted model at the requested path.
    #[error("Model not found: {path}")]
    ModelNotFound { path: String },

    /// The persisted model could not be decoded.
    #[error("Corrupt model at {path}: {reason}")]
    CorruptModel { path: String, reason: String },

    /// Evaluation was requested over an empty dataset.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Analysis-related errors (tokenization, filtering, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Binary model encoding errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Delimited-text reader errors.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for operations that may fail with PolarityError.
pub type Result<T> = std::result::Result<T, PolarityError>;

impl PolarityError {
    /// Create a new parse error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        PolarityError::Parse(msg.into())
    }

    /// Create a new invalid input error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        PolarityError::InvalidInput(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        PolarityError::Analysis(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        PolarityError::Config(msg.into())
    }

    /// Create a new empty dataset error.
    pub fn empty_dataset<S: Into<String>>(msg: S) -> Self {
        PolarityError::EmptyDataset(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        PolarityError::Serialization(msg.into())
    }

    /// Create a model-not-found error for `path`.
    pub fn model_not_found(path: &Path) -> Self {
        PolarityError::ModelNotFound {
            path: path.display().to_string(),
        }
    }

    /// Create a corrupt-model error for `path`.
    pub fn corrupt_model<S: Into<String>>(path: &Path, reason: S) -> Self {
        PolarityError::CorruptModel {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}
