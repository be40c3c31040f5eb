//! # Polarity
//!
//! Binary sentiment classification: load a labeled corpus, featurize it,
//! train a logistic regression model, evaluate it, persist it, and predict.
//!
//! ## Features
//!
//! - TF-IDF over word and character n-grams with a pluggable analyzer
//! - L2-regularized logistic regression trained by stochastic dual coordinate ascent
//! - Accuracy, AUC, F1, precision, recall and log-loss evaluation
//! - Checksummed, versioned model archives
//! - Parallel batch inference that keeps input order
//!
//! ```no_run
//! use polarity::config::PipelineConfig;
//! use polarity::pipeline::Orchestrator;
//!
//! let ready = Orchestrator::new(PipelineConfig::default())?.run()?;
//! let prediction = ready.predict_one("This was a very bad steak")?;
//! println!("{} -> {}", prediction.text, prediction.sentiment());
//! # Ok::<(), polarity::error::PolarityError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod ml;
pub mod pipeline;

pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::dataset::LabeledExample;
    pub use crate::error::{PolarityError, Result};
    pub use crate::inference::{Prediction, SentimentClass, classify, predict_many, predict_one};
    pub use crate::ml::{EvaluationMetrics, TrainedModel, evaluate};
    pub use crate::pipeline::{Orchestrator, PipelineState, ReadyPipeline};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
