//! Single and batch inference over a trained model.
//!
//! [`predict_one`] scores one text directly on the calling thread.
//! [`predict_many`] fans a batch out over rayon and returns one
//! [`BatchPrediction`] per input, in input order; a failing item never aborts
//! the rest of the batch.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::config::InferenceOptions;
use crate::error::{PolarityError, Result};
use crate::ml::models::{DECISION_THRESHOLD, TrainedModel};

/// Probabilities strictly above this are displayed as positive.
pub const POSITIVE_THRESHOLD: f64 = 0.6;

/// Probabilities strictly below this are displayed as negative.
pub const NEGATIVE_THRESHOLD: f64 = 0.4;

/// Three-way display bucket for a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentClass {
    Positive,
    Negative,
    Neutral,
}

impl SentimentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentClass::Positive => "Positive",
            SentimentClass::Negative => "Negative",
            SentimentClass::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for SentimentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket a positive-class probability for display.
///
/// Independent of the binary label, which uses the 0.5 threshold.
pub fn classify(probability: f64) -> SentimentClass {
    if probability > POSITIVE_THRESHOLD {
        SentimentClass::Positive
    } else if probability < NEGATIVE_THRESHOLD {
        SentimentClass::Negative
    } else {
        SentimentClass::Neutral
    }
}

/// The model's verdict on one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub text: String,
    /// `probability >= 0.5`.
    pub predicted_label: bool,
    /// Positive-class probability in `[0, 1]`.
    pub probability: f64,
    /// Raw linear margin.
    pub score: f64,
}

impl Prediction {
    pub fn sentiment(&self) -> SentimentClass {
        classify(self.probability)
    }
}

/// Outcome of one batch item.
pub type BatchPrediction = Result<Prediction>;

/// Score a single text.
pub fn predict_one(model: &TrainedModel, text: &str) -> Result<Prediction> {
    let (score, probability) = model.score_text(text)?;
    Ok(Prediction {
        text: text.to_string(),
        predicted_label: probability >= DECISION_THRESHOLD,
        probability,
        score,
    })
}

/// Score every text in parallel; results follow input order.
pub fn predict_many<S: AsRef<str> + Sync>(model: &TrainedModel, texts: &[S]) -> Vec<BatchPrediction> {
    texts
        .par_iter()
        .map(|text| predict_one(model, text.as_ref()))
        .collect()
}

/// Score raw byte items, decoding each as UTF-8 on its own.
///
/// Items that are not valid UTF-8 yield an `InvalidInput` error in their slot.
pub fn predict_raw_batch(model: &TrainedModel, items: &[Vec<u8>]) -> Vec<BatchPrediction> {
    items
        .par_iter()
        .enumerate()
        .map(|(index, bytes)| {
            let text = std::str::from_utf8(bytes).map_err(|e| {
                PolarityError::invalid_input(format!("item {index} is not valid UTF-8: {e}"))
            })?;
            predict_one(model, text)
        })
        .collect()
}

/// Inference bound to a shared model and a dedicated worker pool.
#[derive(Debug)]
pub struct InferenceEngine {
    model: Arc<TrainedModel>,
    pool: ThreadPool,
}

impl InferenceEngine {
    pub fn new(model: Arc<TrainedModel>, options: &InferenceOptions) -> Result<Self> {
        if options.threads == 0 {
            return Err(PolarityError::config("inference.threads must be at least 1"));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.threads)
            .thread_name(|i| format!("polarity-inference-{i}"))
            .build()
            .map_err(|e| PolarityError::config(format!("cannot start inference pool: {e}")))?;
        Ok(Self { model, pool })
    }

    pub fn model(&self) -> &Arc<TrainedModel> {
        &self.model
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn predict_one(&self, text: &str) -> Result<Prediction> {
        predict_one(&self.model, text)
    }

    pub fn predict_many<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<BatchPrediction> {
        self.pool.install(|| predict_many(&self.model, texts))
    }

    pub fn predict_raw_batch(&self, items: &[Vec<u8>]) -> Vec<BatchPrediction> {
        self.pool.install(|| predict_raw_batch(&self.model, items))
    }
}
