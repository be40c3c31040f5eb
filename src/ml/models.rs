//! The trained linear classifier and the model bundle that gets persisted.

use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dataset::LabeledExample;
use crate::error::{PolarityError, Result};
use crate::ml::features::{FeatureVector, Featurizer, FeaturizerOptions, TextFeaturizer};
use crate::ml::store::ModelStore;
use crate::ml::trainer::{Trainer, TrainingStats};

/// Decision threshold on the positive-class probability.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// A linear scorer `score(x) = w·x + b` with logistic calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LinearModel {
    pub fn new(weights: Vec<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }

    pub fn dimension(&self) -> usize {
        self.weights.len()
    }

    /// Raw margin for `features`.
    pub fn score(&self, features: &FeatureVector) -> Result<f64> {
        if features.dimension() != self.dimension() {
            return Err(PolarityError::invalid_input(format!(
                "feature dimension {} does not match model dimension {}",
                features.dimension(),
                self.dimension()
            )));
        }
        Ok(features.dot(&self.weights) + self.bias)
    }

    /// Positive-class probability for `features`.
    pub fn probability(&self, features: &FeatureVector) -> Result<f64> {
        self.score(features).map(sigmoid)
    }
}

/// The logistic function, evaluated without overflow. Always within `[0, 1]`.
pub fn sigmoid(score: f64) -> f64 {
    if score >= 0.0 {
        1.0 / (1.0 + (-score).exp())
    } else {
        let e = score.exp();
        e / (1.0 + e)
    }
}

/// Model metadata for tracking model information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Unique model identifier.
    pub model_id: Uuid,
    /// Training timestamp.
    pub created_at: DateTime<Utc>,
    /// Name of the trainer that produced the classifier.
    pub trainer: String,
    /// Library version that trained the model.
    pub library_version: String,
    /// Number of training examples used.
    pub training_examples: usize,
    /// How many of them were positive.
    pub positive_examples: usize,
    /// Width of the feature vectors.
    pub feature_dimension: usize,
    /// Optimizer statistics.
    pub stats: TrainingStats,
}

/// Everything needed to score raw text: featurizer, classifier and metadata.
///
/// Immutable once built; share it behind an `Arc` for parallel inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    featurizer: TextFeaturizer,
    classifier: LinearModel,
    metadata: ModelMetadata,
}

impl TrainedModel {
    /// Bundle the parts, checking that their dimensions agree.
    pub fn new(
        featurizer: TextFeaturizer,
        classifier: LinearModel,
        metadata: ModelMetadata,
    ) -> Result<Self> {
        let model = Self {
            featurizer,
            classifier,
            metadata,
        };
        model.validate()?;
        Ok(model)
    }

    /// Fit a featurizer on the training texts, then a classifier on their vectors.
    pub fn train(
        examples: &[LabeledExample],
        featurizer_options: &FeaturizerOptions,
        trainer: &dyn Trainer,
    ) -> Result<Self> {
        if examples.is_empty() {
            return Err(PolarityError::invalid_input("cannot train on an empty dataset"));
        }

        let texts: Vec<&str> = examples.iter().map(|e| e.text.as_str()).collect();
        let labels: Vec<bool> = examples.iter().map(|e| e.label).collect();

        let featurizer = featurizer_options.fit(&texts)?;
        info!(
            "Featurizer fitted: {} terms from {} documents",
            featurizer.dimension(),
            featurizer.document_count()
        );

        let features = featurizer.transform_all(&texts)?;
        info!("Training {} on {} examples", trainer.name(), examples.len());
        let outcome = trainer.fit(&features, &labels)?;

        let metadata = ModelMetadata {
            model_id: Uuid::new_v4(),
            created_at: Utc::now(),
            trainer: trainer.name().to_string(),
            library_version: crate::VERSION.to_string(),
            training_examples: examples.len(),
            positive_examples: labels.iter().filter(|&&y| y).count(),
            feature_dimension: featurizer.dimension(),
            stats: outcome.stats,
        };

        Self::new(featurizer, outcome.model, metadata)
    }

    /// Check the internal consistency of a built or decoded model.
    pub fn validate(&self) -> Result<()> {
        let dimension = self.featurizer.dimension();
        if self.classifier.dimension() != dimension {
            return Err(PolarityError::invalid_input(format!(
                "classifier has {} weights but the featurizer produces {} features",
                self.classifier.dimension(),
                dimension
            )));
        }
        if !self.classifier.bias.is_finite() || self.classifier.weights.iter().any(|w| !w.is_finite()) {
            return Err(PolarityError::invalid_input("classifier has non-finite weights"));
        }
        Ok(())
    }

    pub fn featurizer(&self) -> &TextFeaturizer {
        &self.featurizer
    }

    pub fn classifier(&self) -> &LinearModel {
        &self.classifier
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Featurize and score `text`, returning `(score, probability)`.
    pub fn score_text(&self, text: &str) -> Result<(f64, f64)> {
        let features = self.featurizer.transform(text)?;
        let score = self.classifier.score(&features)?;
        Ok((score, sigmoid(score)))
    }

    /// Persist the model to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        ModelStore::save(self, path)
    }

    /// Load a model from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        ModelStore::load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::trainer::SdcaLogisticTrainer;

    fn examples() -> Vec<LabeledExample> {
        vec![
            LabeledExample::positive("great food and great service"),
            LabeledExample::positive("loved the friendly staff"),
            LabeledExample::positive("amazing dessert, great value"),
            LabeledExample::negative("terrible food and rude staff"),
            LabeledExample::negative("the soup was cold and bland"),
            LabeledExample::negative("awful service, never again"),
        ]
    }

    #[test]
    fn test_sigmoid_bounds() {
        assert_eq!(sigmoid(0.0), 0.5);
        for s in [-1e6, -40.0, -1.0, 1.0, 40.0, 1e6] {
            let p = sigmoid(s);
            assert!((0.0..=1.0).contains(&p));
        }
        assert!(sigmoid(3.0) > sigmoid(2.0));
    }

    #[test]
    fn test_linear_model_dimension_check() {
        let model = LinearModel::new(vec![1.0, -1.0], 0.5);
        let x = FeatureVector::from_dense(&[2.0, 1.0]);
        assert_eq!(model.score(&x).unwrap(), 1.5);
        assert!(model.score(&FeatureVector::zeros(3)).is_err());
    }

    #[test]
    fn test_train_bundle() {
        let model = TrainedModel::train(
            &examples(),
            &FeaturizerOptions::default(),
            &SdcaLogisticTrainer::default(),
        )
        .unwrap();

        let metadata = model.metadata();
        assert_eq!(metadata.training_examples, 6);
        assert_eq!(metadata.positive_examples, 3);
        assert_eq!(metadata.feature_dimension, model.featurizer().dimension());
        assert_eq!(metadata.trainer, "sdca_logistic_regression");

        let (_, good) = model.score_text("great food").unwrap();
        let (_, bad) = model.score_text("rude and cold").unwrap();
        assert!(good > 0.5, "{good}");
        assert!(bad < 0.5, "{bad}");
    }

    #[test]
    fn test_empty_text_scores_bias_only() {
        let model = TrainedModel::train(
            &examples(),
            &FeaturizerOptions::default(),
            &SdcaLogisticTrainer::default(),
        )
        .unwrap();
        let (score, probability) = model.score_text("").unwrap();
        assert_eq!(score, model.classifier().bias);
        assert_eq!(probability, sigmoid(model.classifier().bias));
    }

    #[test]
    fn test_train_rejects_empty_dataset() {
        let result = TrainedModel::train(
            &[],
            &FeaturizerOptions::default(),
            &SdcaLogisticTrainer::default(),
        );
        assert!(matches!(result, Err(PolarityError::InvalidInput(_))));
    }
}
