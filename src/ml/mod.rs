//! Machine learning components of the sentiment pipeline.
//!
//! - [`features`]: TF-IDF text featurization into sparse fixed-width vectors.
//! - [`trainer`]: binary classifier fitting (SDCA logistic regression).
//! - [`models`]: the trained linear classifier and the persisted model bundle.
//! - [`evaluation`]: held-out metrics (accuracy, AUC, F1, ...).
//! - [`store`]: the versioned on-disk model archive.

pub mod evaluation;
pub mod features;
pub mod models;
pub mod store;
pub mod trainer;

pub use evaluation::{ConfusionMatrix, EvaluationMetrics, evaluate};
pub use features::{FeatureVector, Featurizer, FeaturizerOptions, TextFeaturizer};
pub use models::{LinearModel, ModelMetadata, TrainedModel};
pub use store::ModelStore;
pub use trainer::{SdcaLogisticTrainer, Trainer, TrainerOptions, TrainingOutcome, TrainingStats};
