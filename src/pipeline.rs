//! The train-or-load state machine.
//!
//! ```text
//! NoModel ──► Training ──► Evaluating ──► Persisted ──► Ready
//! ModelExists ─────────────────────────────────────────► Ready
//! ```
//!
//! - `NoModel → Training`: load and split the dataset, fit the model.
//! - `Training → Evaluating`: score the held-out split. A failure here is
//!   logged and recorded but does not stop the pipeline.
//! - `Evaluating → Persisted`: save the model. Fatal on failure.
//! - `Persisted → Ready` / `ModelExists → Ready`: hand over (or load) the
//!   model for inference.

use std::fmt;
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::dataset::{DatasetLoader, LabeledExample, split};
use crate::error::{PolarityError, Result};
use crate::inference::{BatchPrediction, InferenceEngine, Prediction};
use crate::ml::evaluation::{EvaluationMetrics, evaluate};
use crate::ml::models::TrainedModel;
use crate::ml::store::ModelStore;
use crate::ml::trainer::{SdcaLogisticTrainer, Trainer};

/// Where the orchestrator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PipelineState {
    NoModel,
    ModelExists,
    Training,
    Evaluating,
    Persisted,
    Ready,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::NoModel => "NoModel",
            PipelineState::ModelExists => "ModelExists",
            PipelineState::Training => "Training",
            PipelineState::Evaluating => "Evaluating",
            PipelineState::Persisted => "Persisted",
            PipelineState::Ready => "Ready",
        };
        f.write_str(name)
    }
}

/// How the ready model was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelOrigin {
    Trained,
    Loaded,
}

/// Result of the evaluation stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationOutcome {
    /// Metrics over the held-out split.
    Completed(EvaluationMetrics),
    /// Evaluation raised an error; the model was still persisted.
    Failed(String),
    /// The model was loaded rather than trained.
    Skipped,
}

impl EvaluationOutcome {
    pub fn metrics(&self) -> Option<&EvaluationMetrics> {
        match self {
            EvaluationOutcome::Completed(metrics) => Some(metrics),
            _ => None,
        }
    }
}

/// Drives the pipeline one transition at a time.
pub struct Orchestrator {
    config: PipelineConfig,
    trainer: Box<dyn Trainer>,
    state: PipelineState,
    test_set: Vec<LabeledExample>,
    model: Option<TrainedModel>,
    origin: ModelOrigin,
    evaluation: EvaluationOutcome,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state)
            .field("model_path", &self.config.model_path)
            .field("trainer", &self.trainer.name())
            .finish()
    }
}

impl Orchestrator {
    /// Start in `ModelExists` when a model is persisted at the configured
    /// path, `NoModel` otherwise.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let state = if ModelStore::exists(&config.model_path) {
            PipelineState::ModelExists
        } else {
            PipelineState::NoModel
        };
        info!(
            "Pipeline starting in state {state} (model path {})",
            config.model_path.display()
        );

        let trainer = Box::new(SdcaLogisticTrainer::new(config.trainer.clone()));
        Ok(Self {
            config,
            trainer,
            state,
            test_set: Vec::new(),
            model: None,
            origin: ModelOrigin::Trained,
            evaluation: EvaluationOutcome::Skipped,
        })
    }

    /// Replace the default SDCA trainer.
    pub fn with_trainer(mut self, trainer: Box<dyn Trainer>) -> Self {
        self.trainer = trainer;
        self
    }

    /// Retrain even when a persisted model exists.
    pub fn force_training(mut self) -> Self {
        if self.state == PipelineState::ModelExists {
            info!("Ignoring persisted model, retraining");
            self.state = PipelineState::NoModel;
        }
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Outcome of the evaluation stage so far.
    pub fn evaluation(&self) -> &EvaluationOutcome {
        &self.evaluation
    }

    /// Perform one transition and return the new state.
    ///
    /// On error the state is left unchanged. Stepping in `Ready` is a no-op.
    pub fn step(&mut self) -> Result<PipelineState> {
        let next = match self.state {
            PipelineState::NoModel => {
                self.train()?;
                PipelineState::Training
            }
            PipelineState::Training => {
                self.evaluate();
                PipelineState::Evaluating
            }
            PipelineState::Evaluating => {
                ModelStore::save(self.trained_model()?, &self.config.model_path)?;
                PipelineState::Persisted
            }
            PipelineState::Persisted => PipelineState::Ready,
            PipelineState::ModelExists => {
                self.model = Some(ModelStore::load(&self.config.model_path)?);
                self.origin = ModelOrigin::Loaded;
                self.evaluation = EvaluationOutcome::Skipped;
                PipelineState::Ready
            }
            PipelineState::Ready => PipelineState::Ready,
        };

        if next != self.state {
            info!("Pipeline: {} -> {}", self.state, next);
        }
        self.state = next;
        Ok(next)
    }

    /// Step until `Ready` and hand back the model for inference.
    pub fn run(mut self) -> Result<ReadyPipeline> {
        while self.state != PipelineState::Ready {
            self.step()?;
        }

        let model = self
            .model
            .take()
            .ok_or_else(|| PolarityError::invalid_input("pipeline reached Ready without a model"))?;
        let engine = InferenceEngine::new(Arc::new(model), &self.config.inference)?;
        Ok(ReadyPipeline {
            engine,
            origin: self.origin,
            evaluation: self.evaluation,
        })
    }

    fn train(&mut self) -> Result<()> {
        info!("=============== Loading data ===============");
        let examples = DatasetLoader::new(self.config.data.clone()).load()?;
        let (train, test) = split(
            examples,
            self.config.split.test_fraction,
            self.config.split.seed,
        )?;
        info!("Split into {} training and {} test examples", train.len(), test.len());

        info!("=============== Training model ===============");
        let model = TrainedModel::train(&train, &self.config.featurizer, self.trainer.as_ref())?;
        self.model = Some(model);
        self.test_set = test;
        self.origin = ModelOrigin::Trained;
        Ok(())
    }

    fn evaluate(&mut self) {
        info!("=============== Evaluating model ===============");
        let result = self
            .trained_model()
            .and_then(|model| evaluate(model, &self.test_set));
        self.evaluation = match result {
            Ok(metrics) => EvaluationOutcome::Completed(metrics),
            Err(e) => {
                warn!("Evaluation failed, continuing without metrics: {e}");
                EvaluationOutcome::Failed(e.to_string())
            }
        };
    }

    fn trained_model(&self) -> Result<&TrainedModel> {
        self.model
            .as_ref()
            .ok_or_else(|| PolarityError::invalid_input("no trained model"))
    }
}

/// A pipeline in the `Ready` state.
#[derive(Debug)]
pub struct ReadyPipeline {
    engine: InferenceEngine,
    origin: ModelOrigin,
    evaluation: EvaluationOutcome,
}

impl ReadyPipeline {
    pub fn model(&self) -> &Arc<TrainedModel> {
        self.engine.model()
    }

    pub fn origin(&self) -> ModelOrigin {
        self.origin
    }

    pub fn evaluation(&self) -> &EvaluationOutcome {
        &self.evaluation
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn predict_one(&self, text: &str) -> Result<Prediction> {
        self.engine.predict_one(text)
    }

    pub fn predict_many<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<BatchPrediction> {
        self.engine.predict_many(texts)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::config::DatasetConfig;

    fn write_corpus(dir: &Path) -> std::path::PathBuf {
        let mut content = String::from("SentimentText;Label\n");
        for i in 0..12 {
            content.push_str(&format!("Great food and lovely staff {i};1\n"));
            content.push_str(&format!("Bad food and rude staff {i};0\n"));
        }
        let path = dir.join("reviews.csv");
        fs::write(&path, content).unwrap();
        path
    }

    fn config(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            data: DatasetConfig::with_path(write_corpus(dir)),
            model_path: dir.join("models").join("model.bin"),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_state_sequence_then_reload() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());

        let mut orchestrator = Orchestrator::new(config.clone()).unwrap();
        assert_eq!(orchestrator.state(), PipelineState::NoModel);
        let mut states = Vec::new();
        while orchestrator.state() != PipelineState::Ready {
            states.push(orchestrator.step().unwrap());
        }
        assert_eq!(
            states,
            vec![
                PipelineState::Training,
                PipelineState::Evaluating,
                PipelineState::Persisted,
                PipelineState::Ready,
            ]
        );
        assert!(orchestrator.evaluation().metrics().is_some());
        assert_eq!(orchestrator.step().unwrap(), PipelineState::Ready);
        assert!(config.model_path.exists());

        let orchestrator = Orchestrator::new(config).unwrap();
        assert_eq!(orchestrator.state(), PipelineState::ModelExists);
        let ready = orchestrator.run().unwrap();
        assert_eq!(ready.origin(), ModelOrigin::Loaded);
        assert_eq!(ready.evaluation(), &EvaluationOutcome::Skipped);
        assert!(!ready.predict_one("rude staff").unwrap().predicted_label);
    }

    #[test]
    fn test_force_training() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        let first = Orchestrator::new(config.clone()).unwrap().run().unwrap();

        let orchestrator = Orchestrator::new(config).unwrap().force_training();
        assert_eq!(orchestrator.state(), PipelineState::NoModel);
        let second = orchestrator.run().unwrap();
        assert_eq!(second.origin(), ModelOrigin::Trained);
        assert_ne!(
            first.model().metadata().model_id,
            second.model().metadata().model_id
        );
    }

    #[test]
    fn test_evaluation_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        config.split.test_fraction = 0.0;

        let ready = Orchestrator::new(config.clone()).unwrap().run().unwrap();
        assert!(matches!(ready.evaluation(), EvaluationOutcome::Failed(_)));
        assert!(ModelStore::exists(&config.model_path));
    }

    #[test]
    fn test_save_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();
        let config = PipelineConfig {
            model_path: blocker.join("model.bin"),
            ..config(dir.path())
        };

        let mut orchestrator = Orchestrator::new(config).unwrap();
        orchestrator.step().unwrap();
        orchestrator.step().unwrap();
        assert!(orchestrator.step().is_err());
        assert_eq!(orchestrator.state(), PipelineState::Evaluating);
    }

    #[test]
    fn test_missing_data_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig {
            data: DatasetConfig::with_path(dir.path().join("absent.csv")),
            model_path: dir.path().join("model.bin"),
            ..PipelineConfig::default()
        };
        let result = Orchestrator::new(config).unwrap().run();
        assert!(matches!(result, Err(PolarityError::Io(_))));
    }
}
