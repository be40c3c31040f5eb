//! Pipeline configuration.
//!
//! Every path and tunable lives in [`PipelineConfig`], which is passed
//! explicitly to the loader, the store and the orchestrator. A JSON file may
//! override any subset of the defaults:
//!
//! ```json
//! {
//!   "data": { "path": "reviews.csv", "delimiter": "\t" },
//!   "trainer": { "l2": 0.0005 },
//!   "model_path": "out/model.bin"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PolarityError, Result};
use crate::ml::features::FeaturizerOptions;
use crate::ml::trainer::TrainerOptions;

/// Default location of the labeled corpus.
pub const DEFAULT_DATA_PATH: &str = "./data/sentiment.csv";

/// Default location of the persisted model.
pub const DEFAULT_MODEL_PATH: &str = "./models/sentiment_model.bin";

/// Top-level configuration for the train/evaluate/predict pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Labeled input corpus.
    pub data: DatasetConfig,
    /// Train/test partitioning.
    pub split: SplitConfig,
    /// Text featurization.
    pub featurizer: FeaturizerOptions,
    /// Classifier fitting.
    pub trainer: TrainerOptions,
    /// Inference execution.
    pub inference: InferenceOptions,
    /// Where the trained model is persisted; its presence skips training.
    pub model_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: DatasetConfig::default(),
            split: SplitConfig::default(),
            featurizer: FeaturizerOptions::default(),
            trainer: TrainerOptions::default(),
            inference: InferenceOptions::default(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; absent fields take defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.data.validate()?;
        self.split.validate()?;
        self.featurizer.validate()?;
        self.trainer.validate()?;
        if self.inference.threads == 0 {
            return Err(PolarityError::config("inference.threads must be at least 1"));
        }
        Ok(())
    }
}

/// Shape of the delimited input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Path to the delimited text file.
    pub path: PathBuf,
    /// Field delimiter; must be a single ASCII character.
    pub delimiter: char,
    /// Whether the first row is a header.
    pub has_header: bool,
    /// Zero-based index of the `SentimentText` column.
    pub text_column: usize,
    /// Zero-based index of the `Label` column.
    pub label_column: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATA_PATH),
            delimiter: ';',
            has_header: true,
            text_column: 0,
            label_column: 1,
        }
    }
}

impl DatasetConfig {
    /// Config for `path` with every other field defaulted.
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// The delimiter as the byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(PolarityError::config(format!(
                "delimiter {:?} is not a single ASCII character",
                self.delimiter
            )))
        }
    }

    fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        if self.text_column == self.label_column {
            return Err(PolarityError::config(
                "data.text_column and data.label_column must differ",
            ));
        }
        Ok(())
    }
}

/// Train/test partitioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of examples held out for evaluation, in `[0, 1)`.
    pub test_fraction: f64,
    /// Seed for the shuffle; a fixed seed gives the same partition every run.
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl SplitConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(PolarityError::config(format!(
                "split.test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

/// Inference execution options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceOptions {
    /// Worker threads used by batch prediction.
    pub threads: usize,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
        }
    }
}
