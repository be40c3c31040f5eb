//! Command line argument parsing for the Polarity CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Sentence fed to the single-item demo when none is given.
pub const DEMO_TEXT: &str = "This was a very bad steak";

/// Sentences fed to the batch demo when none are given.
pub const DEMO_BATCH: [&str; 2] = ["This was a horrible meal", "I love this spaghetti."];

/// Polarity - train, evaluate and apply a binary sentiment classifier
#[derive(Parser, Debug, Clone)]
#[command(name = "polarity")]
#[command(about = "Train, evaluate and apply a binary sentiment classifier")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct PolarityArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "POLARITY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl PolarityArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train the model unless one is persisted, then run the inference demos
    Run(RunArgs),

    /// Train and persist a model, replacing any existing one
    Train(TrainArgs),

    /// Evaluate a persisted model on a labeled file
    Evaluate(EvaluateArgs),

    /// Predict with a persisted model
    Predict(PredictArgs),
}

/// Dataset and model locations shared by several commands.
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    /// Labeled dataset (`SentimentText;Label`)
    #[arg(long, value_name = "DATA_FILE")]
    pub data: Option<PathBuf>,

    /// Model file
    #[arg(long, value_name = "MODEL_FILE")]
    pub model: Option<PathBuf>,
}

/// Texts to classify, given inline or one per line in a file.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Texts to classify
    #[arg(value_name = "TEXT")]
    pub texts: Vec<String>,

    /// File with one text per line
    #[arg(short, long, value_name = "BATCH_FILE")]
    pub batch_file: Option<PathBuf>,
}

impl InputArgs {
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.batch_file.is_none()
    }
}

/// Arguments for the full pipeline
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Text for the single-item demo
    #[arg(long, value_name = "TEXT", default_value = DEMO_TEXT)]
    pub single: String,

    /// Batch demo input (built-in sentences when empty)
    #[command(flatten)]
    pub input: InputArgs,
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub paths: PathArgs,
}

/// Arguments for evaluation
#[derive(Parser, Debug, Clone)]
pub struct EvaluateArgs {
    /// Labeled dataset to evaluate on
    #[arg(long, value_name = "DATA_FILE")]
    pub data: PathBuf,

    /// Model file
    #[arg(long, value_name = "MODEL_FILE")]
    pub model: Option<PathBuf>,
}

/// Arguments for prediction
#[derive(Parser, Debug, Clone)]
pub struct PredictArgs {
    /// Model file
    #[arg(long, value_name = "MODEL_FILE")]
    pub model: Option<PathBuf>,

    #[command(flatten)]
    pub input: InputArgs,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
