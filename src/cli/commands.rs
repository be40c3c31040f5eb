//! Command implementations for the Polarity CLI.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::{DatasetConfig, PipelineConfig};
use crate::dataset::DatasetLoader;
use crate::error::{PolarityError, Result};
use crate::inference::InferenceEngine;
use crate::ml::evaluation::evaluate;
use crate::ml::store::ModelStore;
use crate::pipeline::Orchestrator;

/// Execute a CLI command.
pub fn execute_command(args: PolarityArgs) -> Result<()> {
    let config = load_config(&args)?;
    match &args.command {
        Command::Run(run_args) => run_pipeline(run_args, config, &args),
        Command::Train(train_args) => train_model(train_args, config, &args),
        Command::Evaluate(evaluate_args) => evaluate_model(evaluate_args, config, &args),
        Command::Predict(predict_args) => predict(predict_args, config, &args),
    }
}

/// The configuration file when given, defaults otherwise.
pub fn load_config(args: &PolarityArgs) -> Result<PipelineConfig> {
    match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PipelineConfig::from_file(path)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn apply_paths(config: &mut PipelineConfig, paths: &PathArgs) {
    if let Some(data) = &paths.data {
        config.data.path = data.clone();
    }
    if let Some(model) = &paths.model {
        config.model_path = model.clone();
    }
}

/// Train or load, then run the single and batch demos.
fn run_pipeline(args: &RunArgs, mut config: PipelineConfig, cli_args: &PolarityArgs) -> Result<()> {
    apply_paths(&mut config, &args.paths);
    let model_path = config.model_path.display().to_string();

    let ready = Orchestrator::new(config)?.run()?;

    let single = ready.predict_one(&args.single);
    let single = PredictionRow::from_result(&args.single, &single);

    let batch = if args.input.is_empty() {
        let results = ready.predict_many(&DEMO_BATCH);
        DEMO_BATCH
            .iter()
            .zip(&results)
            .map(|(text, result)| PredictionRow::from_result(text, result))
            .collect()
    } else {
        predict_inputs(ready.engine(), &args.input)?
    };

    let report = RunReport {
        origin: ready.origin(),
        model_path,
        model: ModelSummary::from(ready.model().as_ref()),
        evaluation: ready.evaluation().clone(),
        single,
        batch,
    };
    output_result("Pipeline ready", &report, cli_args)
}

/// Retrain and persist regardless of an existing model.
fn train_model(args: &TrainArgs, mut config: PipelineConfig, cli_args: &PolarityArgs) -> Result<()> {
    apply_paths(&mut config, &args.paths);
    let model_path = config.model_path.display().to_string();

    let ready = Orchestrator::new(config)?.force_training().run()?;

    let report = TrainReport {
        model_path,
        model: ModelSummary::from(ready.model().as_ref()),
        evaluation: ready.evaluation().clone(),
    };
    output_result("Model trained", &report, cli_args)
}

/// Evaluate a persisted model on a labeled file.
fn evaluate_model(
    args: &EvaluateArgs,
    config: PipelineConfig,
    cli_args: &PolarityArgs,
) -> Result<()> {
    let model_path = args.model.clone().unwrap_or(config.model_path);
    let model = ModelStore::load(&model_path)?;

    let dataset = DatasetConfig {
        path: args.data.clone(),
        ..config.data
    };
    let examples = DatasetLoader::new(dataset).load()?;
    let metrics = evaluate(&model, &examples)?;

    let report = EvaluationReport {
        data_path: args.data.display().to_string(),
        model: ModelSummary::from(&model),
        metrics,
    };
    output_result("Model evaluated", &report, cli_args)
}

/// Predict with a persisted model.
fn predict(args: &PredictArgs, config: PipelineConfig, cli_args: &PolarityArgs) -> Result<()> {
    if args.input.is_empty() {
        return Err(PolarityError::invalid_input(
            "nothing to predict: pass TEXT arguments or --batch-file",
        ));
    }

    let model_path = args.model.clone().unwrap_or(config.model_path);
    let model = ModelStore::load(&model_path)?;
    let engine = InferenceEngine::new(Arc::new(model), &config.inference)?;

    let report = PredictReport {
        predictions: predict_inputs(&engine, &args.input)?,
    };
    output_result("Predictions", &report, cli_args)
}

/// Inline texts first, then the lines of the batch file.
fn predict_inputs(engine: &InferenceEngine, input: &InputArgs) -> Result<Vec<PredictionRow>> {
    let mut rows: Vec<PredictionRow> = input
        .texts
        .iter()
        .zip(engine.predict_many(&input.texts))
        .map(|(text, result)| PredictionRow::from_result(text, &result))
        .collect();

    if let Some(path) = &input.batch_file {
        let lines = read_batch_file(path)?;
        info!("Predicting {} lines from {}", lines.len(), path.display());
        let results = engine.predict_raw_batch(&lines);
        rows.extend(lines.iter().zip(&results).map(|(line, result)| {
            PredictionRow::from_result(&String::from_utf8_lossy(line), result)
        }));
    }

    Ok(rows)
}

/// Non-blank lines of `path` as raw bytes, without line terminators.
fn read_batch_file(path: &Path) -> Result<Vec<Vec<u8>>> {
    let content = fs::read(path)?;
    Ok(content
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .map(<[u8]>::to_vec)
        .collect())
}
