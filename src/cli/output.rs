//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::Serialize;

use crate::cli::args::{OutputFormat, PolarityArgs};
use crate::error::Result;
use crate::inference::{BatchPrediction, SentimentClass};
use crate::ml::evaluation::EvaluationMetrics;
use crate::ml::models::TrainedModel;
use crate::pipeline::{EvaluationOutcome, ModelOrigin};

/// Summary of a trained model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub model_id: String,
    pub created_at: String,
    pub trainer: String,
    pub training_examples: usize,
    pub feature_dimension: usize,
    pub epochs: usize,
    pub converged: bool,
    pub final_loss: Option<f64>,
}

impl From<&TrainedModel> for ModelSummary {
    fn from(model: &TrainedModel) -> Self {
        let metadata = model.metadata();
        Self {
            model_id: metadata.model_id.to_string(),
            created_at: metadata.created_at.to_rfc3339(),
            trainer: metadata.trainer.clone(),
            training_examples: metadata.training_examples,
            feature_dimension: metadata.feature_dimension,
            epochs: metadata.stats.epochs,
            converged: metadata.stats.converged,
            final_loss: metadata.stats.final_loss(),
        }
    }
}

/// One line of inference output; failed items carry `error` instead of a verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRow {
    pub text: String,
    pub prediction: Option<bool>,
    pub sentiment: Option<SentimentClass>,
    pub probability: Option<f64>,
    pub score: Option<f64>,
    pub error: Option<String>,
}

impl PredictionRow {
    /// Build a row from a batch slot; `input` names the item when it failed.
    pub fn from_result(input: &str, result: &BatchPrediction) -> Self {
        match result {
            Ok(prediction) => Self {
                text: prediction.text.clone(),
                prediction: Some(prediction.predicted_label),
                sentiment: Some(prediction.sentiment()),
                probability: Some(prediction.probability),
                score: Some(prediction.score),
                error: None,
            },
            Err(e) => Self {
                text: input.to_string(),
                prediction: None,
                sentiment: None,
                probability: None,
                score: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Result of `run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub origin: ModelOrigin,
    pub model_path: String,
    pub model: ModelSummary,
    pub evaluation: EvaluationOutcome,
    pub single: PredictionRow,
    pub batch: Vec<PredictionRow>,
}

/// Result of `train`.
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub model_path: String,
    pub model: ModelSummary,
    pub evaluation: EvaluationOutcome,
}

/// Result of `evaluate`.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub data_path: String,
    pub model: ModelSummary,
    pub metrics: EvaluationMetrics,
}

/// Result of `predict`.
#[derive(Debug, Clone, Serialize)]
pub struct PredictReport {
    pub predictions: Vec<PredictionRow>,
}

/// Plain-text rendering of a report.
pub trait HumanOutput {
    fn render_human(&self) -> String;
}

impl HumanOutput for RunReport {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let origin = match self.origin {
            ModelOrigin::Trained => "trained",
            ModelOrigin::Loaded => "loaded",
        };
        let _ = writeln!(out, "Model {} ({origin}, {})", self.model.model_id, self.model_path);
        out.push_str(&render_outcome(&self.evaluation));
        out.push_str(&banner("Single prediction"));
        out.push_str(&render_row(&self.single));
        out.push_str(&banner("Batch predictions"));
        for row in &self.batch {
            out.push_str(&render_row(row));
        }
        out.push_str(&banner("End of predictions"));
        out
    }
}

impl HumanOutput for TrainReport {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Model {} saved to {}", self.model.model_id, self.model_path);
        out.push_str(&render_model(&self.model));
        out.push_str(&render_outcome(&self.evaluation));
        out
    }
}

impl HumanOutput for EvaluationReport {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Model {} on {}", self.model.model_id, self.data_path);
        out.push_str(&render_metrics(&self.metrics));
        out
    }
}

impl HumanOutput for PredictReport {
    fn render_human(&self) -> String {
        self.predictions.iter().map(render_row).collect()
    }
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + HumanOutput>(
    message: &str,
    result: &T,
    args: &PolarityArgs,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: HumanOutput>(message: &str, result: &T, args: &PolarityArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }
    print!("{}", result.render_human());
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &PolarityArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

fn banner(title: &str) -> String {
    format!("=============== {title} ===============\n")
}

fn render_model(model: &ModelSummary) -> String {
    let loss = model
        .final_loss
        .map(|l| format!("{l:.6}"))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "Trainer: {} | Examples: {} | Features: {} | Epochs: {} | Converged: {} | Loss: {loss}\n",
        model.trainer, model.training_examples, model.feature_dimension, model.epochs, model.converged
    )
}

fn render_outcome(outcome: &EvaluationOutcome) -> String {
    match outcome {
        EvaluationOutcome::Completed(metrics) => render_metrics(metrics),
        EvaluationOutcome::Failed(reason) => {
            format!("{}Evaluation failed: {reason}\n", banner("Model quality metrics"))
        }
        EvaluationOutcome::Skipped => String::new(),
    }
}

fn render_metrics(metrics: &EvaluationMetrics) -> String {
    let mut out = banner("Model quality metrics");
    let _ = writeln!(out, "Accuracy: {}", format_percent(metrics.accuracy));
    let _ = writeln!(out, "Auc: {}", format_percent(metrics.auc));
    let _ = writeln!(out, "F1Score: {}", format_percent(metrics.f1));
    let _ = writeln!(
        out,
        "Precision: {} | Recall: {} | LogLoss: {:.4} | Examples: {}",
        format_percent(metrics.precision),
        format_percent(metrics.recall),
        metrics.log_loss,
        metrics.total
    );
    out.push_str(&banner("End of model evaluation"));
    out
}

fn render_row(row: &PredictionRow) -> String {
    match (&row.error, row.prediction, row.sentiment, row.probability) {
        (None, Some(label), Some(sentiment), Some(probability)) => format!(
            "Sentiment: {} | Prediction: {} ({sentiment}) | Probability: {probability:.4}\n",
            row.text,
            if label { "Positive" } else { "Negative" },
        ),
        (error, ..) => format!(
            "Sentiment: {} | Error: {}\n",
            row.text,
            error.as_deref().unwrap_or("no prediction")
        ),
    }
}

fn format_percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolarityError;
    use crate::inference::Prediction;

    fn prediction(probability: f64) -> BatchPrediction {
        Ok(Prediction {
            text: "tasty".to_string(),
            predicted_label: probability >= 0.5,
            probability,
            score: 0.0,
        })
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.5), "50.00%");
        assert_eq!(format_percent(1.0), "100.00%");
    }

    #[test]
    fn test_prediction_row() {
        let row = PredictionRow::from_result("ignored", &prediction(0.55));
        assert_eq!(row.text, "tasty");
        assert_eq!(row.prediction, Some(true));
        assert_eq!(row.sentiment, Some(SentimentClass::Neutral));
        assert!(render_row(&row).contains("Prediction: Positive (Neutral)"));

        let failed: BatchPrediction = Err(PolarityError::invalid_input("item 1 is not valid UTF-8"));
        let row = PredictionRow::from_result("\u{FFFD}", &failed);
        assert_eq!(row.prediction, None);
        assert!(row.error.as_deref().unwrap().contains("UTF-8"));
        assert!(render_row(&row).contains("Error:"));
    }

    #[test]
    fn test_predict_report_json() {
        let report = PredictReport {
            predictions: vec![PredictionRow::from_result("", &prediction(0.1))],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["predictions"][0]["sentiment"], "Negative");
        assert_eq!(value["predictions"][0]["prediction"], false);
        assert!(value["predictions"][0]["error"].is_null());
    }
}
