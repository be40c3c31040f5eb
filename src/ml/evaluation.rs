//! Held-out evaluation of a trained model.

use std::cmp::Ordering;
use std::fmt;

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::LabeledExample;
use crate::error::{PolarityError, Result};
use crate::ml::models::{DECISION_THRESHOLD, TrainedModel};

const PROBABILITY_EPSILON: f64 = 1e-15;

/// Binary confusion counts at the 0.5 threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (false, true) => self.false_negatives += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Harmonic mean of precision and recall, zero when both are zero.
    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }
}

/// Metrics computed over a labeled test set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub auc: f64,
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
    pub log_loss: f64,
    pub confusion: ConfusionMatrix,
    pub total: usize,
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accuracy {:.2}%, AUC {:.2}%, F1 {:.2}% over {} examples",
            self.accuracy * 100.0,
            self.auc * 100.0,
            self.f1 * 100.0,
            self.total
        )
    }
}

/// Score every test example with `model` and summarize the results.
pub fn evaluate(model: &TrainedModel, test_examples: &[LabeledExample]) -> Result<EvaluationMetrics> {
    if test_examples.is_empty() {
        return Err(PolarityError::empty_dataset("cannot evaluate on an empty test set"));
    }

    let scored: Vec<(f64, bool)> = test_examples
        .par_iter()
        .map(|example| {
            model
                .score_text(&example.text)
                .map(|(_, probability)| (probability, example.label))
        })
        .collect::<Result<_>>()?;

    let metrics = compute_metrics(&scored)?;
    info!("Evaluation: {metrics}");
    Ok(metrics)
}

/// Metrics from `(probability, actual_label)` pairs.
pub fn compute_metrics(scored: &[(f64, bool)]) -> Result<EvaluationMetrics> {
    if scored.is_empty() {
        return Err(PolarityError::empty_dataset("no scored examples"));
    }

    let mut confusion = ConfusionMatrix::default();
    let mut loss = 0.0;
    for &(probability, actual) in scored {
        confusion.record(probability >= DECISION_THRESHOLD, actual);
        let p = probability.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
        loss -= if actual { p.ln() } else { (1.0 - p).ln() };
    }

    let auc = area_under_roc(scored).unwrap_or_else(|| {
        warn!("AUC is undefined for a single-class test set, reporting 0.5");
        0.5
    });

    Ok(EvaluationMetrics {
        accuracy: confusion.accuracy(),
        auc,
        f1: confusion.f1(),
        precision: confusion.precision(),
        recall: confusion.recall(),
        log_loss: loss / scored.len() as f64,
        confusion,
        total: scored.len(),
    })
}

/// Area under the ROC curve via the Mann-Whitney rank statistic.
///
/// Tied probabilities share their average rank, which matches the
/// trapezoidal area under the ROC curve. `None` when either class is absent.
pub fn area_under_roc(scored: &[(f64, bool)]) -> Option<f64> {
    let positives = scored.iter().filter(|(_, y)| *y).count();
    let negatives = scored.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut sorted: Vec<(f64, bool)> = scored.to_vec();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && sorted[end].0 == sorted[start].0 {
            end += 1;
        }
        // Ranks are 1-based; the tie group covers ranks start+1 ..= end.
        let average_rank = (start + 1 + end) as f64 / 2.0;
        let group_positives = sorted[start..end].iter().filter(|(_, y)| *y).count();
        positive_rank_sum += average_rank * group_positives as f64;
        start = end;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
