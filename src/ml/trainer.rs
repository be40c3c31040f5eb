//! Binary classifier training.
//!
//! The default [`SdcaLogisticTrainer`] fits an L2-regularized logistic
//! regression by stochastic dual coordinate ascent. It minimizes
//!
//! ```text
//! P(w) = λ/2 ‖w‖² + 1/n Σ ln(1 + exp(-yᵢ w·xᵢ))
//! ```
//!
//! over the weights and a bias (an implicit constant feature), keeping one
//! dual variable βᵢ ∈ (0, 1) per example with `w = 1/(λn) Σ βᵢ yᵢ xᵢ`. Every
//! coordinate step maximizes the dual exactly, so the dual objective never
//! decreases and the duality gap bounds the distance to the optimum.

use std::time::Instant;

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{PolarityError, Result};
use crate::ml::features::FeatureVector;
use crate::ml::models::LinearModel;

const MAX_NEWTON_STEPS: usize = 60;
const NEWTON_TOLERANCE: f64 = 1e-12;

/// Hyperparameters for [`SdcaLogisticTrainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerOptions {
    /// L2 regularization strength λ.
    pub l2: f64,
    /// Maximum number of passes over the training set.
    pub max_epochs: usize,
    /// Stop once the duality gap falls below this value.
    pub tolerance: f64,
    /// Seed for the per-epoch visiting order.
    pub seed: u64,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            l2: 1e-3,
            max_epochs: 200,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

impl TrainerOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.l2.is_finite() && self.l2 > 0.0) {
            return Err(PolarityError::config(format!(
                "trainer.l2 must be positive, got {}",
                self.l2
            )));
        }
        if self.max_epochs == 0 {
            return Err(PolarityError::config("trainer.max_epochs must be at least 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(PolarityError::config(format!(
                "trainer.tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Training statistics recorded while fitting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Completed passes over the data.
    pub epochs: usize,
    /// Primal objective after each epoch.
    pub primal_objectives: Vec<f64>,
    /// Dual objective after each epoch.
    pub dual_objectives: Vec<f64>,
    /// Duality gap after the last epoch.
    pub final_duality_gap: f64,
    /// Whether the gap fell below the tolerance.
    pub converged: bool,
    /// Training time in milliseconds.
    pub training_time_ms: u64,
}

impl TrainingStats {
    /// Primal objective after the last epoch.
    pub fn final_loss(&self) -> Option<f64> {
        self.primal_objectives.last().copied()
    }
}

/// A fitted classifier together with how it was obtained.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: LinearModel,
    pub stats: TrainingStats,
}

/// Fits a binary linear classifier to featurized examples.
pub trait Trainer: Send + Sync {
    /// Fit on `features` with matching `labels` (`true` = positive).
    ///
    /// Both slices must be non-empty, of equal length, and every vector must
    /// share one dimension.
    fn fit(&self, features: &[FeatureVector], labels: &[bool]) -> Result<TrainingOutcome>;

    /// Name recorded in the model metadata.
    fn name(&self) -> &str;
}

/// L2-regularized logistic regression trained with SDCA.
#[derive(Debug, Clone, Default)]
pub struct SdcaLogisticTrainer {
    options: TrainerOptions,
}

impl SdcaLogisticTrainer {
    pub fn new(options: TrainerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TrainerOptions {
        &self.options
    }
}

impl Trainer for SdcaLogisticTrainer {
    fn fit(&self, features: &[FeatureVector], labels: &[bool]) -> Result<TrainingOutcome> {
        self.options.validate()?;
        let dimension = check_training_set(features, labels)?;

        let n = features.len();
        let lambda = self.options.l2;
        let scale = 1.0 / (lambda * n as f64);

        let signs: Vec<f64> = labels.iter().map(|&y| if y { 1.0 } else { -1.0 }).collect();
        // The bias is a constant feature of value 1.
        let squared_norms: Vec<f64> = features.iter().map(|x| x.squared_norm() + 1.0).collect();

        let mut weights = vec![0.0; dimension];
        let mut bias = 0.0;
        let mut duals = vec![0.0; n];
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.options.seed);

        let start = Instant::now();
        let mut stats = TrainingStats::default();

        for epoch in 1..=self.options.max_epochs {
            order.shuffle(&mut rng);

            for &i in &order {
                let x = &features[i];
                let y = signs[i];
                let margin = y * (x.dot(&weights) + bias);
                let updated = solve_coordinate(duals[i], margin, squared_norms[i] * scale);
                let delta = updated - duals[i];
                if delta == 0.0 {
                    continue;
                }

                let step = delta * y * scale;
                for (j, value) in x.iter() {
                    weights[j] += step * value;
                }
                bias += step;
                duals[i] = updated;
            }

            let regularizer = 0.5 * lambda * (squared_sum(&weights) + bias * bias);
            let primal = regularizer + mean_logistic_loss(features, &signs, &weights, bias);
            let dual = duals.iter().map(|&b| entropy(b)).sum::<f64>() / n as f64 - regularizer;
            let gap = primal - dual;

            debug!("epoch {epoch}: primal {primal:.6}, dual {dual:.6}, gap {gap:.3e}");
            stats.epochs = epoch;
            stats.primal_objectives.push(primal);
            stats.dual_objectives.push(dual);
            stats.final_duality_gap = gap;

            if gap <= self.options.tolerance {
                stats.converged = true;
                break;
            }
        }

        stats.training_time_ms = start.elapsed().as_millis() as u64;
        if stats.converged {
            info!(
                "SDCA converged after {} epochs (gap {:.3e}, {} ms)",
                stats.epochs, stats.final_duality_gap, stats.training_time_ms
            );
        } else {
            warn!(
                "SDCA stopped after {} epochs without reaching tolerance {} (gap {:.3e})",
                stats.epochs, self.options.tolerance, stats.final_duality_gap
            );
        }

        Ok(TrainingOutcome {
            model: LinearModel::new(weights, bias),
            stats,
        })
    }

    fn name(&self) -> &str {
        "sdca_logistic_regression"
    }
}

/// Returns the shared dimension of a well-formed training set.
fn check_training_set(features: &[FeatureVector], labels: &[bool]) -> Result<usize> {
    if features.len() != labels.len() {
        return Err(PolarityError::invalid_input(format!(
            "{} feature vectors but {} labels",
            features.len(),
            labels.len()
        )));
    }
    let Some(first) = features.first() else {
        return Err(PolarityError::invalid_input("cannot train on an empty dataset"));
    };
    let dimension = first.dimension();
    if let Some(pos) = features.iter().position(|x| x.dimension() != dimension) {
        return Err(PolarityError::invalid_input(format!(
            "feature vector {pos} has dimension {}, expected {dimension}",
            features[pos].dimension()
        )));
    }
    Ok(dimension)
}

/// Maximize the dual along one coordinate.
///
/// Finds the root in (0, 1) of
/// `ln((1 - β) / β) - margin - q (β - previous)`, which is strictly
/// decreasing, by Newton steps kept inside a shrinking bracket.
fn solve_coordinate(previous: f64, margin: f64, q: f64) -> f64 {
    let mut low = 0.0;
    let mut high = 1.0;
    let mut beta = if previous > 0.0 && previous < 1.0 {
        previous
    } else {
        0.5
    };

    for _ in 0..MAX_NEWTON_STEPS {
        let value = ((1.0 - beta) / beta).ln() - margin - q * (beta - previous);
        if value.abs() < NEWTON_TOLERANCE {
            break;
        }
        if value > 0.0 {
            low = beta;
        } else {
            high = beta;
        }

        let slope = -1.0 / (beta * (1.0 - beta)) - q;
        let candidate = beta - value / slope;
        beta = if candidate > low && candidate < high {
            candidate
        } else {
            0.5 * (low + high)
        };
    }

    beta
}

/// Binary entropy with `0 ln 0 = 0`.
fn entropy(beta: f64) -> f64 {
    let term = |p: f64| if p > 0.0 { -p * p.ln() } else { 0.0 };
    term(beta) + term(1.0 - beta)
}

/// `ln(1 + exp(-z))` without overflow.
pub(crate) fn logistic_loss(z: f64) -> f64 {
    if z > 0.0 {
        (-z).exp().ln_1p()
    } else {
        -z + z.exp().ln_1p()
    }
}

fn mean_logistic_loss(features: &[FeatureVector], signs: &[f64], weights: &[f64], bias: f64) -> f64 {
    let total: f64 = features
        .iter()
        .zip(signs)
        .map(|(x, y)| logistic_loss(y * (x.dot(weights) + bias)))
        .sum();
    total / features.len() as f64
}

fn squared_sum(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}
