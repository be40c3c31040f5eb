//! Seeded train/test partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{PolarityError, Result};

/// Partition `examples` into `(train, test)`.
///
/// `round(test_fraction * n)` randomly chosen examples go to the test side and
/// the rest to the train side, both keeping their original relative order.
/// The choice depends only on `seed`, so a fixed seed reproduces the split.
pub fn split<T>(examples: Vec<T>, test_fraction: f64, seed: u64) -> Result<(Vec<T>, Vec<T>)> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(PolarityError::invalid_input(format!(
            "test fraction must be in [0, 1), got {test_fraction}"
        )));
    }

    let total = examples.len();
    let test_len = ((total as f64) * test_fraction).round() as usize;

    let mut indices: Vec<usize> = (0..total).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut in_test = vec![false; total];
    for &idx in &indices[..test_len] {
        in_test[idx] = true;
    }

    let mut train = Vec::with_capacity(total - test_len);
    let mut test = Vec::with_capacity(test_len);
    for (example, held_out) in examples.into_iter().zip(in_test) {
        if held_out {
            test.push(example);
        } else {
            train.push(example);
        }
    }

    Ok((train, test))
}
