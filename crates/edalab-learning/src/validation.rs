//! Train/test fold construction.
//!
//! [`time_series_split`] builds expanding-window folds in which every test
//! block comes after all of its training rows. [`holdout_split`] is the
//! single shuffled split of the older evaluation protocol.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::config::{EvaluationStrategy, TrainingConfig};
use crate::error::{LearningError, Result};

/// Row indices of one train/test split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Folds for `n_samples` rows under the configured strategy.
pub fn build_folds(n_samples: usize, config: &TrainingConfig) -> Result<Vec<Fold>> {
    match config.evaluation {
        EvaluationStrategy::TimeSeriesCv => time_series_split(n_samples, config.cv_folds),
        EvaluationStrategy::Holdout { test_size } => {
            Ok(vec![holdout_split(n_samples, test_size, config.random_seed)?])
        }
    }
}

/// Expanding-window time-series split.
///
/// With `test_size = n_samples / (n_splits + 1)` (integer division), fold `i`
/// tests rows `[n - (n_splits - i) * test_size, n - (n_splits - i - 1) * test_size)`
/// and trains on every row before them. Any remainder of the division goes
/// to the first training window.
pub fn time_series_split(n_samples: usize, n_splits: usize) -> Result<Vec<Fold>> {
    if n_splits < 2 {
        return Err(LearningError::InvalidConfig(format!(
            "time-series split needs at least 2 folds, got {n_splits}"
        )));
    }
    if n_samples < n_splits + 1 {
        return Err(LearningError::InvalidData(format!(
            "Cannot have number of folds={} greater than the number of samples={n_samples}",
            n_splits + 1
        )));
    }

    let test_size = n_samples / (n_splits + 1);
    let folds = (0..n_splits)
        .map(|i| {
            let test_start = n_samples - (n_splits - i) * test_size;
            let test_end = test_start + test_size;
            Fold {
                train: (0..test_start).collect(),
                test: (test_start..test_end).collect(),
            }
        })
        .collect();
    Ok(folds)
}

/// Seeded shuffled split holding out `ceil(test_size * n_samples)` rows.
pub fn holdout_split(n_samples: usize, test_size: f64, seed: u64) -> Result<Fold> {
    let n_test = (test_size * n_samples as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(LearningError::InvalidData(format!(
            "holdout split of {n_samples} rows with test_size={test_size} leaves an empty side"
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let test = indices[..n_test].to_vec();
    let train = indices[n_test..].to_vec();
    Ok(Fold { train, test })
}
