//! Configuration types for model training.
//!
//! This module provides [`TrainingConfig`] and its builder, as well as the
//! [`EvaluationStrategy`] that decides how a dataset is split into folds.
//!
//! # Example
//!
//! ```
//! use edalab_learning::{EvaluationStrategy, TrainingConfig};
//!
//! let config = TrainingConfig::builder()
//!     .cv_folds(5)
//!     .n_estimators(200)
//!     .evaluation(EvaluationStrategy::TimeSeriesCv)
//!     .build()
//!     .expect("valid config");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LearningError;

/// How rows are split into training and test sets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum EvaluationStrategy {
    /// Expanding-window time-series cross-validation.
    ///
    /// Every fold tests on a block of rows that comes strictly after all of
    /// its training rows. Uses [`TrainingConfig::cv_folds`] folds.
    #[default]
    TimeSeriesCv,

    /// A single shuffled train/test split.
    ///
    /// `test_size` is the fraction of rows held out; the shuffle is seeded
    /// with [`TrainingConfig::random_seed`].
    Holdout { test_size: f64 },
}

impl EvaluationStrategy {
    /// Default holdout fraction.
    pub const DEFAULT_HOLDOUT_TEST_SIZE: f64 = 0.3;

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStrategy::TimeSeriesCv => "timeseries",
            EvaluationStrategy::Holdout { .. } => "holdout",
        }
    }
}

impl fmt::Display for EvaluationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses `timeseries` or `holdout` (case-insensitive).
impl FromStr for EvaluationStrategy {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timeseries" | "time_series" | "timeseries_cv" => Ok(EvaluationStrategy::TimeSeriesCv),
            "holdout" => Ok(EvaluationStrategy::Holdout {
                test_size: Self::DEFAULT_HOLDOUT_TEST_SIZE,
            }),
            other => Err(LearningError::InvalidConfig(format!(
                "unknown evaluation strategy '{other}', expected 'timeseries' or 'holdout'"
            ))),
        }
    }
}

/// Configuration for the [`Trainer`](crate::Trainer).
///
/// Use [`TrainingConfig::builder()`] to construct a validated configuration.
///
/// # Validation
///
/// [`build()`](TrainingConfigBuilder::build) checks:
/// - `cv_folds` is at least 2
/// - `n_estimators` and `max_iter` are at least 1
/// - `tolerance` and `inverse_regularization` are finite and positive
/// - a holdout `test_size` lies in `(0.0, 1.0)`
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Number of time-series folds (default: 5).
    pub cv_folds: usize,

    /// Fold construction strategy (default: time-series CV).
    pub evaluation: EvaluationStrategy,

    /// Trees in a random forest (default: 100).
    pub n_estimators: usize,

    /// Seed for bootstrap sampling, feature draws and holdout shuffles (default: 42).
    pub random_seed: u64,

    /// Newton iteration cap for logistic regression (default: 1000).
    pub max_iter: usize,

    /// Convergence tolerance on the logistic regression step size (default: 1e-6).
    pub tolerance: f64,

    /// Inverse L2 regularization strength `C` for logistic regression (default: 1.0).
    pub inverse_regularization: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            cv_folds: 5,
            evaluation: EvaluationStrategy::default(),
            n_estimators: 100,
            random_seed: 42,
            max_iter: 1000,
            tolerance: 1e-6,
            inverse_regularization: 1.0,
        }
    }
}

impl TrainingConfig {
    /// Create a new builder for `TrainingConfig`.
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Check every value against its allowed range.
    pub fn validate(&self) -> Result<(), LearningError> {
        if self.cv_folds < 2 {
            return Err(LearningError::InvalidConfig(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.max_iter == 0 {
            return Err(LearningError::InvalidConfig(
                "max_iter must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(LearningError::InvalidConfig(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.inverse_regularization.is_finite() && self.inverse_regularization > 0.0) {
            return Err(LearningError::InvalidConfig(format!(
                "inverse_regularization must be positive, got {}",
                self.inverse_regularization
            )));
        }
        if let EvaluationStrategy::Holdout { test_size } = self.evaluation {
            if !(test_size > 0.0 && test_size < 1.0) {
                return Err(LearningError::InvalidConfig(format!(
                    "holdout test_size must be between 0 and 1 (exclusive), got {test_size}"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`TrainingConfig`].
///
/// Created via [`TrainingConfig::builder()`]. All setters return `self` to
/// allow method chaining.
#[derive(Debug, Clone, Default)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    /// Set the number of time-series folds (default: 5).
    #[must_use]
    pub fn cv_folds(mut self, folds: usize) -> Self {
        self.config.cv_folds = folds;
        self
    }

    /// Set the evaluation strategy.
    #[must_use]
    pub fn evaluation(mut self, evaluation: EvaluationStrategy) -> Self {
        self.config.evaluation = evaluation;
        self
    }

    /// Set the number of trees in a random forest (default: 100).
    #[must_use]
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.config.n_estimators = n;
        self
    }

    /// Set the random seed (default: 42).
    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Set the logistic regression iteration cap (default: 1000).
    #[must_use]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    #[must_use]
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Set the inverse regularization strength `C` (default: 1.0).
    #[must_use]
    pub fn inverse_regularization(mut self, c: f64) -> Self {
        self.config.inverse_regularization = c;
        self
    }

    /// Build the configuration, validating all values.
    pub fn build(self) -> Result<TrainingConfig, LearningError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
