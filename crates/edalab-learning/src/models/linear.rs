//! Ordinary least-squares linear regression.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::linalg::solve_symmetric;
use crate::error::{LearningError, Result};

/// Linear regression with an intercept, fitted by least squares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearRegression {
    /// Fit on `x` (rows by features) and `y`.
    ///
    /// Solves the normal equations on centered data, so the intercept is
    /// `mean(y) - coefficients · mean(x)`. Collinear or constant features get
    /// a tiny ridge and end up with (near) zero weight.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(LearningError::InvalidData(
                "cannot fit a regression on zero rows".to_string(),
            ));
        }
        if n_samples != y.len() {
            return Err(LearningError::InvalidData(format!(
                "feature rows ({n_samples}) and target length ({}) differ",
                y.len()
            )));
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| LearningError::InvalidData("empty feature matrix".to_string()))?;
        let y_mean = y.mean().unwrap_or(0.0);

        let x_centered = x - &x_mean.view().insert_axis(Axis(0));
        let y_centered = y - y_mean;

        let xtx = x_centered.t().dot(&x_centered);
        let xty = x_centered.t().dot(&y_centered);
        let coefficients = solve_symmetric(&xtx, &xty).ok_or_else(|| {
            LearningError::TrainingFailed(
                "normal equations are singular, cannot fit linear regression".to_string(),
            )
        })?;
        let intercept = y_mean - coefficients.dot(&x_mean);

        Ok(Self {
            coefficients,
            intercept,
        })
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }

    /// One weight per feature, in feature order.
    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}
