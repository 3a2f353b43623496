//! L2-regularized logistic regression fitted by Newton's method.
//!
//! The binary objective is `C · Σ logloss + ½‖w‖²` with an unpenalized
//! intercept. Each Newton step solves the regularized Hessian system and is
//! halved until the objective stops increasing. Problems with more than two
//! classes are fitted one-vs-rest.

use ndarray::{Array1, Array2, Axis, s};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::linalg::solve_symmetric;
use crate::config::TrainingConfig;
use crate::error::{LearningError, Result};

/// Step halvings tried before a Newton step is accepted as is.
const MAX_BACKTRACKS: usize = 30;

/// Solver settings, taken from [`TrainingConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticParams {
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl From<&TrainingConfig> for LogisticParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            c: config.inverse_regularization,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
        }
    }
}

/// A fitted logistic regression classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Sorted distinct labels seen during fitting.
    classes: Vec<f64>,
    /// One row of weights per binary problem (one for two classes, else one per class).
    coefficients: Array2<f64>,
    intercepts: Array1<f64>,
}

impl LogisticRegression {
    /// Fit on `x` and labels `y`.
    ///
    /// Fails with [`LearningError::TrainingFailed`] when `y` holds a single class.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, params: LogisticParams) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(LearningError::InvalidData(format!(
                "feature rows ({}) and target length ({}) differ",
                x.nrows(),
                y.len()
            )));
        }

        let classes = sorted_classes(y);
        if classes.len() < 2 {
            return Err(LearningError::TrainingFailed(format!(
                "logistic regression needs samples of at least 2 classes, got {}",
                classes.len()
            )));
        }

        // Binary problems fit the positive (larger) class only.
        let positives: Vec<f64> = if classes.len() == 2 {
            vec![classes[1]]
        } else {
            classes.clone()
        };

        let n_features = x.ncols();
        let mut coefficients = Array2::<f64>::zeros((positives.len(), n_features));
        let mut intercepts = Array1::<f64>::zeros(positives.len());

        for (row, positive) in positives.iter().enumerate() {
            let targets = y.mapv(|label| if label == *positive { 1.0 } else { 0.0 });
            let (weights, bias) = fit_binary(x, &targets, params)?;
            coefficients.row_mut(row).assign(&weights);
            intercepts[row] = bias;
        }

        Ok(Self {
            classes,
            coefficients,
            intercepts,
        })
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Signed distance to the decision boundary, one column per binary problem.
    pub fn decision_function(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.coefficients.t()) + &self.intercepts.view().insert_axis(Axis(0))
    }

    /// Predicted labels.
    ///
    /// Binary: the larger class when the decision value is positive. One-vs-rest:
    /// the class with the highest score, ties going to the smaller class.
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        let scores = self.decision_function(x);
        if self.classes.len() == 2 {
            return scores
                .column(0)
                .mapv(|z| if z > 0.0 { self.classes[1] } else { self.classes[0] });
        }

        scores
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (k, score) in row.iter().enumerate() {
                    if *score > row[best] {
                        best = k;
                    }
                }
                self.classes[best]
            })
            .collect()
    }
}

/// Sorted distinct values of `y`.
pub(crate) fn sorted_classes(y: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = y.to_vec();
    classes.sort_by(f64::total_cmp);
    classes.dedup();
    classes
}

/// Newton iterations for one binary problem with 0/1 `targets`.
fn fit_binary(
    x: &Array2<f64>,
    targets: &Array1<f64>,
    params: LogisticParams,
) -> Result<(Array1<f64>, f64)> {
    let n_samples = x.nrows();
    let n_params = x.ncols() + 1;

    let mut design = Array2::<f64>::ones((n_samples, n_params));
    design.slice_mut(s![.., 1..]).assign(x);

    let objective = |beta: &Array1<f64>| -> f64 {
        let z = design.dot(beta);
        let loss: f64 = z
            .iter()
            .zip(targets.iter())
            .map(|(z, t)| softplus(*z) - t * z)
            .sum();
        let penalty: f64 = beta.slice(s![1..]).iter().map(|w| w * w).sum();
        params.c * loss + 0.5 * penalty
    };

    let mut beta = Array1::<f64>::zeros(n_params);
    let mut current = objective(&beta);
    let mut iterations = 0;

    for _ in 0..params.max_iter {
        iterations += 1;
        let probabilities = design.dot(&beta).mapv(sigmoid);

        let mut gradient = design.t().dot(&(&probabilities - targets)) * params.c;
        let mut penalty_gradient = gradient.slice_mut(s![1..]);
        penalty_gradient += &beta.slice(s![1..]);

        let weights = probabilities.mapv(|p| p * (1.0 - p));
        let weighted = &design * &weights.view().insert_axis(Axis(1));
        let mut hessian = design.t().dot(&weighted) * params.c;
        for k in 1..n_params {
            hessian[[k, k]] += 1.0;
        }

        let step = solve_symmetric(&hessian, &gradient).ok_or_else(|| {
            LearningError::TrainingFailed("logistic regression Hessian is singular".to_string())
        })?;

        let mut scale = 1.0;
        let mut candidate = &beta - &step;
        let mut value = objective(&candidate);
        for _ in 0..MAX_BACKTRACKS {
            if value <= current {
                break;
            }
            scale *= 0.5;
            candidate = &beta - &(&step * scale);
            value = objective(&candidate);
        }

        let moved = step.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())) * scale;
        beta = candidate;
        current = value;
        if moved < params.tolerance {
            break;
        }
    }

    debug!(iterations, objective = current, "Logistic regression converged");
    Ok((beta.slice(s![1..]).to_owned(), beta[0]))
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn params() -> LogisticParams {
        LogisticParams::from(&TrainingConfig::default())
    }

    #[test]
    fn test_separates_two_classes() {
        let x = array![[-3.0], [-2.0], [-1.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let model = LogisticRegression::fit(&x, &y, params()).unwrap();

        assert_eq!(model.classes(), &[0.0, 1.0]);
        assert_eq!(model.predict(&x).to_vec(), y.to_vec());
        assert!(model.coefficients[[0, 0]] > 0.0);
    }

    #[test]
    fn test_regularization_keeps_weights_finite_on_separable_data() {
        let x = array![[0.0], [10.0]];
        let y = array![0.0, 1.0];

        let model = LogisticRegression::fit(&x, &y, params()).unwrap();
        assert!(model.coefficients.iter().all(|w| w.is_finite()));
        assert!(model.intercepts.iter().all(|b| b.is_finite()));
    }

    #[test]
    fn test_single_class_fails() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 1.0];

        let err = LogisticRegression::fit(&x, &y, params()).unwrap_err();
        assert!(matches!(err, LearningError::TrainingFailed(_)));
    }

    #[test]
    fn test_one_vs_rest_for_three_classes() {
        let x = array![
            [0.0, 0.0],
            [0.2, 0.1],
            [5.0, 0.0],
            [5.2, 0.3],
            [0.0, 5.0],
            [0.1, 5.2]
        ];
        let y = array![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];

        let model = LogisticRegression::fit(&x, &y, params()).unwrap();

        assert_eq!(model.decision_function(&x).ncols(), 3);
        assert_eq!(model.predict(&x).to_vec(), y.to_vec());
    }

    #[test]
    fn test_labels_are_kept_as_given() {
        let x = array![[-1.0], [-0.5], [0.5], [1.0]];
        let y = array![-1.0, -1.0, 7.0, 7.0];

        let model = LogisticRegression::fit(&x, &y, params()).unwrap();
        assert_eq!(model.classes(), &[-1.0, 7.0]);
        assert_eq!(model.predict(&array![[2.0]]).to_vec(), vec![7.0]);
    }
}
