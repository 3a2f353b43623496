//! Evaluation metrics.

use ndarray::Array1;

use crate::types::{ClassificationMetrics, FoldMetrics, RegressionMetrics};

/// MSE, RMSE, MAE and R² of `y_pred` against `y_true`.
///
/// R² of a constant `y_true` is 1.0 for a perfect fit and 0.0 otherwise.
pub fn regression_metrics(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> RegressionMetrics {
    let n = y_true.len().max(1) as f64;
    let residuals = y_true - y_pred;

    let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
    let mse = ss_res / n;
    let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / n;

    let mean = y_true.mean().unwrap_or(0.0);
    let ss_tot: f64 = y_true.iter().map(|v| (v - mean) * (v - mean)).sum();
    let r2 = if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    };

    RegressionMetrics {
        mse,
        rmse: mse.sqrt(),
        mae,
        r2,
    }
}

/// Accuracy and support-weighted precision, recall and F1.
///
/// Classes are the union of the true and predicted labels. A class that is
/// never predicted has precision 0; the weights are true-label supports, so a
/// class that only appears in the predictions contributes nothing.
pub fn classification_metrics(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> ClassificationMetrics {
    let n = y_true.len();
    if n == 0 {
        return ClassificationMetrics {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        };
    }

    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();

    let mut labels: Vec<f64> = y_true.iter().chain(y_pred.iter()).copied().collect();
    labels.sort_by(f64::total_cmp);
    labels.dedup();

    let mut precision = 0.0;
    let mut recall = 0.0;
    let mut f1 = 0.0;
    for label in labels {
        let mut tp = 0usize;
        let mut predicted = 0usize;
        let mut support = 0usize;
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let is_true = *t == label;
            let is_pred = *p == label;
            support += usize::from(is_true);
            predicted += usize::from(is_pred);
            tp += usize::from(is_true && is_pred);
        }
        if support == 0 {
            continue;
        }

        let p = ratio(tp, predicted);
        let r = ratio(tp, support);
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };

        let weight = support as f64 / n as f64;
        precision += weight * p;
        recall += weight * r;
        f1 += weight * f;
    }

    ClassificationMetrics {
        accuracy: correct as f64 / n as f64,
        precision,
        recall,
        f1,
    }
}

/// Field-wise mean of fold metrics of one kind. `None` for an empty slice.
pub fn mean_metrics(folds: &[FoldMetrics]) -> Option<FoldMetrics> {
    let first = folds.first()?;
    let n = folds.len() as f64;

    Some(match first {
        FoldMetrics::Regression(_) => {
            let mut sum = RegressionMetrics {
                mse: 0.0,
                rmse: 0.0,
                mae: 0.0,
                r2: 0.0,
            };
            for fold in folds {
                if let FoldMetrics::Regression(m) = fold {
                    sum.mse += m.mse;
                    sum.rmse += m.rmse;
                    sum.mae += m.mae;
                    sum.r2 += m.r2;
                }
            }
            FoldMetrics::Regression(RegressionMetrics {
                mse: sum.mse / n,
                rmse: sum.rmse / n,
                mae: sum.mae / n,
                r2: sum.r2 / n,
            })
        }
        FoldMetrics::Classification(_) => {
            let mut sum = ClassificationMetrics {
                accuracy: 0.0,
                precision: 0.0,
                recall: 0.0,
                f1: 0.0,
            };
            for fold in folds {
                if let FoldMetrics::Classification(m) = fold {
                    sum.accuracy += m.accuracy;
                    sum.precision += m.precision;
                    sum.recall += m.recall;
                    sum.f1 += m.f1;
                }
            }
            FoldMetrics::Classification(ClassificationMetrics {
                accuracy: sum.accuracy / n,
                precision: sum.precision / n,
                recall: sum.recall / n,
                f1: sum.f1 / n,
            })
        }
    })
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_regression_metrics() {
        let y_true = array![3.0, -0.5, 2.0, 7.0];
        let y_pred = array![2.5, 0.0, 2.0, 8.0];

        let m = regression_metrics(&y_true, &y_pred);

        assert!(close(m.mse, 0.375));
        assert!(close(m.rmse, 0.375_f64.sqrt()));
        assert!(close(m.mae, 0.5));
        // sklearn's r2_score gives 0.9486081370449679 on this example
        assert!((m.r2 - 0.948_608_137_044_967_9).abs() < 1e-12);
    }

    #[test]
    fn test_r2_of_constant_target() {
        let y = array![2.0, 2.0];
        assert_eq!(regression_metrics(&y, &array![2.0, 2.0]).r2, 1.0);
        assert_eq!(regression_metrics(&y, &array![2.0, 3.0]).r2, 0.0);
    }

    #[test]
    fn test_weighted_classification_metrics() {
        let y_true = array![0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
        let y_pred = array![0.0, 2.0, 1.0, 0.0, 0.0, 1.0];

        let m = classification_metrics(&y_true, &y_pred);

        // Same example as sklearn's precision_recall_fscore_support docs
        assert!(close(m.accuracy, 2.0 / 6.0));
        assert!(close(m.precision, 2.0 / 9.0));
        assert!(close(m.recall, 1.0 / 3.0));
        assert!(close(m.f1, 4.0 / 15.0));
    }

    #[test]
    fn test_unpredicted_class_counts_as_zero_precision() {
        let y_true = array![0.0, 1.0, 1.0, 1.0];
        let y_pred = array![1.0, 1.0, 1.0, 1.0];

        let m = classification_metrics(&y_true, &y_pred);
        assert!(close(m.accuracy, 0.75));
        assert!(close(m.precision, 0.75 * 0.75));
        assert!(close(m.recall, 0.75));
    }

    #[test]
    fn test_metrics_stay_in_range() {
        let y_true = array![1.0, 1.0, 0.0];
        let y_pred = array![0.0, 0.0, 1.0];
        let m = classification_metrics(&y_true, &y_pred);
        for value in [m.accuracy, m.precision, m.recall, m.f1] {
            assert!((0.0..=1.0).contains(&value));
        }
        assert_eq!(m.accuracy, 0.0);
    }

    #[test]
    fn test_mean_metrics() {
        let folds = [
            FoldMetrics::Classification(ClassificationMetrics {
                accuracy: 1.0,
                precision: 1.0,
                recall: 1.0,
                f1: 1.0,
            }),
            FoldMetrics::Classification(ClassificationMetrics {
                accuracy: 0.5,
                precision: 0.0,
                recall: 0.5,
                f1: 0.0,
            }),
        ];
        let FoldMetrics::Classification(mean) = mean_metrics(&folds).unwrap() else {
            panic!("expected classification metrics");
        };
        assert_eq!(mean.accuracy, 0.75);
        assert_eq!(mean.precision, 0.5);
        assert!(mean_metrics(&[]).is_none());
    }
}
