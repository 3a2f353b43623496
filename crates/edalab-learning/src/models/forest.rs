//! Random forest classifier.

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::logistic::sorted_classes;
use super::tree::DecisionTree;
use crate::error::{LearningError, Result};

/// Bagged ensemble of Gini trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    classes: Vec<f64>,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForestClassifier {
    /// Fit `n_estimators` trees on bootstrap samples of `x`/`y`.
    ///
    /// Tree `k` draws its bootstrap sample and its per-node feature orders
    /// from a `ChaCha8Rng` seeded with `seed + k`, so a fit is reproducible
    /// regardless of how rayon schedules the trees. Each split considers
    /// `floor(sqrt(n_features))` features (at least one).
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, n_estimators: usize, seed: u64) -> Result<Self> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(LearningError::InvalidData(
                "cannot fit a random forest on zero rows".to_string(),
            ));
        }
        if n_samples != y.len() {
            return Err(LearningError::InvalidData(format!(
                "feature rows ({n_samples}) and target length ({}) differ",
                y.len()
            )));
        }

        let classes = sorted_classes(y);
        let labels: Vec<usize> = y
            .iter()
            .map(|v| {
                classes
                    .binary_search_by(|c| c.total_cmp(v))
                    .map_err(|_| LearningError::InvalidData(format!("unknown label {v}")))
            })
            .collect::<Result<_>>()?;

        let n_features = x.ncols();
        let max_features = ((n_features as f64).sqrt().floor() as usize).max(1);

        let fitted: Vec<(DecisionTree, Vec<f64>)> = (0..n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(tree_idx as u64));
                let samples: Vec<usize> =
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                DecisionTree::fit(x, &labels, classes.len(), &samples, max_features, &mut rng)
            })
            .collect();

        let mut feature_importances = vec![0.0; n_features];
        for (_, importances) in &fitted {
            for (total, value) in feature_importances.iter_mut().zip(importances) {
                *total += value;
            }
        }
        let sum: f64 = feature_importances.iter().sum();
        if sum > 0.0 {
            for value in &mut feature_importances {
                *value /= sum;
            }
        }

        let trees: Vec<DecisionTree> = fitted.into_iter().map(|(tree, _)| tree).collect();
        debug!(
            trees = trees.len(),
            classes = classes.len(),
            max_features,
            max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            "Random forest fitted"
        );

        Ok(Self {
            classes,
            trees,
            feature_importances,
        })
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Mean impurity decrease per feature, summing to 1 (or all zeros).
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Class probabilities (rows by classes), averaged over the trees' leaves.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut proba = Array2::<f64>::zeros((x.nrows(), self.classes.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            for tree in &self.trees {
                for (k, p) in tree.predict_distribution(row).iter().enumerate() {
                    proba[[i, k]] += p;
                }
            }
        }
        let n_trees = self.trees.len().max(1) as f64;
        proba / n_trees
    }

    /// Most probable class per row; ties go to the smaller class.
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        self.predict_proba(x)
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (k, p) in row.iter().enumerate() {
                    if *p > row[best] {
                        best = k;
                    }
                }
                self.classes[best]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [1.0, 5.0],
            [2.0, 3.0],
            [3.0, 8.0],
            [4.0, 1.0],
            [10.0, 4.0],
            [11.0, 9.0],
            [12.0, 2.0],
            [13.0, 6.0]
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_learns_separable_classes() {
        let (x, y) = separable();
        let forest = RandomForestClassifier::fit(&x, &y, 25, 42).unwrap();

        assert_eq!(forest.classes(), &[0.0, 1.0]);
        assert_eq!(forest.predict(&array![[0.0, 5.0], [20.0, 5.0]]).to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = separable();
        let a = RandomForestClassifier::fit(&x, &y, 10, 42).unwrap();
        let b = RandomForestClassifier::fit(&x, &y, 10, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_importances_sum_to_one() {
        let (x, y) = separable();
        let forest = RandomForestClassifier::fit(&x, &y, 50, 42).unwrap();

        let importances = forest.feature_importances();
        assert_eq!(importances.len(), 2);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_probabilities_are_distributions() {
        let (x, y) = separable();
        let forest = RandomForestClassifier::fit(&x, &y, 20, 1).unwrap();

        for row in forest.predict_proba(&x).rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_class_predicts_it() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![4.0, 4.0, 4.0];

        let forest = RandomForestClassifier::fit(&x, &y, 5, 42).unwrap();
        assert_eq!(forest.predict(&x).to_vec(), vec![4.0, 4.0, 4.0]);
        assert_eq!(forest.feature_importances(), &[0.0]);
    }
}
