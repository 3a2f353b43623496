//! Gini decision tree used as the base learner of the random forest.

use ndarray::{Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        /// Fraction of the node's samples in each class.
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A classification tree grown until its leaves are pure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Node,
}

/// Best split found for one node.
struct Candidate {
    feature: usize,
    threshold: f64,
    /// `n_left * gini(left) + n_right * gini(right)`
    child_impurity: f64,
}

/// State shared by the recursive build.
struct Builder<'a> {
    x: &'a Array2<f64>,
    labels: &'a [usize],
    n_classes: usize,
    max_features: usize,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `samples` (repeats allowed).
    ///
    /// `labels[i]` is the class index of row `i`. At each node the features are
    /// visited in a random order and the best Gini split among the first
    /// `max_features` is kept; when none of those can split the node, the
    /// search goes on through the remaining features. Thresholds sit midway
    /// between consecutive distinct values and rows with `value <= threshold`
    /// go left.
    ///
    /// Returns the tree and its impurity-decrease importances normalized to
    /// sum to 1 (all zeros when the tree is a single leaf).
    pub fn fit(
        x: &Array2<f64>,
        labels: &[usize],
        n_classes: usize,
        samples: &[usize],
        max_features: usize,
        rng: &mut ChaCha8Rng,
    ) -> (Self, Vec<f64>) {
        let mut builder = Builder {
            x,
            labels,
            n_classes,
            max_features: max_features.max(1),
            importances: vec![0.0; x.ncols()],
        };
        let root = builder.grow(samples.to_vec(), rng);

        let mut importances = builder.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for value in &mut importances {
                *value /= total;
            }
        }
        (Self { root }, importances)
    }

    /// Class distribution of the leaf `row` falls into.
    pub fn predict_distribution(&self, row: ArrayView1<f64>) -> &[f64] {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn depth(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        depth(&self.root)
    }
}

impl Builder<'_> {
    fn grow(&mut self, samples: Vec<usize>, rng: &mut ChaCha8Rng) -> Node {
        let counts = self.class_counts(&samples);
        let n = samples.len();
        let is_pure = counts.iter().filter(|c| **c > 0).count() <= 1;

        if n < 2 || is_pure {
            return self.leaf(&counts, n);
        }

        let Some(best) = self.best_split(&samples, rng) else {
            return self.leaf(&counts, n);
        };

        let decrease = n as f64 * gini(&counts, n) - best.child_impurity;
        self.importances[best.feature] += decrease.max(0.0);

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.x[[i, best.feature]] <= best.threshold);

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.grow(left, rng)),
            right: Box::new(self.grow(right, rng)),
        }
    }

    fn leaf(&self, counts: &[usize], n: usize) -> Node {
        let total = n.max(1) as f64;
        Node::Leaf {
            distribution: counts.iter().map(|c| *c as f64 / total).collect(),
        }
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in samples {
            counts[self.labels[i]] += 1;
        }
        counts
    }

    fn best_split(&self, samples: &[usize], rng: &mut ChaCha8Rng) -> Option<Candidate> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(rng);

        let mut best: Option<Candidate> = None;
        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            if let Some(candidate) = self.best_split_on(feature, samples) {
                let better = best
                    .as_ref()
                    .is_none_or(|b| candidate.child_impurity < b.child_impurity);
                if better {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    /// Lowest weighted child impurity over the thresholds of one feature.
    fn best_split_on(&self, feature: usize, samples: &[usize]) -> Option<Candidate> {
        let mut pairs: Vec<(f64, usize)> = samples
            .iter()
            .map(|&i| (self.x[[i, feature]], self.labels[i]))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = pairs.len();
        let mut left = vec![0usize; self.n_classes];
        let mut right = vec![0usize; self.n_classes];
        for (_, label) in &pairs {
            right[*label] += 1;
        }

        let mut best: Option<Candidate> = None;
        for i in 0..n - 1 {
            let (value, label) = pairs[i];
            left[label] += 1;
            right[label] -= 1;

            let next = pairs[i + 1].0;
            if value == next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n - n_left;
            let child_impurity =
                n_left as f64 * gini(&left, n_left) + n_right as f64 * gini(&right, n_right);

            if best
                .as_ref()
                .is_none_or(|b| child_impurity < b.child_impurity)
            {
                let mut threshold = value + (next - value) / 2.0;
                if threshold >= next || !threshold.is_finite() {
                    threshold = value;
                }
                best = Some(Candidate {
                    feature,
                    threshold,
                    child_impurity,
                });
            }
        }
        best
    }
}

/// Gini impurity of class `counts` summing to `n`.
fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let total = n as f64;
    1.0 - counts
        .iter()
        .map(|c| {
            let p = *c as f64 / total;
            p * p
        })
        .sum::<f64>()
}
