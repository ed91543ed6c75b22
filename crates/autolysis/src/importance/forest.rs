//! Random-forest regression with impurity-based feature importances.
//!
//! Trees are grown CART-style on bootstrap samples: every feature is
//! considered at every split, splits minimize the summed squared error, and
//! nodes are split until pure or smaller than `min_samples_split`.

use rand::prelude::*;
use thiserror::Error;

/// Inputs the forest cannot be fitted on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForestError {
    #[error("no feature columns")]
    NoFeatures,

    #[error("no rows to fit")]
    NoRows,

    #[error("feature {feature} has {rows} rows but the label has {labels}")]
    LengthMismatch {
        feature: usize,
        rows: usize,
        labels: usize,
    },

    #[error("n_estimators must be at least 1")]
    NoEstimators,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single fitted regression tree.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Predict the label of one row (`row[f]` is feature `f`).
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    sse: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

fn sum_squared_error(indices: &[usize], y: &[f64]) -> f64 {
    let n = indices.len() as f64;
    let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n;
    indices.iter().map(|&i| (y[i] - mean).powi(2)).sum()
}

fn find_best_split(indices: &[usize], columns: &[Vec<f64>], y: &[f64]) -> Option<BestSplit> {
    let n = indices.len();
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();

    let mut best: Option<(usize, f64, f64, usize)> = None;
    let mut sorted = indices.to_vec();

    for (feature, column) in columns.iter().enumerate() {
        sorted.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for pos in 1..n {
            let prev = sorted[pos - 1];
            left_sum += y[prev];
            left_sq += y[prev] * y[prev];

            let (lo, hi) = (column[prev], column[sorted[pos]]);
            if lo >= hi {
                continue;
            }

            let n_left = pos as f64;
            let n_right = (n - pos) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left).max(0.0)
                + (right_sq - right_sum * right_sum / n_right).max(0.0);

            if best.is_none_or(|(_, _, best_sse, _)| sse < best_sse) {
                let threshold = lo + (hi - lo) / 2.0;
                // Midpoint can round up to `hi` for adjacent floats.
                let threshold = if threshold >= hi { lo } else { threshold };
                best = Some((feature, threshold, sse, pos));
            }
        }
    }

    let (feature, threshold, sse, _) = best?;
    let column = &columns[feature];
    let (left, right): (Vec<usize>, Vec<usize>) =
        indices.iter().partition(|&&i| column[i] <= threshold);

    if left.is_empty() || right.is_empty() {
        return None;
    }

    Some(BestSplit {
        feature,
        threshold,
        sse,
        left,
        right,
    })
}

/// Grow one tree on `indices`, accumulating weighted impurity decrease per
/// feature into `importances`.
fn grow_tree(
    indices: Vec<usize>,
    columns: &[Vec<f64>],
    y: &[f64],
    min_samples_split: usize,
    importances: &mut [f64],
) -> RegressionTree {
    let mut nodes = vec![Node::Leaf { value: 0.0 }];
    let mut stack = vec![(0usize, indices)];

    while let Some((slot, members)) = stack.pop() {
        let mean = members.iter().map(|&i| y[i]).sum::<f64>() / members.len() as f64;
        let first = y[members[0]];
        let pure = members.iter().all(|&i| y[i] == first);

        if pure || members.len() < min_samples_split {
            nodes[slot] = Node::Leaf { value: mean };
            continue;
        }

        let Some(split) = find_best_split(&members, columns, y) else {
            nodes[slot] = Node::Leaf { value: mean };
            continue;
        };

        let parent_sse = sum_squared_error(&members, y);
        importances[split.feature] += (parent_sse - split.sse).max(0.0);

        let left = nodes.len();
        nodes.push(Node::Leaf { value: 0.0 });
        let right = nodes.len();
        nodes.push(Node::Leaf { value: 0.0 });

        nodes[slot] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        stack.push((left, split.left));
        stack.push((right, split.right));
    }

    RegressionTree { nodes }
}

/// Hyperparameters of the forest. Defaults mirror the common library
/// defaults: 100 trees, bootstrap sampling, unlimited depth.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub min_samples_split: usize,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            min_samples_split: 2,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// A fitted forest and its normalized feature importances.
#[derive(Debug, Clone)]
pub struct FittedForest {
    pub trees: Vec<RegressionTree>,
    /// One score per feature, non-negative, summing to 1 unless no tree
    /// could split at all (then all zeros).
    pub feature_importances: Vec<f64>,
}

impl FittedForest {
    /// Mean prediction across trees.
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            seed,
            ..Self::default()
        }
    }

    /// Fit on column-major features (`columns[f][row]`) and labels `y`.
    ///
    /// # Errors
    ///
    /// Returns a [`ForestError`] when the inputs are empty, their lengths
    /// disagree or no trees are requested.
    pub fn fit(&self, columns: &[Vec<f64>], y: &[f64]) -> Result<FittedForest, ForestError> {
        if columns.is_empty() {
            return Err(ForestError::NoFeatures);
        }
        if y.is_empty() {
            return Err(ForestError::NoRows);
        }
        if let Some(bad) = columns.iter().position(|c| c.len() != y.len()) {
            return Err(ForestError::LengthMismatch {
                feature: bad,
                rows: columns[bad].len(),
                labels: y.len(),
            });
        }
        if self.n_estimators == 0 {
            return Err(ForestError::NoEstimators);
        }

        let n_rows = y.len();
        let n_features = columns.len();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.n_estimators);
        let mut totals = vec![0.0; n_features];

        for _ in 0..self.n_estimators {
            let sample: Vec<usize> = if self.bootstrap {
                (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect()
            } else {
                (0..n_rows).collect()
            };

            let mut tree_importances = vec![0.0; n_features];
            trees.push(grow_tree(
                sample,
                columns,
                y,
                self.min_samples_split.max(2),
                &mut tree_importances,
            ));

            let tree_total: f64 = tree_importances.iter().sum();
            if tree_total > 0.0 {
                for (acc, imp) in totals.iter_mut().zip(&tree_importances) {
                    *acc += imp / tree_total;
                }
            }
        }

        let grand_total: f64 = totals.iter().sum();
        let feature_importances = if grand_total > 0.0 {
            totals.iter().map(|v| v / grand_total).collect()
        } else {
            totals
        };

        Ok(FittedForest {
            trees,
            feature_importances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_dataset(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        // y depends only on the first feature; the second is a repeating pattern
        let signal: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let noise: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64).collect();
        let y = signal.iter().map(|v| 3.0 * v + 1.0).collect();
        (vec![signal, noise], y)
    }

    #[test]
    fn test_importances_sum_to_one() {
        let (x, y) = linear_dataset(60);
        let forest = RandomForestRegressor::new(20, 7).fit(&x, &y).unwrap();

        let total: f64 = forest.feature_importances.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(forest.feature_importances.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_informative_feature_ranks_first() {
        let (x, y) = linear_dataset(80);
        let forest = RandomForestRegressor::new(30, 1).fit(&x, &y).unwrap();
        assert!(forest.feature_importances[0] > forest.feature_importances[1]);
    }

    #[test]
    fn test_fit_is_reproducible_with_seed() {
        let (x, y) = linear_dataset(40);
        let a = RandomForestRegressor::new(10, 3).fit(&x, &y).unwrap();
        let b = RandomForestRegressor::new(10, 3).fit(&x, &y).unwrap();
        assert_eq!(a.feature_importances, b.feature_importances);
    }

    #[test]
    fn test_constant_label_yields_zero_importance() {
        let x = vec![vec![1.0, 2.0, 3.0, 4.0]];
        let y = vec![5.0; 4];
        let forest = RandomForestRegressor::new(5, 0).fit(&x, &y).unwrap();
        assert_eq!(forest.feature_importances, vec![0.0]);
        assert_eq!(forest.predict(&[2.5]), 5.0);
    }

    #[test]
    fn test_single_tree_without_bootstrap_fits_training_data() {
        let (x, y) = linear_dataset(20);
        let forest = RandomForestRegressor {
            n_estimators: 1,
            bootstrap: false,
            ..RandomForestRegressor::default()
        }
        .fit(&x, &y)
        .unwrap();

        for row in 0..20 {
            let features = [x[0][row], x[1][row]];
            assert!((forest.predict(&features) - y[row]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fit_rejects_mismatched_lengths() {
        let x = vec![vec![1.0, 2.0, 3.0]];
        let y = vec![1.0, 2.0];
        let err = RandomForestRegressor::default().fit(&x, &y).unwrap_err();
        assert_eq!(
            err,
            ForestError::LengthMismatch {
                feature: 0,
                rows: 3,
                labels: 2
            }
        );
    }

    #[test]
    fn test_fit_rejects_empty_features() {
        let err = RandomForestRegressor::default().fit(&[], &[1.0]).unwrap_err();
        assert_eq!(err, ForestError::NoFeatures);
    }

    #[test]
    fn test_fit_rejects_zero_trees() {
        let (x, y) = linear_dataset(10);
        let err = RandomForestRegressor::new(0, 1).fit(&x, &y).unwrap_err();
        assert_eq!(err, ForestError::NoEstimators);
    }
}
