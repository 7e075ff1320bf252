//! Random forest regressor
//!
//! Bootstrap-sampled CART trees with variance-reduction splits. Only what
//! the weight optimizer needs: fit, predict and impurity-based feature
//! importances.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Splits gaining less than this are ignored
const MIN_GAIN: f64 = 1e-12;

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            trees: 100,
            max_depth: 8,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict<const N: usize>(&self, row: &[f64; N]) -> f64 {
        match self {
            Node::Leaf(value) => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Sum of squared errors around the mean, from running sums
fn sse(sum: f64, sum_sq: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (sum_sq - sum * sum / n as f64).max(0.0)
}

struct TreeBuilder<'a, const N: usize> {
    x: &'a [[f64; N]],
    y: &'a [f64],
    config: &'a ForestConfig,
    /// Summed SSE reduction per feature
    gains: [f64; N],
}

impl<'a, const N: usize> TreeBuilder<'a, N> {
    fn build(&mut self, indices: &mut [usize], depth: usize) -> Node {
        let n = indices.len();
        let sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let mean = if n == 0 { 0.0 } else { sum / n as f64 };

        if depth >= self.config.max_depth || n < self.config.min_samples_split.max(2) {
            return Node::Leaf(mean);
        }

        let Some(best) = self.best_split(indices) else {
            return Node::Leaf(mean);
        };

        self.gains[best.feature] += best.gain;

        let (feature, threshold) = (best.feature, best.threshold);
        indices.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));
        let split_at = indices.partition_point(|&i| self.x[i][feature] <= threshold);
        let (left, right) = indices.split_at_mut(split_at);

        Node::Split {
            feature,
            threshold,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }

    fn best_split(&self, indices: &[usize]) -> Option<BestSplit> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let parent = sse(total_sum, total_sq, n);

        let mut best: Option<BestSplit> = None;
        let mut order = indices.to_vec();

        for feature in 0..N {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..n - 1 {
                let y = self.y[order[k]];
                left_sum += y;
                left_sq += y * y;

                let here = self.x[order[k]][feature];
                let next = self.x[order[k + 1]][feature];
                if here == next {
                    continue;
                }

                let left_n = k + 1;
                let children = sse(left_sum, left_sq, left_n)
                    + sse(total_sum - left_sum, total_sq - left_sq, n - left_n);
                let gain = parent - children;

                // Strictly greater keeps the lowest feature index on ties
                if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Fitted forest over `N` features
#[derive(Debug, Clone)]
pub struct RandomForest<const N: usize> {
    trees: Vec<Node>,
    importances: [f64; N],
}

impl<const N: usize> RandomForest<N> {
    /// Fit on rows `x` with targets `y`. Returns `None` for empty or
    /// mismatched input.
    pub fn fit(x: &[[f64; N]], y: &[f64], config: &ForestConfig) -> Option<Self> {
        if x.is_empty() || x.len() != y.len() || config.trees == 0 {
            return None;
        }

        let n = x.len();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut trees = Vec::with_capacity(config.trees);
        let mut importances = [0.0; N];

        for _ in 0..config.trees {
            let mut sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut builder = TreeBuilder {
                x,
                y,
                config,
                gains: [0.0; N],
            };
            trees.push(builder.build(&mut sample, 0));

            let tree_total: f64 = builder.gains.iter().sum();
            if tree_total > 0.0 {
                for (acc, gain) in importances.iter_mut().zip(builder.gains) {
                    *acc += gain / tree_total;
                }
            }
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for value in importances.iter_mut() {
                *value /= total;
            }
        }

        Some(Self { trees, importances })
    }

    pub fn predict(&self, row: &[f64; N]) -> f64 {
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Normalised importance of every feature, indexed like the input
    /// columns. A feature never split on scores 0.0; when no tree splits
    /// at all every entry is 0.0.
    pub fn feature_importances(&self) -> [f64; N] {
        self.importances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ForestConfig {
        ForestConfig {
            trees: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_learns_single_feature() {
        let x: Vec<[f64; 2]> = (0..40).map(|i| [i as f64 / 40.0, 0.5]).collect();
        let y: Vec<f64> = x.iter().map(|r| if r[0] > 0.5 { 1.0 } else { 0.0 }).collect();

        let forest = RandomForest::fit(&x, &y, &small()).unwrap();
        assert!(forest.predict(&[0.9, 0.5]) > 0.8);
        assert!(forest.predict(&[0.1, 0.5]) < 0.2);

        let importances = forest.feature_importances();
        assert!((importances[0] - 1.0).abs() < 1e-9);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_importances_sum_to_one() {
        let x: Vec<[f64; 3]> = (0..60)
            .map(|i| [(i % 7) as f64, (i % 5) as f64, (i % 3) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 2.0 * r[0] + r[1]).collect();

        let forest = RandomForest::fit(&x, &y, &small()).unwrap();
        let importances = forest.feature_importances();
        let total: f64 = importances.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(importances[0] > importances[2]);
    }

    #[test]
    fn test_constant_target_has_no_splits() {
        let x: Vec<[f64; 3]> = (0..15).map(|i| [i as f64, 1.0, 0.0]).collect();
        let y = vec![0.5; 15];

        let forest = RandomForest::fit(&x, &y, &small()).unwrap();
        assert_eq!(forest.feature_importances(), [0.0; 3]);
        assert_eq!(forest.predict(&[3.0, 1.0, 0.0]), 0.5);
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let x: Vec<[f64; 2]> = (0..30).map(|i| [(i * 7 % 11) as f64, (i % 4) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| r[0] - r[1]).collect();

        let a = RandomForest::fit(&x, &y, &small()).unwrap();
        let b = RandomForest::fit(&x, &y, &small()).unwrap();
        assert_eq!(a.feature_importances(), b.feature_importances());
        assert_eq!(a.predict(&[5.0, 1.0]), b.predict(&[5.0, 1.0]));
    }

    #[test]
    fn test_rejects_bad_input() {
        let x: Vec<[f64; 1]> = vec![[1.0]];
        assert!(RandomForest::fit(&x, &[], &small()).is_none());
        assert!(RandomForest::<1>::fit(&[], &[], &small()).is_none());
    }
}
