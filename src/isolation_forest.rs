//! Isolation Forest for unsupervised outlier detection
//!
//! # Algorithm Overview
//!
//! Isolation Forest isolates anomalies by randomly partitioning the feature space.
//! Anomalies are easier to isolate (shorter paths in trees) compared to normal points.
//!
//! Scores follow the paper's convention: in `(0, 1]`, higher is more anomalous,
//! around 0.5 for unremarkable points.
//!
//! # References
//!
//! Liu, F. T., Ting, K. M., & Zhou, Z. H. (2008). Isolation forest.
//! In 2008 Eighth IEEE International Conference on Data Mining (pp. 413-422).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Default sub-sampling size (following original paper)
pub const DEFAULT_SUBSAMPLE_SIZE: usize = 256;

/// A node in an Isolation Tree
#[derive(Debug, Clone)]
enum IsolationNode {
    /// Internal node with split feature and threshold
    Internal {
        feature_idx: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    /// Leaf node with sample count (for path length calculation)
    Leaf { size: usize },
}

impl IsolationNode {
    /// Calculate path length from root to this node for a given sample
    fn path_length(&self, sample: &[f64], current_depth: usize) -> f64 {
        match self {
            IsolationNode::Internal {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                if sample[*feature_idx] < *threshold {
                    left.path_length(sample, current_depth + 1)
                } else {
                    right.path_length(sample, current_depth + 1)
                }
            }
            IsolationNode::Leaf { size } => {
                // Add average path length for unresolved instances
                current_depth as f64 + average_path_length(*size)
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over n points, c(n)
pub fn average_path_length(n: usize) -> f64 {
    const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let m = (n - 1) as f64;
            2.0 * (m.ln() + EULER_GAMMA) - 2.0 * m / n as f64
        }
    }
}

/// Single Isolation Tree
#[derive(Debug, Clone)]
pub struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    /// Build a tree from samples
    fn build<R: Rng>(samples: &[Vec<f64>], max_depth: usize, rng: &mut R) -> Self {
        let root = Self::build_node(samples, 0, max_depth, rng);
        IsolationTree { root }
    }

    /// Recursively build tree nodes
    fn build_node<R: Rng>(
        samples: &[Vec<f64>],
        depth: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> IsolationNode {
        if depth >= max_depth || samples.len() <= 1 {
            return IsolationNode::Leaf {
                size: samples.len(),
            };
        }

        // Only features that still vary can separate this node
        let num_features = samples[0].len();
        let splittable: Vec<(usize, f64, f64)> = (0..num_features)
            .filter_map(|feature_idx| {
                let (min_val, max_val) = samples.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), sample| (lo.min(sample[feature_idx]), hi.max(sample[feature_idx])),
                );
                (max_val - min_val > f64::EPSILON).then_some((feature_idx, min_val, max_val))
            })
            .collect();

        // All samples are identical - create leaf
        let Some(&(feature_idx, min_val, max_val)) = splittable.choose(rng) else {
            return IsolationNode::Leaf {
                size: samples.len(),
            };
        };

        // Random split threshold between min and max
        let threshold = rng.gen_range(min_val..max_val);

        // Partition samples
        let (left_samples, right_samples): (Vec<Vec<f64>>, Vec<Vec<f64>>) = samples
            .iter()
            .cloned()
            .partition(|sample| sample[feature_idx] < threshold);

        // If partition is empty on one side, create leaf
        if left_samples.is_empty() || right_samples.is_empty() {
            return IsolationNode::Leaf {
                size: samples.len(),
            };
        }

        let left = Box::new(Self::build_node(&left_samples, depth + 1, max_depth, rng));
        let right = Box::new(Self::build_node(&right_samples, depth + 1, max_depth, rng));

        IsolationNode::Internal {
            feature_idx,
            threshold,
            left,
            right,
        }
    }

    /// Calculate path length for a sample
    fn path_length(&self, sample: &[f64]) -> f64 {
        self.root.path_length(sample, 0)
    }
}

/// Isolation Forest - ensemble of Isolation Trees
#[derive(Debug)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    num_trees: usize,
    subsample_size: usize,
    /// Points actually drawn per tree, `min(subsample_size, n)`
    sample_size: usize,
    rng: StdRng,
}

impl IsolationForest {
    /// Create a new Isolation Forest
    ///
    /// With a `seed` the fitted forest (and therefore every score) is reproducible.
    pub fn new(num_trees: usize, subsample_size: Option<usize>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        IsolationForest {
            trees: Vec::new(),
            num_trees,
            subsample_size: subsample_size.unwrap_or(DEFAULT_SUBSAMPLE_SIZE),
            sample_size: 0,
            rng,
        }
    }

    /// Fit the model on training data, replacing any previous fit
    pub fn fit(&mut self, samples: &[Vec<f64>]) {
        self.trees.clear();
        self.sample_size = self.subsample_size.min(samples.len());
        if self.sample_size == 0 {
            return;
        }

        let max_depth = (self.sample_size as f64).log2().ceil().max(1.0) as usize;
        let mut indices: Vec<usize> = (0..samples.len()).collect();

        for _ in 0..self.num_trees {
            // Sub-sample data
            indices.shuffle(&mut self.rng);
            let subsamples: Vec<Vec<f64>> = indices[..self.sample_size]
                .iter()
                .map(|&i| samples[i].clone())
                .collect();

            let tree = IsolationTree::build(&subsamples, max_depth, &mut self.rng);
            self.trees.push(tree);
        }
    }

    pub fn num_trees(&self) -> usize {
        self.num_trees
    }

    /// Calculate anomaly score for a sample (higher = more anomalous)
    /// Returns score in range (0, 1]
    pub fn anomaly_score(&self, sample: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }

        // Average path length across all trees
        let avg_path_length: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(sample))
            .sum::<f64>()
            / self.trees.len() as f64;

        // Normalize by expected path length
        let c = average_path_length(self.sample_size);
        if c == 0.0 {
            return 0.5;
        }
        2_f64.powf(-avg_path_length / c)
    }

    /// Score every sample
    pub fn score_samples(&self, samples: &[Vec<f64>]) -> Vec<f64> {
        samples.iter().map(|s| self.anomaly_score(s)).collect()
    }
}

/// Linear-interpolated percentile of unsorted values, `q` in [0, 1]
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Turn scores into outlier decisions for a contamination fraction
///
/// A point is an outlier when its score is strictly above the
/// `(1 - contamination)` percentile of all scores, so roughly
/// `contamination * n` points are selected and ties at the cut stay inliers.
pub fn outliers_by_contamination(scores: &[f64], contamination: f64) -> Vec<bool> {
    let Some(cut) = percentile(scores, 1.0 - contamination) else {
        return Vec::new();
    };
    scores.iter().map(|&score| score > cut).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_tree_creation() {
        let samples = vec![
            vec![1.0, 2.0],
            vec![1.1, 2.1],
            vec![10.0, 20.0], // Outlier
        ];

        let mut rng = StdRng::seed_from_u64(3);
        let trees: Vec<IsolationTree> = (0..50)
            .map(|_| IsolationTree::build(&samples, 10, &mut rng))
            .collect();
        let outlier_total: f64 = trees.iter().map(|t| t.path_length(&[10.0, 20.0])).sum();
        let normal_total: f64 = trees.iter().map(|t| t.path_length(&[1.0, 2.0])).sum();

        // Outlier should have shorter average path
        assert!(outlier_total < normal_total);
    }

    #[test]
    fn test_isolation_forest_detects_outliers() {
        let samples = vec![
            vec![1.0, 2.0],
            vec![1.1, 2.1],
            vec![0.9, 1.9],
            vec![1.2, 2.2],
            vec![10.0, 20.0], // Clear outlier
        ];

        let mut forest = IsolationForest::new(100, Some(4), Some(42));
        forest.fit(&samples);

        let outlier_score = forest.anomaly_score(&[10.0, 20.0]);
        let normal_score = forest.anomaly_score(&[1.0, 2.0]);

        // Outlier should have higher score
        assert!(
            outlier_score > normal_score,
            "Outlier score ({}) should be > normal score ({})",
            outlier_score,
            normal_score
        );
    }

    #[test]
    fn test_seeded_forest_is_reproducible() {
        let samples: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![(i % 7) as f64, (i % 5) as f64 * 1.5])
            .collect();

        let mut a = IsolationForest::new(20, None, Some(9));
        let mut b = IsolationForest::new(20, None, Some(9));
        a.fit(&samples);
        b.fit(&samples);

        assert_eq!(a.score_samples(&samples), b.score_samples(&samples));
    }

    #[test]
    fn test_identical_samples_score_equally() {
        let samples = vec![vec![3.0, 3.0]; 8];
        let mut forest = IsolationForest::new(10, None, Some(1));
        forest.fit(&samples);

        let scores = forest.score_samples(&samples);
        assert!(scores.windows(2).all(|w| w[0] == w[1]));
        // Nothing stands out, so nothing is flagged
        assert!(outliers_by_contamination(&scores, 0.05).iter().all(|&o| !o));
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let apl_10 = average_path_length(10);
        assert!(apl_10 > 3.0 && apl_10 < 4.0); // c(10) ≈ 3.75
        assert!(average_path_length(256) > apl_10);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 1.0), Some(4.0));
        assert_eq!(percentile(&values, 0.5), Some(2.5));
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn test_outliers_by_contamination_selects_top_fraction() {
        let scores: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let flags = outliers_by_contamination(&scores, 0.05);

        assert_eq!(flags.iter().filter(|&&f| f).count(), 5);
        assert!(flags[95..].iter().all(|&f| f));
    }
}
