//! Random forest: bootstrapped `linfa-trees` gini trees fitted in parallel
//!
//! Each fitted linfa tree is copied into the crate's tree arena and its leaves
//! are set to the fraud fraction of the bootstrap rows reaching them, so the
//! forest probability is the mean leaf fraction like any bagged CART forest.

use linfa::prelude::*;
use linfa::Dataset;
use linfa_trees::{DecisionTree as CartTree, SplitQuality, TreeNode as CartNode};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{DecisionTree, TreeNode};
use crate::pipeline::TrainingError;

const MODEL_NAME: &str = "Random Forest";

/// Forest settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// `None` lets trees grow until their leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

/// Ensemble whose probability is the mean of the per-tree leaf fractions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    pub n_features: usize,
    /// Each leaf stores the fraction of fraud rows that reached it
    pub trees: Vec<DecisionTree>,
}

impl RandomForestModel {
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }
}

/// Fit `n_estimators` trees, each on a bootstrap sample of the rows
///
/// Every tree draws its seed from the master seed up front, so the result does
/// not depend on how rayon schedules the trees.
pub fn fit_forest(
    x: &[Vec<f64>],
    y: &[u8],
    n_features: usize,
    params: &ForestParams,
) -> Result<RandomForestModel, TrainingError> {
    let n = x.len();
    let records = Array2::from_shape_fn((n, n_features), |(i, j)| x[i][j]);

    let mut master = StdRng::seed_from_u64(params.seed);
    let tree_seeds: Vec<u64> = (0..params.n_estimators).map(|_| master.gen()).collect();

    let trees = tree_seeds
        .par_iter()
        .map(|&seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            fit_bagged_tree(&records, x, y, &bootstrap, params)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RandomForestModel { n_features, trees })
}

/// Fit one gini tree on the bootstrap rows and convert it to the arena
fn fit_bagged_tree(
    records: &Array2<f64>,
    x: &[Vec<f64>],
    y: &[u8],
    bootstrap: &[usize],
    params: &ForestParams,
) -> Result<DecisionTree, TrainingError> {
    let sample = records.select(Axis(0), bootstrap);
    let targets: Array1<usize> = bootstrap.iter().map(|&i| y[i] as usize).collect();
    let dataset = Dataset::new(sample, targets);

    let cart = CartTree::<f64, usize>::params()
        .split_quality(SplitQuality::Gini)
        .max_depth(params.max_depth)
        .min_weight_split(params.min_samples_split as f32)
        .min_weight_leaf(params.min_samples_leaf as f32)
        .fit(&dataset)
        .map_err(|e| TrainingError::FitFailed {
            model: MODEL_NAME,
            message: e.to_string(),
        })?;

    let mut nodes = Vec::new();
    copy_node(cart.root_node(), &mut nodes)?;
    let mut tree = DecisionTree { nodes };
    set_leaf_fractions(&mut tree, x, y, bootstrap);
    Ok(tree)
}

/// Pre-order copy of a linfa node; leaves keep the majority class until
/// `set_leaf_fractions` replaces it
fn copy_node(node: &CartNode<f64, usize>, nodes: &mut Vec<TreeNode>) -> Result<usize, TrainingError> {
    let idx = nodes.len();
    let majority = node.prediction().unwrap_or(0) as f64;
    nodes.push(TreeNode::Leaf { value: majority });
    if node.is_leaf() {
        return Ok(idx);
    }

    let (feature, threshold, _) = node.split();
    let children = node.children();
    let (Some(left), Some(right)) = (children[0].as_deref(), children[1].as_deref()) else {
        return Err(TrainingError::FitFailed {
            model: MODEL_NAME,
            message: format!("split node at depth {} is missing a child", node.depth()),
        });
    };

    let left = copy_node(left, nodes)?;
    let right = copy_node(right, nodes)?;
    nodes[idx] = TreeNode::Split {
        feature,
        threshold,
        left,
        right,
    };
    Ok(idx)
}

/// Replace each leaf by the fraud fraction of the bootstrap rows it receives
fn set_leaf_fractions(tree: &mut DecisionTree, x: &[Vec<f64>], y: &[u8], bootstrap: &[usize]) {
    let mut frauds = vec![0usize; tree.nodes.len()];
    let mut counts = vec![0usize; tree.nodes.len()];
    for &row in bootstrap {
        let leaf = tree.leaf_index(&x[row]);
        counts[leaf] += 1;
        frauds[leaf] += usize::from(y[row] == 1);
    }

    for (idx, node) in tree.nodes.iter_mut().enumerate() {
        if let TreeNode::Leaf { value } = node {
            if counts[idx] > 0 {
                *value = frauds[idx] as f64 / counts[idx] as f64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cluster_data() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            let jitter = (i % 7) as f64 * 0.1;
            x.push(vec![jitter, 1.0 - jitter, 0.5]);
            y.push(0);
            x.push(vec![3.0 + jitter, 4.0 - jitter, 0.5]);
            y.push(1);
        }
        (x, y)
    }

    #[test]
    fn test_forest_separates_clusters() {
        let (x, y) = two_cluster_data();
        let params = ForestParams {
            n_estimators: 15,
            ..Default::default()
        };
        let model = fit_forest(&x, &y, 3, &params).unwrap();

        assert_eq!(model.trees.len(), 15);
        assert!(model.predict_proba_row(&[0.2, 0.8, 0.5]) < 0.2);
        assert!(model.predict_proba_row(&[3.2, 3.8, 0.5]) > 0.8);
    }

    #[test]
    fn test_forest_is_deterministic_for_seed() {
        let (x, y) = two_cluster_data();
        let params = ForestParams {
            n_estimators: 10,
            ..Default::default()
        };
        let a = fit_forest(&x, &y, 3, &params).unwrap();
        let b = fit_forest(&x, &y, 3, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_converted_trees_are_valid_arenas() {
        let (x, y) = two_cluster_data();
        let model = fit_forest(&x, &y, 3, &ForestParams::default()).unwrap();
        for tree in &model.trees {
            tree.validate(3, MODEL_NAME).unwrap();
        }
        for row in &x {
            let p = model.predict_proba_row(row);
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_leaf_fractions_count_bootstrap_duplicates() {
        let mut tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: 0.0 },
                TreeNode::Leaf { value: 1.0 },
            ],
        };
        let x = vec![vec![0.0], vec![0.2], vec![1.0]];
        let y = vec![0, 1, 1];

        set_leaf_fractions(&mut tree, &x, &y, &[0, 0, 0, 1, 2]);
        assert_eq!(tree.nodes[1], TreeNode::Leaf { value: 0.25 });
        assert_eq!(tree.nodes[2], TreeNode::Leaf { value: 1.0 });
    }
}
