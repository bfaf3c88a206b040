//! Binary decision trees stored as a flat arena
//!
//! The root is at index 0 and children always come after their parent. A row
//! goes to the left child when `row[feature] < threshold`, which is the rule
//! both linfa's CART trees and the in-crate regression grower follow.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::pipeline::TrainingError;

/// Gains at or below this are treated as "no useful split"
const MIN_GAIN: f64 = 1e-12;

/// Feature values closer than this are not split apart
const VALUE_EPSILON: f64 = 1e-12;

/// A node of the tree arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Fitted binary decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Arena index of the leaf reached by `row`
    pub fn leaf_index(&self, row: &[f64]) -> usize {
        let mut idx = 0;
        while let TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        } = &self.nodes[idx]
        {
            idx = if row[*feature] < *threshold {
                *left
            } else {
                *right
            };
        }
        idx
    }

    /// Leaf value reached by `row`
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match &self.nodes[self.leaf_index(row)] {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split { .. } => unreachable!("leaf_index stops at a leaf"),
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Number of split levels on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Largest feature index referenced by a split, if any
    pub fn max_feature_index(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                TreeNode::Split { feature, .. } => Some(*feature),
                TreeNode::Leaf { .. } => None,
            })
            .max()
    }

    /// Check that every row of width `n_features` can be routed to a leaf
    ///
    /// Trees read back from disk must pass this before `predict_row` is safe.
    pub fn validate(&self, n_features: usize, model: &'static str) -> Result<(), TrainingError> {
        let invalid = |message: String| TrainingError::InvalidModel { model, message };

        if self.nodes.is_empty() {
            return Err(invalid("tree has no nodes".to_string()));
        }
        if let Some(feature) = self.max_feature_index() {
            if feature >= n_features {
                return Err(invalid(format!(
                    "split on feature {} but only {} features exist",
                    feature, n_features
                )));
            }
        }

        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    for child in [*left, *right] {
                        if child <= idx || child >= len {
                            return Err(invalid(format!(
                                "node {} points to child {} (arena has {} nodes)",
                                idx, child, len
                            )));
                        }
                    }
                    if threshold.is_nan() {
                        return Err(invalid(format!("node {} has a NaN threshold", idx)));
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(invalid(format!("leaf {} is not finite", idx)));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Growth limits for a regression tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

/// Best split found for a node
struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
    /// Node rows sorted by `feature`; the first `left_count` go left
    sorted: Vec<usize>,
    left_count: usize,
}

/// Grow a squared-error regression tree over all rows of `x`
///
/// # Arguments
/// * `x` - Row-major feature matrix
/// * `targets` - Per-row regression target
/// * `params` - Growth limits
/// * `leaf_value` - Computes the stored value from the rows reaching a leaf
/// * `rng` - Source for the per-node feature order (breaks gain ties)
pub fn grow_regression_tree<F>(
    x: &[Vec<f64>],
    targets: &[f64],
    params: &TreeParams,
    leaf_value: &F,
    rng: &mut StdRng,
) -> DecisionTree
where
    F: Fn(&[usize]) -> f64,
{
    let mut nodes = Vec::new();
    grow_node(
        x,
        targets,
        (0..x.len()).collect(),
        0,
        params,
        leaf_value,
        rng,
        &mut nodes,
    );
    DecisionTree { nodes }
}

#[allow(clippy::too_many_arguments)]
fn grow_node<F>(
    x: &[Vec<f64>],
    targets: &[f64],
    indices: Vec<usize>,
    depth: usize,
    params: &TreeParams,
    leaf_value: &F,
    rng: &mut StdRng,
    nodes: &mut Vec<TreeNode>,
) -> usize
where
    F: Fn(&[usize]) -> f64,
{
    let idx = nodes.len();
    nodes.push(TreeNode::Leaf { value: 0.0 });

    let too_small = indices.len() < params.min_samples_split.max(2)
        || indices.len() < 2 * params.min_samples_leaf.max(1);

    let split = if depth >= params.max_depth || too_small || is_constant(targets, &indices) {
        None
    } else {
        find_best_split(x, targets, &indices, params, rng)
    };

    match split {
        None => {
            nodes[idx] = TreeNode::Leaf {
                value: leaf_value(indices.as_slice()),
            };
        }
        Some(best) => {
            let mut sorted = best.sorted;
            let right_rows = sorted.split_off(best.left_count);
            let left = grow_node(x, targets, sorted, depth + 1, params, leaf_value, rng, nodes);
            let right = grow_node(
                x,
                targets,
                right_rows,
                depth + 1,
                params,
                leaf_value,
                rng,
                nodes,
            );
            nodes[idx] = TreeNode::Split {
                feature: best.feature,
                threshold: best.threshold,
                left,
                right,
            };
        }
    }

    idx
}

fn is_constant(targets: &[f64], indices: &[usize]) -> bool {
    let first = targets[indices[0]];
    indices
        .iter()
        .all(|&i| (targets[i] - first).abs() < VALUE_EPSILON)
}

/// Search every feature, in a random order, for the largest squared-error decrease
fn find_best_split(
    x: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    params: &TreeParams,
    rng: &mut StdRng,
) -> Option<BestSplit> {
    let n_features = x[indices[0]].len();
    let mut features: Vec<usize> = (0..n_features).collect();
    features.shuffle(rng);

    let mut best: Option<BestSplit> = None;
    for &feature in &features {
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        if let Some((left_count, threshold, gain)) =
            best_split_for_feature(x, targets, &sorted, feature, params)
        {
            if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(BestSplit {
                    feature,
                    threshold,
                    gain,
                    sorted,
                    left_count,
                });
            }
        }
    }

    best
}

/// Scan one sorted feature; returns (left_count, threshold, gain) of its best cut
fn best_split_for_feature(
    x: &[Vec<f64>],
    targets: &[f64],
    sorted: &[usize],
    feature: usize,
    params: &TreeParams,
) -> Option<(usize, f64, f64)> {
    let n = sorted.len();
    let min_leaf = params.min_samples_leaf.max(1);

    let total_sum: f64 = sorted.iter().map(|&i| targets[i]).sum();
    let total_sum_sq: f64 = sorted.iter().map(|&i| targets[i] * targets[i]).sum();
    let parent = total_sum_sq - total_sum * total_sum / n as f64;

    let mut best: Option<(usize, f64, f64)> = None;
    let mut left_sum = 0.0;
    let mut left_sum_sq = 0.0;

    for i in 0..n - 1 {
        let t = targets[sorted[i]];
        left_sum += t;
        left_sum_sq += t * t;

        let left_count = i + 1;
        let right_count = n - left_count;
        if left_count < min_leaf || right_count < min_leaf {
            continue;
        }

        let current = x[sorted[i]][feature];
        let next = x[sorted[i + 1]][feature];
        if (next - current).abs() < VALUE_EPSILON {
            continue;
        }

        let l = left_count as f64;
        let r = right_count as f64;
        let right_sum = total_sum - left_sum;
        let right_sum_sq = total_sum_sq - left_sum_sq;
        let left_sse = left_sum_sq - left_sum * left_sum / l;
        let right_sse = right_sum_sq - right_sum * right_sum / r;
        let gain = parent - (left_sse + right_sse);

        if best.map_or(true, |(_, _, g)| gain > g) {
            // `current` must route left and `next` right under `x < threshold`
            let mut threshold = (current + next) / 2.0;
            if threshold <= current {
                threshold = next;
            }
            best = Some((left_count, threshold, gain));
        }
    }

    best
}
