//! Frozen regression trees for the ensemble model.

use serde::{Deserialize, Serialize};

/// Deepest tree the registry accepts
pub const MAX_TREE_DEPTH: usize = 8;

/// A node in a frozen regression tree.
///
/// `feature` indexes the owning model's feature list. Rows with
/// `x[feature] <= threshold` go left.
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

/// Piecewise-constant regressor stored as a flat node array, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Check the structure against the number of model features.
    ///
    /// Children must point forward in the array, which rules out cycles.
    /// Every node other than the root has exactly one parent, so the nodes
    /// form a tree rather than a shared graph.
    pub fn validate(&self, num_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let mut has_parent = vec![false; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= num_features {
                        return Err(format!(
                            "node {i} splits on feature {feature}, model has {num_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i} has a non-finite threshold"));
                    }
                    if left == right {
                        return Err(format!("node {i} sends both branches to node {left}"));
                    }
                    for &child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i} has invalid child {child}"));
                        }
                        if has_parent[child] {
                            return Err(format!("node {child} has more than one parent"));
                        }
                        has_parent[child] = true;
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {i} has a non-finite value"));
                    }
                }
            }
        }
        let depth = self.depth();
        if depth > MAX_TREE_DEPTH {
            return Err(format!("tree depth {depth} exceeds {MAX_TREE_DEPTH}"));
        }
        Ok(())
    }

    /// Number of split levels on the longest root-to-leaf path.
    ///
    /// One backward pass over the array; children always sit after their
    /// parent, so their depths are known by the time the parent is reached.
    /// Out-of-range children count as leaves.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        for i in (0..self.nodes.len()).rev() {
            if let TreeNode::Split { left, right, .. } = &self.nodes[i] {
                let child_depth = |c: usize| {
                    if c > i {
                        depths.get(c).copied().unwrap_or(0)
                    } else {
                        0
                    }
                };
                let depth = 1 + child_depth(*left).max(child_depth(*right));
                depths[i] = depth;
            }
        }
        depths.first().copied().unwrap_or(0)
    }

    /// Predict for one row. Assumes `validate` passed.
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
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

/// Mean of the trees' predictions
pub fn forest_predict(trees: &[RegressionTree], row: &[f64]) -> f64 {
    if trees.is_empty() {
        return 0.0;
    }
    trees.iter().map(|t| t.predict(row)).sum::<f64>() / trees.len() as f64
}
