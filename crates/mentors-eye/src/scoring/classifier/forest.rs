use serde::{Deserialize, Serialize};

use super::Classifier;

/// Node of a fitted decision tree. Split nodes send a sample left when
/// `x[feature] <= threshold`; leaves hold per-class weights (sample counts or
/// fractions) that are normalised on lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }

    /// Children must point forward so traversal always terminates.
    fn problems(&self, tree: usize, n_features: usize, n_classes: usize) -> Vec<String> {
        let mut problems = Vec::new();
        if self.nodes.is_empty() {
            problems.push(format!("tree {tree} has no nodes"));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        problems.push(format!(
                            "tree {tree} node {index} splits on feature {feature} of {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        problems.push(format!("tree {tree} node {index} has a non-finite threshold"));
                    }
                    for child in [left, right] {
                        if *child <= index || *child >= self.nodes.len() {
                            problems.push(format!(
                                "tree {tree} node {index} points at invalid child {child}"
                            ));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        problems.push(format!(
                            "tree {tree} leaf {index} has {} class weights, expected {n_classes}",
                            value.len()
                        ));
                    }
                    let valid = value.iter().all(|weight| weight.is_finite() && *weight >= 0.0);
                    if !valid || value.iter().sum::<f64>() <= 0.0 {
                        problems.push(format!("tree {tree} leaf {index} has unusable weights"));
                    }
                }
            }
        }

        problems
    }
}

#[derive(Debug, Deserialize)]
struct RawForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

/// Averaging ensemble of decision trees, the shape exported by the offline
/// training job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawForest")]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl TryFrom<RawForest> for RandomForest {
    type Error = String;

    fn try_from(raw: RawForest) -> Result<Self, Self::Error> {
        RandomForest::new(raw.n_features, raw.n_classes, raw.trees)
    }
}

impl RandomForest {
    pub fn new(
        n_features: usize,
        n_classes: usize,
        trees: Vec<DecisionTree>,
    ) -> Result<Self, String> {
        if trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if n_classes == 0 {
            return Err("forest predicts no classes".to_string());
        }

        let problems: Vec<String> = trees
            .iter()
            .enumerate()
            .flat_map(|(index, tree)| tree.problems(index, n_features, n_classes))
            .collect();
        if !problems.is_empty() {
            return Err(problems.join("; "));
        }

        Ok(Self {
            n_features,
            n_classes,
            trees,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let leaf = tree.leaf(features);
            let weight: f64 = leaf.iter().sum();
            for (total, value) in totals.iter_mut().zip(leaf) {
                *total += value / weight;
            }
        }

        let count = self.trees.len() as f64;
        totals.iter_mut().for_each(|total| *total /= count);
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, low: [f64; 3], high: [f64; 3]) -> DecisionTree {
        DecisionTree::new(vec![
            TreeNode::Split {
                feature,
                threshold,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf {
                value: low.to_vec(),
            },
            TreeNode::Leaf {
                value: high.to_vec(),
            },
        ])
    }

    #[test]
    fn averages_normalised_leaf_weights() {
        let forest = RandomForest::new(
            2,
            3,
            vec![
                stump(0, 0.5, [8.0, 1.0, 1.0], [1.0, 3.0, 6.0]),
                stump(1, 0.5, [2.0, 2.0, 0.0], [0.0, 0.0, 4.0]),
            ],
        )
        .expect("valid forest");

        let probabilities = forest.predict_proba(&[0.2, 0.9]);

        assert!((probabilities[0] - 0.4).abs() < 1e-9);
        assert!((probabilities[1] - 0.05).abs() < 1e-9);
        assert!((probabilities[2] - 0.55).abs() < 1e-9);
    }

    #[test]
    fn threshold_ties_go_left() {
        let forest = RandomForest::new(1, 3, vec![stump(0, 0.5, [1.0, 0.0, 0.0], [0.0, 0.0, 1.0])])
            .expect("valid forest");

        assert_eq!(forest.predict_proba(&[0.5]), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn rejects_backward_children_and_bad_leaves() {
        let looping = DecisionTree::new(vec![
            TreeNode::Split {
                feature: 0,
                threshold: 0.5,
                left: 0,
                right: 1,
            },
            TreeNode::Leaf {
                value: vec![1.0, 0.0],
            },
        ]);

        let err = RandomForest::new(1, 3, vec![looping]).unwrap_err();

        assert!(err.contains("invalid child 0"));
        assert!(err.contains("2 class weights"));
    }

    #[test]
    fn deserialization_validates_structure() {
        let json = r#"{"n_features": 1, "n_classes": 3, "trees": [{"nodes": [
            {"feature": 4, "threshold": 0.5, "left": 1, "right": 2},
            {"value": [1, 0, 0]},
            {"value": [0, 0, 1]}
        ]}]}"#;

        let err = serde_json::from_str::<RandomForest>(json).unwrap_err();

        assert!(err.to_string().contains("splits on feature 4"));
    }
}
