use super::{ChurnModel, ModelError};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Class weights at the leaf, class 0 first.
        value: [f64; 2],
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

/// On-disk form of a trained forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    #[serde(default = "default_name")]
    pub name: String,
    pub n_features: usize,
    pub trees: Vec<Tree>,
}

fn default_name() -> String {
    "random_forest".to_string()
}

/// Random-forest classifier evaluated from a pre-trained artifact.
///
/// `predict_proba` averages the normalised leaf distributions of all trees and
/// `predict` takes the argmax, ties going to class 0.
#[derive(Debug, Clone)]
pub struct ForestModel {
    name: String,
    n_features: usize,
    trees: Vec<Tree>,
}

impl ForestModel {
    pub fn load(artifact_path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = artifact_path.as_ref();
        if !path.exists() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }
        let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let model = Self::from_json(&json)?;
        log::info!(
            "Loaded model '{}' from {}: {} trees over {} features",
            model.name,
            path.display(),
            model.trees.len(),
            model.n_features
        );
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let artifact: ForestArtifact = serde_json::from_str(json)?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ForestArtifact) -> Result<Self, ModelError> {
        if artifact.n_features == 0 {
            return Err(ModelError::InvalidArtifact("n_features must be positive".into()));
        }
        if artifact.trees.is_empty() {
            return Err(ModelError::InvalidArtifact("forest has no trees".into()));
        }
        for (t, tree) in artifact.trees.iter().enumerate() {
            check_tree(t, tree, artifact.n_features)?;
        }
        Ok(Self {
            name: artifact.name,
            n_features: artifact.n_features,
            trees: artifact.trees,
        })
    }

    fn tree_proba(tree: &Tree, x: ArrayView1<'_, f64>) -> [f64; 2] {
        let mut index = 0;
        loop {
            match &tree.nodes[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { value } => {
                    let total = value[0] + value[1];
                    return [value[0] / total, value[1] / total];
                }
            }
        }
    }

    fn check_len(&self, x: ArrayView1<'_, f64>) -> Result<(), ModelError> {
        if x.len() != self.n_features {
            return Err(ModelError::ShapeMismatch {
                expected: self.n_features,
                got: x.len(),
            });
        }
        Ok(())
    }
}

// Children must point forward so every walk reaches a leaf.
fn check_tree(t: usize, tree: &Tree, n_features: usize) -> Result<(), ModelError> {
    if tree.nodes.is_empty() {
        return Err(ModelError::InvalidArtifact(format!("tree {t} has no nodes")));
    }
    let n_nodes = tree.nodes.len();
    for (i, node) in tree.nodes.iter().enumerate() {
        match node {
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= n_features {
                    return Err(ModelError::InvalidArtifact(format!(
                        "tree {t} node {i}: feature index {feature} out of range"
                    )));
                }
                if !threshold.is_finite() {
                    return Err(ModelError::InvalidArtifact(format!(
                        "tree {t} node {i}: threshold is not finite"
                    )));
                }
                for child in [*left, *right] {
                    if child <= i || child >= n_nodes {
                        return Err(ModelError::InvalidArtifact(format!(
                            "tree {t} node {i}: child index {child} is not a later node"
                        )));
                    }
                }
            }
            Node::Leaf { value } => {
                let valid = value.iter().all(|w| w.is_finite() && *w >= 0.0);
                if !valid || value[0] + value[1] <= 0.0 {
                    return Err(ModelError::InvalidArtifact(format!(
                        "tree {t} node {i}: leaf weights must be non-negative and not all zero"
                    )));
                }
            }
        }
    }
    Ok(())
}

impl ChurnModel for ForestModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: ArrayView1<'_, f64>) -> Result<i64, ModelError> {
        let proba = self.predict_proba(x)?;
        Ok(if proba[1] > proba[0] { 1 } else { 0 })
    }

    fn predict_proba(&self, x: ArrayView1<'_, f64>) -> Result<Vec<f64>, ModelError> {
        self.check_len(x)?;
        let mut sum = [0.0, 0.0];
        for tree in &self.trees {
            let [p0, p1] = Self::tree_proba(tree, x);
            sum[0] += p0;
            sum[1] += p1;
        }
        let n_trees = self.trees.len() as f64;
        Ok(vec![sum[0] / n_trees, sum[1] / n_trees])
    }
}
