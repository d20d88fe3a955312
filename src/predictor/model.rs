//! Pre-trained point-prediction models.
//!
//! The pipeline only needs one capability from a model: map the six ordered
//! features `([AMPA], [T], Ls, Hc, E, time)` to a single activation estimate.
//! That capability is the [`PointModel`] trait.
//!
//! [`ModelArtifact`] is the shipped implementation, deserialized from a JSON
//! artifact. It covers the model families typically exported for this task:
//!
//! - `linear`: `intercept + Σ wᵢ·xᵢ`
//! - `tree`: a regression tree over the features
//! - `bagging`: the mean of several member models

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};

/// Number of features a model consumes.
pub const FEATURE_COUNT: usize = 6;

/// A pre-trained capability mapping a feature vector to one numeric label.
pub trait PointModel {
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, AppError>;
}

/// Serialized model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelArtifact {
    Linear {
        intercept: f64,
        weights: [f64; FEATURE_COUNT],
    },
    Tree {
        root: usize,
        nodes: Vec<TreeNode>,
    },
    Bagging {
        members: Vec<ModelArtifact>,
    },
}

/// Regression tree node. Inner nodes go `left` iff `x[feature] < threshold`.
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
        value: f64,
    },
}

impl ModelArtifact {
    /// Load and validate a model artifact from `path`.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::new(
                ErrorKind::ModelLoad,
                format!("Failed to open model file '{}': {e}", path.display()),
            )
        })?;
        let model: ModelArtifact = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            AppError::new(
                ErrorKind::ModelLoad,
                format!("Invalid model file '{}': {e}", path.display()),
            )
        })?;
        model.validate()?;
        Ok(model)
    }

    /// Structural checks that make inference total over well-formed inputs.
    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            ModelArtifact::Linear { .. } => Ok(()),
            ModelArtifact::Tree { root, nodes } => {
                let bad = |msg: String| AppError::new(ErrorKind::ModelLoad, msg);
                if *root >= nodes.len() {
                    return Err(bad(format!(
                        "Tree root {root} out of range ({} nodes).",
                        nodes.len()
                    )));
                }
                for (i, node) in nodes.iter().enumerate() {
                    if let TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } = node
                    {
                        if *feature >= FEATURE_COUNT {
                            return Err(bad(format!("Tree node {i}: feature {feature} out of range.")));
                        }
                        if !threshold.is_finite() {
                            return Err(bad(format!("Tree node {i}: non-finite threshold.")));
                        }
                        if *left >= nodes.len() || *right >= nodes.len() {
                            return Err(bad(format!("Tree node {i}: child index out of range.")));
                        }
                    }
                }
                Ok(())
            }
            ModelArtifact::Bagging { members } => {
                if members.is_empty() {
                    return Err(AppError::new(
                        ErrorKind::ModelLoad,
                        "Bagging model has no members.",
                    ));
                }
                members.iter().try_for_each(ModelArtifact::validate)
            }
        }
    }
}

impl PointModel for ModelArtifact {
    fn predict(&self, x: &[f64; FEATURE_COUNT]) -> Result<f64, AppError> {
        match self {
            ModelArtifact::Linear { intercept, weights } => {
                Ok(intercept + weights.iter().zip(x.iter()).map(|(w, v)| w * v).sum::<f64>())
            }
            ModelArtifact::Tree { root, nodes } => predict_tree(*root, nodes, x),
            ModelArtifact::Bagging { members } => {
                let mut sum = 0.0;
                for m in members {
                    sum += m.predict(x)?;
                }
                Ok(sum / members.len() as f64)
            }
        }
    }
}

fn predict_tree(root: usize, nodes: &[TreeNode], x: &[f64; FEATURE_COUNT]) -> Result<f64, AppError> {
    let mut idx = root;
    // A well-formed tree reaches a leaf in fewer hops than it has nodes.
    for _ in 0..=nodes.len() {
        let node = nodes.get(idx).ok_or_else(|| {
            AppError::new(ErrorKind::ModelInference, format!("Tree node {idx} does not exist."))
        })?;
        match node {
            TreeNode::Leaf { value } => return Ok(*value),
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let v = x.get(*feature).copied().ok_or_else(|| {
                    AppError::new(
                        ErrorKind::ModelInference,
                        format!("Tree split on missing feature {feature}."),
                    )
                })?;
                idx = if v < *threshold { *left } else { *right };
            }
        }
    }
    Err(AppError::new(
        ErrorKind::ModelInference,
        "Tree traversal did not reach a leaf (cycle in tree).",
    ))
}
