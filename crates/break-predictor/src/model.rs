//! Serialized model artifact handling.
//!
//! The artifact is a JSON document `{model, feature_names}` produced by the
//! offline training pipeline. The engine only requires a probability
//! function and an importance vector; a missing artifact is an error,
//! never a fallback heuristic.

use recon_core::ReconError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "unversioned".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: LinearModel,
    #[serde(default)]
    pub feature_names: Vec<String>,
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self, ReconError> {
        if !path.exists() {
            return Err(ReconError::ModelUnavailable(format!(
                "Model file not found at {}. Train and save a model first.",
                path.display()
            )));
        }

        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReconError::ModelUnavailable(format!("Cannot read {}: {e}", path.display()))
        })?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)
            .map_err(|e| ReconError::Validation(format!("Malformed model artifact: {e}")))?;

        tracing::info!(
            "Loaded break prediction model {} from {}",
            artifact.model.version,
            path.display()
        );
        Ok(artifact)
    }

    /// P(break) for a feature vector in the artifact's feature order.
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        let z: f64 = self
            .model
            .weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.model.intercept;
        sigmoid(z)
    }

    /// Per-feature importances; for a linear model, the weights.
    pub fn feature_importances(&self) -> &[f64] {
        &self.model.weights
    }

    pub fn version(&self) -> &str {
        &self.model.version
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
