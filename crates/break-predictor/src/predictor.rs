//! Online inference for break probability.

use recon_core::{BreakHistoryRow, ReconConfig, ReconError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::features::{extract_features, TradeFacts, FEATURE_NAMES};
use crate::model::ModelArtifact;

/// Probability at or above which a break is predicted.
const PREDICTION_THRESHOLD: f64 = 0.5;
/// How many contributing factors to surface.
const TOP_FACTORS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.8 {
            RiskLevel::Critical
        } else if probability >= 0.6 {
            RiskLevel::High
        } else if probability >= 0.4 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub break_probability: f64,
    pub predicted_break: bool,
    pub risk_level: RiskLevel,
    pub contributing_factors: HashMap<String, f64>,
}

#[derive(Debug)]
pub struct BreakPredictor {
    artifact: ModelArtifact,
}

impl BreakPredictor {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self { artifact }
    }

    /// Load the configured artifact; `ModelUnavailable` when absent.
    pub fn from_config(config: &ReconConfig) -> Result<Self, ReconError> {
        let path = PathBuf::from(&config.ml_model_path).join(&config.break_prediction_model);
        Ok(Self::new(ModelArtifact::load(&path)?))
    }

    pub fn model_version(&self) -> &str {
        self.artifact.version()
    }

    /// Score one trade. Features are ordered by the artifact's recorded
    /// feature list; anything the extractor did not produce scores 0.
    pub fn predict_break_probability(
        &self,
        trade: &TradeFacts,
        history: &[BreakHistoryRow],
    ) -> PredictionOutcome {
        let features = extract_features(trade, history);

        let names: Vec<&str> = if self.artifact.feature_names.is_empty() {
            FEATURE_NAMES.to_vec()
        } else {
            self.artifact.feature_names.iter().map(String::as_str).collect()
        };

        let vector: Vec<f64> = names
            .iter()
            .map(|name| features.get(*name).copied().unwrap_or(0.0))
            .collect();

        let probability = self.artifact.predict_proba(&vector);

        let mut ranked: Vec<(&str, f64)> = names
            .iter()
            .copied()
            .zip(self.artifact.feature_importances().iter().copied())
            .collect();
        ranked.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let contributing_factors = ranked
            .into_iter()
            .take(TOP_FACTORS)
            .map(|(name, importance)| (name.to_string(), importance))
            .collect();

        PredictionOutcome {
            break_probability: probability,
            predicted_break: probability >= PREDICTION_THRESHOLD,
            risk_level: RiskLevel::from_probability(probability),
            contributing_factors,
        }
    }
}
