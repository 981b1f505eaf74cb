pub mod features;
pub mod model;
pub mod predictor;

pub use features::{extract_features, TradeFacts};
pub use model::ModelArtifact;
pub use predictor::{BreakPredictor, PredictionOutcome, RiskLevel};
