pub mod breaks;
pub mod fuzzy;
pub mod normalizers;
pub mod orchestrator;

pub use breaks::BreakDeriver;
pub use fuzzy::{FieldScores, FuzzyMatcher, MatchConfidence, MatchField, MatchScore, MatchWeights};
pub use orchestrator::MatchingOrchestrator;
