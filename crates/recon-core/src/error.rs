use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("External source error: {0}")]
    TransientExternal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Invariant violated: {0}")]
    InvariantViolated(String),
}
