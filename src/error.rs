use thiserror::Error;

pub type Result<T> = std::result::Result<T, DivergenceError>;

/// Failures surfaced by range learning, transformation and aggregation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DivergenceError {
    /// Malformed or empty input.
    #[error("data error: {0}")]
    Data(String),

    /// The table references analytes the model was never trained on.
    #[error("analytes not found in model: {}", .0.join(", "))]
    AnalyteNotFound(Vec<String>),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
