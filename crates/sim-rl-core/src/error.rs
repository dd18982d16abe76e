//! Error types for sim-rl

use thiserror::Error;

/// Result type for sim-rl operations
pub type Result<T> = std::result::Result<T, SimError>;

/// sim-rl error types
///
/// The adapter never recovers from these on its own; every variant carries
/// enough context to tell which operation (and, for extraction, which
/// state field) failed.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid construction parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Scenario generation or compilation failed
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// Action outside the declared action space
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Operation called without a live episode
    #[error("Invalid state for {operation}: {reason}")]
    InvalidState {
        operation: &'static str,
        reason: String,
    },

    /// A required value could not be derived from simulation state
    #[error("Extraction error on `{field}`: {reason}")]
    Extraction { field: String, reason: String },

    /// Simulation backend failure
    #[error("Simulation error: {0}")]
    Simulation(String),

    /// Visualization failure
    #[error("Render error: {0}")]
    Render(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Filesystem error while loading configuration or scenarios
    #[error("IO error: {0}")]
    Io(String),
}

impl SimError {
    /// Shorthand for [`SimError::InvalidState`]
    pub fn invalid_state(operation: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidState {
            operation,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`SimError::Extraction`]
    pub fn extraction(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::Extraction {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Io(err.to_string())
    }
}
