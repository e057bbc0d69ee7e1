//! Error types for the SCADA configuration system

use thiserror::Error;

/// Core error type for SCADA operations
#[derive(Error, Debug)]
pub enum ScadaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record not found in a document
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Collector unreachable or returned an unusable response
    #[error("Collector error: {0}")]
    Collector(String),

    /// Collector answered with a non-success status
    #[error("Collector returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ScadaError {
    /// Shorthand for a [`ScadaError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Result type alias for SCADA operations
pub type Result<T> = std::result::Result<T, ScadaError>;

impl From<serde_json::Error> for ScadaError {
    fn from(err: serde_json::Error) -> Self {
        ScadaError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ScadaError {
    fn from(err: serde_yaml::Error) -> Self {
        ScadaError::Serialization(err.to_string())
    }
}
