//! Error types for the analysis engine

use thiserror::Error;

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by ingestion, configuration and the graph analysis stages
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// One or more required record fields are absent
    #[error("missing required field(s): {}", .fields.join(", "))]
    MissingField {
        /// Names of the absent fields
        fields: Vec<&'static str>,
    },

    /// A configuration value is out of range
    #[error("invalid configuration value '{name}': {message}")]
    InvalidConfig {
        /// Name of the offending setting
        name: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// An internal graph invariant was violated
    #[error("graph invariant violated: {0}")]
    Computation(String),
}

impl EngineError {
    pub(crate) fn invalid_config(name: &'static str, message: impl Into<String>) -> Self {
        EngineError::InvalidConfig {
            name,
            message: message.into(),
        }
    }
}
