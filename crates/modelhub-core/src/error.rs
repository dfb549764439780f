//! Error types for modelhub core

use thiserror::Error;

/// Result type alias using modelhub Error
pub type Result<T> = std::result::Result<T, Error>;

/// modelhub error types
///
/// Every variant can be rendered as a list of human-readable messages via
/// [`Error::messages`], which is what front-ends display to the user.
#[derive(Error, Debug)]
pub enum Error {
    /// Field-level problems with one or more records
    #[error("Validation failed: {}", .errors.join("; "))]
    ValidationFailed { errors: Vec<String> },

    #[error("Provider name already exists: {0}")]
    DuplicateName(String),

    #[error("Model '{model_id}' already exists for provider {provider_id}")]
    DuplicateModelId {
        provider_id: String,
        model_id: String,
    },

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The transformer produced output that fails validation. This is a defect,
    /// not a user error.
    #[error("Transform produced invalid output: {}", .errors.join("; "))]
    TransformInvalid { errors: Vec<String> },

    #[error("Provider key '{key}' is shared by providers {}", .names.join(", "))]
    KeyCollision { key: String, names: Vec<String> },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(errors: Vec<String>) -> Self {
        Error::ValidationFailed { errors }
    }

    /// Human-readable messages for display
    pub fn messages(&self) -> Vec<String> {
        match self {
            Error::ValidationFailed { errors } | Error::TransformInvalid { errors } => {
                errors.clone()
            }
            other => vec![other.to_string()],
        }
    }

    /// Whether the caller can fix its input and retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ValidationFailed { .. }
                | Error::DuplicateName(_)
                | Error::DuplicateModelId { .. }
                | Error::ProviderNotFound(_)
                | Error::ModelNotFound(_)
                | Error::KeyCollision { .. }
        )
    }
}
