//! Error types shared across the resource index workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, RiError>;

/// Main error type for domain-level validation and parsing
#[derive(Error, Debug)]
pub enum RiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid structure for resource '{resource_id}': {reason}")]
    InvalidStructure { resource_id: String, reason: String },

    #[error("Invalid resource '{resource_id}': {reason}")]
    InvalidResource { resource_id: String, reason: String },

    #[error("Element '{local_element_id}' has context '{context}' which is not declared by resource '{resource_id}'")]
    UnknownContext {
        resource_id: String,
        local_element_id: String,
        context: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl RiError {
    pub fn invalid_structure(resource_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidStructure {
            resource_id: resource_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_resource(resource_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResource {
            resource_id: resource_id.to_string(),
            reason: reason.into(),
        }
    }
}
