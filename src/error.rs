//! Error types for the finance assistant

use std::time::Duration;
use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Caller-visible Errors
    // =============================

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Computation error: {0}")]
    Computation(String),

    // =============================
    // Absorbed Errors
    // =============================

    #[error("External service error: {0}")]
    ExternalService(#[from] ExternalServiceError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AssistantError {
    /// Only rejected input and the zero-hours division may reach a caller.
    pub fn crosses_boundary(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Computation(_))
    }
}

/// Failures of the external generative call. Always absorbed by the assistant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExternalServiceError {
    #[error("generative service not configured")]
    NotConfigured,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_policy() {
        assert!(AssistantError::Validation("missing column".into()).crosses_boundary());
        assert!(AssistantError::Computation("zero hours".into()).crosses_boundary());
        assert!(!AssistantError::Persistence("disk full".into()).crosses_boundary());
        assert!(!AssistantError::from(ExternalServiceError::NotConfigured).crosses_boundary());
    }

    #[test]
    fn test_timeout_message() {
        let err = ExternalServiceError::Timeout(Duration::from_secs(30));
        assert!(err.to_string().contains("30s"));
    }
}
