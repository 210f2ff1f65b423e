//! Error types for the rating service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. Callers that need to react to a specific failure
//! category recover it with `downcast_ref::<RatingError>()`.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific rating scenarios
#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("Invalid request: {reason}")]
    Validation { reason: String },

    #[error("Match data provider failed: {message}")]
    Provider { message: String },

    #[error("Team not found: {team_key}")]
    TeamNotFound { team_key: String },

    #[error("No snapshot found at {path}")]
    SnapshotNotFound { path: String },

    #[error("Snapshot could not be parsed: {reason}")]
    SnapshotParse { reason: String },

    #[error("Snapshot I/O failed: {message}")]
    SnapshotIo { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal service error: {message}")]
    Internal { message: String },
}

impl RatingError {
    /// Shorthand for a validation failure
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for a provider failure
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Whether the caller may retry the same operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }
}

/// Find the typed rating error inside an anyhow chain, if there is one
pub fn classify(error: &anyhow::Error) -> Option<&RatingError> {
    error.chain().find_map(|cause| cause.downcast_ref::<RatingError>())
}
