//! Error types for the shaadi-planner library.
//!
//! This module provides custom error types using `thiserror` so that form validation,
//! backend failures and transport problems stay distinguishable all the way up to the CLI.

use thiserror::Error;

/// Errors that can occur in the shaadi-planner application.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// A required form field is missing or malformed; raised before any backend call
    #[error("{0}")]
    Validation(String),

    /// Error reported by the backend service, surfaced verbatim
    #[error("Backend error: {0}")]
    Backend(String),

    /// The password gate has not been passed for this session
    #[error("Access denied: enter the wedding password first")]
    AccessDenied,

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

impl PlannerError {
    /// Short label used for logging and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Backend(_) => "backend",
            Self::AccessDenied => "access_denied",
            Self::Http(_) => "http",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
            Self::InvalidConfig(_) => "config",
            Self::Other(_) => "other",
        }
    }

    /// Text for end users: backend messages without the prefix, everything else as displayed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Convenience type alias for Result with `PlannerError`
pub type Result<T> = std::result::Result<T, PlannerError>;

impl From<anyhow::Error> for PlannerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = PlannerError::Validation("Please fill in all required fields".to_string());
        assert_eq!(err.to_string(), "Please fill in all required fields");
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_backend_message_is_prefixed() {
        let err = PlannerError::Backend("User already registered".to_string());
        assert_eq!(err.to_string(), "Backend error: User already registered");
        assert_eq!(err.user_message(), "User already registered");
    }
}
