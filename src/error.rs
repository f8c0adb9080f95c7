//! Gateway error types

use std::time::Duration;

/// Errors surfaced by the gateway.
///
/// None of these are process-fatal: every kind is returned to the immediate
/// caller. Remote failures during generation are additionally folded into
/// [`GenerationResult::Failure`](crate::GenerationResult::Failure) using
/// [`GenkitError::code`].
#[derive(Debug, thiserror::Error)]
pub enum GenkitError {
    // Caller/configuration errors
    /// Invalid or missing setting. Not retried.
    #[error("configuration error in '{field}': {message}")]
    Configuration { field: String, message: String },

    /// Function-call arguments (or structured output) failed the schema check.
    #[error("validation error at {path}: {message}")]
    Validation { path: String, message: String },

    /// No function registered under this name.
    #[error("function not found: {0}")]
    NotFound(String),

    /// A registered function handler failed.
    #[error("function error: {0}")]
    Function(String),

    // Remote/network errors
    /// A generation call failed; carries the failure code and message.
    #[error("remote error ({code}): {message}")]
    Remote { code: String, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The remote answered but the body did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenkitError {
    /// Shorthand for a [`GenkitError::Configuration`] naming `field`.
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`GenkitError::Validation`] at `path`.
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Stable, machine-readable failure code.
    pub fn code(&self) -> &str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Function(_) => "FUNCTION_ERROR",
            Self::Remote { code, .. } => code.as_str(),
            Self::Http(_) => "NETWORK_ERROR",
            Self::Api { .. } => "REMOTE_ERROR",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::ModelNotFound(_) => "MODEL_NOT_FOUND",
            Self::MalformedResponse(_) | Self::Json(_) => "MALFORMED_RESPONSE",
        }
    }

    /// Whether re-issuing the identical request may succeed.
    ///
    /// Caller-side errors (configuration, validation, unknown function) are
    /// deterministic and never transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Remote { .. }
                | Self::Http(_)
                | Self::Api { .. }
                | Self::RateLimited { .. }
                | Self::MalformedResponse(_)
        )
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GenkitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_names_field() {
        let err = GenkitError::configuration("temperature", "must be within [0, 1], got 1.5");
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
        assert!(err.to_string().contains("temperature"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn remote_error_keeps_its_code() {
        let err = GenkitError::Remote {
            code: "UNAVAILABLE".into(),
            message: "backend down".into(),
        };
        assert_eq!(err.code(), "UNAVAILABLE");
        assert!(err.is_retryable());
    }

    #[test]
    fn transport_errors_map_to_codes() {
        assert_eq!(GenkitError::Http("reset".into()).code(), "NETWORK_ERROR");
        assert_eq!(
            GenkitError::Api {
                status: 500,
                message: "boom".into()
            }
            .code(),
            "REMOTE_ERROR"
        );
        assert_eq!(
            GenkitError::MalformedResponse("no candidates".into()).code(),
            "MALFORMED_RESPONSE"
        );
        assert!(!GenkitError::AuthenticationFailed.is_retryable());
    }
}
