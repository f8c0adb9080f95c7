//! Types for text generation.

use serde::{Deserialize, Serialize};

use super::function::FunctionCall;
use crate::{GenkitError, Result};

/// Output of a successful remote generation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Concatenated text parts of the first candidate.
    pub text: String,

    /// Function calls the model requested, in the order it emitted them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_calls: Vec<FunctionCall>,
}

impl GenerateResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            function_calls: Vec::new(),
        }
    }

    /// Attach a requested function call.
    pub fn with_function_call(mut self, call: FunctionCall) -> Self {
        self.function_calls.push(call);
        self
    }
}

/// Outcome of [`GenkitClient::generate`](crate::GenkitClient::generate).
///
/// Remote failures are values, not errors: they carry a stable code and a
/// message. Only `Success` is ever cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    Success {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        function_calls: Vec<FunctionCall>,
    },
    Failure {
        code: String,
        message: String,
    },
}

impl GenerationResult {
    /// Successful result with text only.
    pub fn success(text: impl Into<String>) -> Self {
        Self::Success {
            text: text.into(),
            function_calls: Vec::new(),
        }
    }

    /// Failure result derived from an error's code and message.
    pub fn failure(err: &GenkitError) -> Self {
        let message = match err {
            GenkitError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self::Failure {
            code: err.code().to_string(),
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Generated text, if successful.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Success { text, .. } => Some(text.as_str()),
            Self::Failure { .. } => None,
        }
    }

    /// Function calls requested by the model; empty on failure.
    pub fn function_calls(&self) -> &[FunctionCall] {
        match self {
            Self::Success { function_calls, .. } => function_calls.as_slice(),
            Self::Failure { .. } => &[],
        }
    }

    /// Convert into a `Result`, mapping failures to [`GenkitError::Remote`].
    pub fn into_result(self) -> Result<GenerateResponse> {
        match self {
            Self::Success {
                text,
                function_calls,
            } => Ok(GenerateResponse {
                text,
                function_calls,
            }),
            Self::Failure { code, message } => Err(GenkitError::Remote { code, message }),
        }
    }
}

impl From<GenerateResponse> for GenerationResult {
    fn from(response: GenerateResponse) -> Self {
        Self::Success {
            text: response.text,
            function_calls: response.function_calls,
        }
    }
}

impl From<Result<GenerateResponse>> for GenerationResult {
    fn from(result: Result<GenerateResponse>) -> Self {
        match result {
            Ok(response) => response.into(),
            Err(err) => Self::failure(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_from_http_error() {
        let result = GenerationResult::from(Err::<GenerateResponse, _>(GenkitError::Http(
            "connection reset".into(),
        )));
        match result {
            GenerationResult::Failure { code, message } => {
                assert_eq!(code, "NETWORK_ERROR");
                assert!(message.contains("connection reset"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn into_result_round_trips_failure_code() {
        let err = GenerationResult::Failure {
            code: "RATE_LIMITED".into(),
            message: "slow down".into(),
        }
        .into_result()
        .unwrap_err();
        assert_eq!(err.code(), "RATE_LIMITED");
    }

    #[test]
    fn serializes_with_status_tag() {
        let json = serde_json::to_value(GenerationResult::success("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success", "text": "hi"}));
    }
}
