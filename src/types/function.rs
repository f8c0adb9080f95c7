//! Types for model-requested function calls

use serde::{Deserialize, Serialize};

use crate::{GenkitError, Result};

/// Handler-free description of a registered function.
///
/// This is what gets advertised to the model alongside the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: serde_json::Value,
}

impl FunctionDeclaration {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: serde_json::Value,
}

fn empty_arguments() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Deserialize the arguments into a typed struct.
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.arguments.clone()).map_err(GenkitError::from)
    }
}

/// Result of executing one [`FunctionCall`].
#[derive(Debug)]
pub struct FunctionResult {
    pub name: String,
    pub outcome: Result<serde_json::Value>,
}

impl FunctionResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// JSON form sent back to the model as a function response.
    pub fn to_response_json(&self) -> serde_json::Value {
        match &self.outcome {
            Ok(value) => serde_json::json!({ "name": self.name, "response": value }),
            Err(err) => serde_json::json!({
                "name": self.name,
                "error": { "code": err.code(), "message": err.to_string() },
            }),
        }
    }
}
