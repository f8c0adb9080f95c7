//! Structured-output prompts.
//!
//! [`structured_prompt`] wraps a user prompt with instructions to answer in
//! JSON matching a schema; [`validate_structured_output`] checks what came
//! back.

use serde_json::Value;

use crate::functions::schema;
use crate::types::FunctionDeclaration;
use crate::{GenkitError, Result};

/// Render a prompt asking for a JSON response that satisfies `schema`.
///
/// Available functions, if any, are listed after the schema.
pub fn structured_prompt(prompt: &str, schema: &Value, functions: &[FunctionDeclaration]) -> String {
    let schema_text = pretty(schema);
    let mut out = String::from(
        "You are a helpful AI assistant. You will receive a prompt and must respond in a \
         structured JSON format. The schema for the response is:\n\n",
    );
    out.push_str("```json\n");
    out.push_str(&schema_text);
    out.push_str("\n```\n\n");

    if !functions.is_empty() {
        out.push_str(
            "The following functions are available to you. Use them to answer the prompt \
             accurately.\n\n```json\n",
        );
        for function in functions {
            out.push_str(&serde_json::to_string_pretty(function).unwrap_or_default());
            out.push('\n');
        }
        out.push_str("```\n\n");
    }

    out.push_str("Prompt: ");
    out.push_str(prompt);
    out.push('\n');
    out
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Parse model output as JSON and check it against `schema`.
///
/// A surrounding Markdown code fence (```` ```json ```` or plain
/// ```` ``` ````) is stripped first.
///
/// # Errors
///
/// [`GenkitError::Validation`] if the output is not JSON or fails the
/// schema.
pub fn validate_structured_output(raw: &str, schema: &Value) -> Result<Value> {
    let body = strip_fence(raw.trim());
    let value: Value = serde_json::from_str(body)
        .map_err(|e| GenkitError::validation("$", format!("output is not valid JSON: {e}")))?;
    schema::validate(&value, schema)?;
    Ok(value)
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) up to the first newline.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answer_schema() -> Value {
        json!({
            "type": "object",
            "properties": {"answer": {"type": "string"}, "confidence": {"type": "number"}},
            "required": ["answer"]
        })
    }

    #[test]
    fn prompt_embeds_schema_and_text() {
        let text = structured_prompt("What is 2+2?", &answer_schema(), &[]);
        assert!(text.contains("\"answer\""));
        assert!(text.ends_with("Prompt: What is 2+2?\n"));
        assert!(!text.contains("functions are available"));
    }

    #[test]
    fn prompt_lists_functions() {
        let functions = [FunctionDeclaration::new(
            "get_current_time",
            "Get the current time in ISO format",
            json!({"type": "object"}),
        )];
        let text = structured_prompt("What time is it?", &answer_schema(), &functions);
        assert!(text.contains("functions are available"));
        assert!(text.contains("get_current_time"));
    }

    #[test]
    fn validates_plain_json() {
        let value = validate_structured_output(r#"{"answer": "4"}"#, &answer_schema()).unwrap();
        assert_eq!(value["answer"], "4");
    }

    #[test]
    fn strips_code_fence() {
        let raw = "```json\n{\"answer\": \"4\", \"confidence\": 0.9}\n```";
        let value = validate_structured_output(raw, &answer_schema()).unwrap();
        assert_eq!(value["confidence"], 0.9);
    }

    #[test]
    fn strips_bare_fence() {
        let raw = "```\n{\"answer\": \"x\"}\n```\n";
        assert!(validate_structured_output(raw, &answer_schema()).is_ok());
    }

    #[test]
    fn schema_mismatch_is_validation_error() {
        let err = validate_structured_output(r#"{"confidence": 1}"#, &answer_schema()).unwrap_err();
        assert!(matches!(err, GenkitError::Validation { .. }));
    }

    #[test]
    fn non_json_is_validation_error() {
        let err = validate_structured_output("The answer is 4.", &answer_schema()).unwrap_err();
        assert!(matches!(err, GenkitError::Validation { ref path, .. } if path == "$"));
    }
}
