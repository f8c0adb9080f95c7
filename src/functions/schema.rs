//! Minimal JSON Schema validation for function arguments.
//!
//! Supports the subset function declarations actually use: `type` (a name
//! or a list of names), `properties`, `required`, `additionalProperties:
//! false`, `items` and `enum`. Other keywords are ignored. Errors carry the
//! JSON path of the offending value (`$`, `$.city`, `$.tags[2]`).

use serde_json::{Map, Value};

use crate::{GenkitError, Result};

/// Validate `value` against `schema`.
pub fn validate(value: &Value, schema: &Value) -> Result<()> {
    validate_at(value, schema, "$")
}

fn validate_at(value: &Value, schema: &Value, path: &str) -> Result<()> {
    let Some(schema) = schema.as_object() else {
        // `true`, `{}` or anything non-object accepts every value.
        return Ok(());
    };

    if let Some(expected) = schema.get("type") {
        check_type(value, expected, path)?;
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array)
        && !allowed.contains(value)
    {
        return Err(GenkitError::validation(
            path,
            format!("{value} is not one of {}", Value::Array(allowed.clone())),
        ));
    }

    if let Some(object) = value.as_object() {
        validate_object(object, schema, path)?;
    }

    if let (Some(items), Some(item_schema)) = (value.as_array(), schema.get("items")) {
        for (i, item) in items.iter().enumerate() {
            validate_at(item, item_schema, &format!("{path}[{i}]"))?;
        }
    }

    Ok(())
}

fn validate_object(object: &Map<String, Value>, schema: &Map<String, Value>, path: &str) -> Result<()> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(name) {
                return Err(GenkitError::validation(
                    path,
                    format!("missing required property '{name}'"),
                ));
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for (name, field) in object {
        let field_path = format!("{path}.{name}");
        match properties.and_then(|p| p.get(name)) {
            Some(field_schema) => validate_at(field, field_schema, &field_path)?,
            None if closed => {
                return Err(GenkitError::validation(
                    field_path,
                    "additional property not allowed",
                ));
            }
            None => {}
        }
    }
    Ok(())
}

fn check_type(value: &Value, expected: &Value, path: &str) -> Result<()> {
    let names: Vec<&str> = match expected {
        Value::String(name) => vec![name.as_str()],
        Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
        _ => return Ok(()),
    };
    if names.iter().any(|name| matches_type(value, name)) {
        return Ok(());
    }
    Err(GenkitError::validation(
        path,
        format!("expected {}, got {}", names.join(" or "), type_name(value)),
    ))
}

fn matches_type(value: &Value, name: &str) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        // Unknown type names constrain nothing.
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": { "type": "string" },
                "days": { "type": "integer" },
                "unit": { "type": "string", "enum": ["celsius", "fahrenheit"] },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["city"],
            "additionalProperties": false
        })
    }

    fn path_of(err: GenkitError) -> String {
        match err {
            GenkitError::Validation { path, .. } => path,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_valid_arguments() {
        let args = json!({"city": "Oslo", "days": 3, "unit": "celsius", "tags": ["a"]});
        validate(&args, &weather_schema()).unwrap();
    }

    #[test]
    fn missing_required_property() {
        let err = validate(&json!({"days": 3}), &weather_schema()).unwrap_err();
        assert_eq!(path_of(err), "$");
    }

    #[test]
    fn wrong_property_type_names_path() {
        let err = validate(&json!({"city": 42}), &weather_schema()).unwrap_err();
        assert_eq!(path_of(err), "$.city");
    }

    #[test]
    fn integer_rejects_fractions() {
        let err = validate(&json!({"city": "Oslo", "days": 1.5}), &weather_schema()).unwrap_err();
        assert_eq!(path_of(err), "$.days");
        validate(&json!({"city": "Oslo", "days": 2.0}), &weather_schema()).unwrap();
    }

    #[test]
    fn enum_membership() {
        let err = validate(&json!({"city": "Oslo", "unit": "kelvin"}), &weather_schema())
            .unwrap_err();
        assert_eq!(path_of(err), "$.unit");
    }

    #[test]
    fn array_items_are_checked() {
        let err = validate(&json!({"city": "Oslo", "tags": ["a", 1]}), &weather_schema())
            .unwrap_err();
        assert_eq!(path_of(err), "$.tags[1]");
    }

    #[test]
    fn additional_properties_rejected_when_closed() {
        let err = validate(&json!({"city": "Oslo", "extra": true}), &weather_schema())
            .unwrap_err();
        assert_eq!(path_of(err), "$.extra");
    }

    #[test]
    fn open_schema_accepts_extras() {
        let schema = json!({"type": "object", "properties": {}});
        validate(&json!({"anything": [1, 2]}), &schema).unwrap();
    }

    #[test]
    fn non_object_arguments_fail_object_schema() {
        let err = validate(&json!("Oslo"), &weather_schema()).unwrap_err();
        assert_eq!(path_of(err), "$");
    }

    #[test]
    fn type_lists_allow_any_member() {
        let schema = json!({"type": ["string", "null"]});
        validate(&json!(null), &schema).unwrap();
        validate(&json!("x"), &schema).unwrap();
        assert!(validate(&json!(1), &schema).is_err());
    }
}
