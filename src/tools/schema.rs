//! Payload validation against a JSON Schema subset.
//!
//! Supported keywords: `type` (string or list), `properties`, `required`,
//! `additionalProperties: false`, `enum`, `const`, `items`, `minItems`,
//! `maxItems`, `minLength`, `maxLength`, `minimum`, `maximum`. Unknown
//! keywords are ignored. Errors carry a JSON-pointer style path.

use serde_json::{Map, Value};

/// Schema that accepts any payload
pub fn permissive() -> Value {
    Value::Object(Map::new())
}

/// Object schema with the given properties and required keys
pub fn object(properties: Value, required: &[&str]) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Validate `value` against `schema`, collecting every violation
pub fn validate(schema: &Value, value: &Value) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    validate_at(schema, value, "", &mut errors);
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validate_at(schema: &Value, value: &Value, path: &str, errors: &mut Vec<String>) {
    let Some(schema) = schema.as_object() else {
        // `true` / `{}` accept everything, `false` rejects everything
        if schema == &Value::Bool(false) {
            errors.push(format!("{}: no value is allowed here", display_path(path)));
        }
        return;
    };

    if let Some(expected) = schema.get("type") {
        let allowed: Vec<&str> = match expected {
            Value::String(t) => vec![t.as_str()],
            Value::Array(ts) => ts.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        if !allowed.is_empty() && !allowed.iter().any(|t| matches_type(t, value)) {
            errors.push(format!(
                "{}: expected {}, got {}",
                display_path(path),
                allowed.join(" or "),
                type_name(value)
            ));
            // Further keywords assume the right type
            return;
        }
    }

    if let Some(options) = schema.get("enum").and_then(Value::as_array)
        && !options.contains(value)
    {
        errors.push(format!("{}: value {} is not one of the allowed values", display_path(path), value));
    }

    if let Some(constant) = schema.get("const")
        && constant != value
    {
        errors.push(format!("{}: expected constant {}", display_path(path), constant));
    }

    match value {
        Value::Object(obj) => validate_object(schema, obj, path, errors),
        Value::Array(items) => validate_array(schema, items, path, errors),
        Value::String(s) => {
            let len = s.chars().count() as u64;
            if let Some(min) = schema.get("minLength").and_then(Value::as_u64)
                && len < min
            {
                errors.push(format!("{}: shorter than {} characters", display_path(path), min));
            }
            if let Some(max) = schema.get("maxLength").and_then(Value::as_u64)
                && len > max
            {
                errors.push(format!("{}: longer than {} characters", display_path(path), max));
            }
        }
        Value::Number(n) => {
            let n = n.as_f64().unwrap_or(f64::NAN);
            if let Some(min) = schema.get("minimum").and_then(Value::as_f64)
                && n < min
            {
                errors.push(format!("{}: {} is less than minimum {}", display_path(path), n, min));
            }
            if let Some(max) = schema.get("maximum").and_then(Value::as_f64)
                && n > max
            {
                errors.push(format!("{}: {} is greater than maximum {}", display_path(path), n, max));
            }
        }
        _ => {}
    }
}

fn validate_object(schema: &Map<String, Value>, obj: &Map<String, Value>, path: &str, errors: &mut Vec<String>) {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(key) {
                errors.push(format!("{}: missing required property '{}'", display_path(path), key));
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    for (key, child) in obj {
        let child_path = format!("{}/{}", path, key);
        match properties.and_then(|p| p.get(key)) {
            Some(child_schema) => validate_at(child_schema, child, &child_path, errors),
            None => {
                if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
                    errors.push(format!("{}: unexpected property '{}'", display_path(path), key));
                }
            }
        }
    }
}

fn validate_array(schema: &Map<String, Value>, items: &[Value], path: &str, errors: &mut Vec<String>) {
    let len = items.len() as u64;
    if let Some(min) = schema.get("minItems").and_then(Value::as_u64)
        && len < min
    {
        errors.push(format!("{}: fewer than {} items", display_path(path), min));
    }
    if let Some(max) = schema.get("maxItems").and_then(Value::as_u64)
        && len > max
    {
        errors.push(format!("{}: more than {} items", display_path(path), max));
    }
    if let Some(item_schema) = schema.get("items") {
        for (i, item) in items.iter().enumerate() {
            validate_at(item_schema, item, &format!("{}/{}", path, i), errors);
        }
    }
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0),
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

fn display_path(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point_schema() -> Value {
        object(
            json!({
                "x": { "type": "integer", "minimum": 0 },
                "y": { "type": "integer" },
                "label": { "type": "string", "maxLength": 5 }
            }),
            &["x"],
        )
    }

    #[test]
    fn test_permissive_accepts_anything() {
        assert!(validate(&permissive(), &json!(null)).is_ok());
        assert!(validate(&permissive(), &json!({"a": [1, 2]})).is_ok());
        assert!(validate(&json!(true), &json!("x")).is_ok());
    }

    #[test]
    fn test_false_schema_rejects() {
        assert!(validate(&json!(false), &json!(1)).is_err());
    }

    #[test]
    fn test_valid_object() {
        assert!(validate(&point_schema(), &json!({"x": 1, "y": 2})).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let errors = validate(&point_schema(), &json!({"y": 2})).unwrap_err();
        assert_eq!(errors, vec!["/: missing required property 'x'"]);
    }

    #[test]
    fn test_wrong_type_reports_path() {
        let errors = validate(&point_schema(), &json!({"x": "one"})).unwrap_err();
        assert_eq!(errors, vec!["/x: expected integer, got string"]);
    }

    #[test]
    fn test_collects_multiple_errors() {
        let errors = validate(&point_schema(), &json!({"x": -1, "label": "too long"})).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e == "/x: -1 is less than minimum 0"));
        assert!(errors.iter().any(|e| e == "/label: longer than 5 characters"));
    }

    #[test]
    fn test_top_level_type_mismatch() {
        let errors = validate(&point_schema(), &json!([1])).unwrap_err();
        assert_eq!(errors, vec!["/: expected object, got array"]);
    }

    #[test]
    fn test_type_union() {
        let schema = json!({"type": ["string", "null"]});
        assert!(validate(&schema, &json!(null)).is_ok());
        assert!(validate(&schema, &json!("s")).is_ok());
        assert!(validate(&schema, &json!(3)).is_err());
    }

    #[test]
    fn test_enum_and_const() {
        let schema = json!({"enum": ["up", "down"]});
        assert!(validate(&schema, &json!("up")).is_ok());
        assert!(validate(&schema, &json!("left")).is_err());

        let schema = json!({"const": 7});
        assert!(validate(&schema, &json!(7)).is_ok());
        assert!(validate(&schema, &json!(8)).is_err());
    }

    #[test]
    fn test_additional_properties_false() {
        let schema = json!({
            "type": "object",
            "properties": { "a": {} },
            "additionalProperties": false
        });
        assert!(validate(&schema, &json!({"a": 1})).is_ok());
        let errors = validate(&schema, &json!({"a": 1, "b": 2})).unwrap_err();
        assert_eq!(errors, vec!["/: unexpected property 'b'"]);
    }

    #[test]
    fn test_array_items_and_bounds() {
        let schema = json!({
            "type": "array",
            "items": { "type": "number" },
            "minItems": 1,
            "maxItems": 3
        });
        assert!(validate(&schema, &json!([1, 2.5])).is_ok());
        assert!(validate(&schema, &json!([])).is_err());
        assert!(validate(&schema, &json!([1, 2, 3, 4])).is_err());

        let errors = validate(&schema, &json!([1, "two"])).unwrap_err();
        assert_eq!(errors, vec!["/1: expected number, got string"]);
    }

    #[test]
    fn test_nested_paths() {
        let schema = json!({
            "type": "object",
            "properties": {
                "edits": {
                    "type": "array",
                    "items": object(json!({ "line": { "type": "integer" } }), &["line"])
                }
            }
        });
        let errors = validate(&schema, &json!({"edits": [{"line": 1}, {}]})).unwrap_err();
        assert_eq!(errors, vec!["/edits/1: missing required property 'line'"]);
    }

    #[test]
    fn test_integer_accepts_whole_floats() {
        assert!(validate(&json!({"type": "integer"}), &json!(3.0)).is_ok());
        assert!(validate(&json!({"type": "integer"}), &json!(3.5)).is_err());
    }
}
