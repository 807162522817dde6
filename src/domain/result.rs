//! Tool result records produced for every successfully validated block.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of one validated block. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    tool_id: String,
    #[serde(rename = "type")]
    result_type: String,
    data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

impl ToolResult {
    /// Build a result stamped with the current time.
    ///
    /// `confidence` is lifted from a numeric top-level `confidence` field of
    /// the payload when it lies in `[0, 1]`.
    pub fn new(
        tool_id: impl Into<String>,
        result_type: impl Into<String>,
        data: Value,
        metadata: Option<Map<String, Value>>,
    ) -> Self {
        let confidence = data
            .get("confidence")
            .and_then(Value::as_f64)
            .filter(|c| (0.0..=1.0).contains(c));

        Self {
            tool_id: tool_id.into(),
            result_type: result_type.into(),
            data,
            confidence,
            timestamp: Utc::now(),
            metadata,
        }
    }

    pub fn tool_id(&self) -> &str {
        &self.tool_id
    }

    /// Result type; the xml tag the block was captured from
    pub fn result_type(&self) -> &str {
        &self.result_type
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }

    /// Compare everything except the timestamp
    pub fn same_payload(&self, other: &ToolResult) -> bool {
        self.tool_id == other.tool_id
            && self.result_type == other.result_type
            && self.data == other.data
            && self.confidence == other.confidence
            && self.metadata == other.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_result() {
        let result = ToolResult::new("a", "a", json!({"x": 1}), None);
        assert_eq!(result.tool_id(), "a");
        assert_eq!(result.result_type(), "a");
        assert_eq!(result.data(), &json!({"x": 1}));
        assert!(result.confidence().is_none());
        assert!(result.metadata().is_none());
    }

    #[test]
    fn test_confidence_lifted_from_payload() {
        let result = ToolResult::new("a", "a", json!({"confidence": 0.75}), None);
        assert_eq!(result.confidence(), Some(0.75));
    }

    #[test]
    fn test_confidence_out_of_range_ignored() {
        let result = ToolResult::new("a", "a", json!({"confidence": 1.5}), None);
        assert!(result.confidence().is_none());

        let result = ToolResult::new("a", "a", json!({"confidence": "high"}), None);
        assert!(result.confidence().is_none());
    }

    #[test]
    fn test_same_payload_ignores_timestamp() {
        let first = ToolResult::new("a", "a", json!([1, 2]), None);
        let second = ToolResult::new("a", "a", json!([1, 2]), None);
        assert!(first.same_payload(&second));

        let other = ToolResult::new("b", "b", json!([1, 2]), None);
        assert!(!first.same_payload(&other));
    }

    #[test]
    fn test_serialization_uses_type_key() {
        let result = ToolResult::new("a", "cursor_jump", json!({"line": 3}), None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "cursor_jump");
        assert_eq!(json["tool_id"], "a");
        assert!(json.get("confidence").is_none());
    }
}
