//! Session-wide context shared by every tool during processing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Shallow key/value map visible to prompt generators and handlers.
///
/// The map is only changed through [`GlobalContext::merge`]; handlers receive
/// a snapshot and cannot write back into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalContext {
    values: Map<String, Value>,
}

impl GlobalContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String form of a value: strings verbatim, everything else as JSON
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).map(value_to_string)
    }

    /// Shallow merge: each update replaces the key's previous value
    pub fn merge<I, K>(&mut self, updates: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (key, value) in updates {
            self.values.insert(key.into(), value);
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Borrow the underlying JSON map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

impl From<Map<String, Value>> for GlobalContext {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for GlobalContext {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let mut ctx = Self::new();
        ctx.merge(iter);
        ctx
    }
}

/// Render a JSON value the way placeholders expect it
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_is_shallow() {
        let mut ctx: GlobalContext = [("user", json!({"name": "ada", "lang": "rust"}))].into_iter().collect();
        ctx.merge([("user", json!({"name": "grace"}))]);

        assert_eq!(ctx.get("user"), Some(&json!({"name": "grace"})));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_merge_adds_new_keys() {
        let mut ctx = GlobalContext::new();
        assert!(ctx.is_empty());

        ctx.merge([("file", json!("main.rs")), ("line", json!(42))]);
        assert!(ctx.contains_key("file"));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_get_string() {
        let ctx: GlobalContext = [("file", json!("main.rs")), ("line", json!(42)), ("flag", json!(true))]
            .into_iter()
            .collect();

        assert_eq!(ctx.get_string("file").as_deref(), Some("main.rs"));
        assert_eq!(ctx.get_string("line").as_deref(), Some("42"));
        assert_eq!(ctx.get_string("flag").as_deref(), Some("true"));
        assert_eq!(ctx.get_string("missing"), None);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let ctx: GlobalContext = [("a", json!(1))].into_iter().collect();
        assert_eq!(serde_json::to_string(&ctx).unwrap(), r#"{"a":1}"#);
    }
}
