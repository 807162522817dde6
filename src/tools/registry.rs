//! Ordered tool registry with enable/disable state
//!
//! Tools are kept in registration order. Ids and xml tags are unique; when
//! the parser matches tags ignoring case, tags must also be unique ignoring
//! case.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Result, ToolSystemError};
use crate::stream::is_valid_tag_name;

use super::definition::Tool;

/// Registry counters; `total_tools == enabled_tools + disabled_tools`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total_tools: usize,
    pub enabled_tools: usize,
    pub disabled_tools: usize,
}

/// Collection of tools keyed by id
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Tool>,
    /// Tags collide when they differ only in ASCII case
    fold_tags: bool,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose tags must be unique ignoring ASCII case
    pub fn with_folded_tags(mut self, fold: bool) -> Self {
        self.fold_tags = fold;
        self
    }

    /// Insert a tool; fails without changing the registry when its id or
    /// xml tag is already taken, or the tag is not a valid tag name
    pub fn register(&mut self, tool: Tool) -> Result<()> {
        if self.tools.contains_key(&tool.id) {
            return Err(ToolSystemError::DuplicateTool(tool.id));
        }
        if !is_valid_tag_name(&tool.xml_tag) {
            return Err(ToolSystemError::InvalidTag {
                tool_id: tool.id,
                tag: tool.xml_tag,
            });
        }
        let owner = if self.fold_tags {
            self.find_by_tag_ignore_case(&tool.xml_tag)
        } else {
            self.find_by_tag(&tool.xml_tag)
        };
        if let Some(owner) = owner {
            return Err(ToolSystemError::DuplicateTag {
                tag: tool.xml_tag.clone(),
                owner: owner.id.clone(),
            });
        }

        self.tools.insert(tool.id.clone(), tool);
        Ok(())
    }

    /// Remove a tool, keeping the order of the others
    pub fn unregister(&mut self, id: &str) -> Result<Tool> {
        self.tools
            .shift_remove(id)
            .ok_or_else(|| ToolSystemError::ToolNotFound(id.to_string()))
    }

    /// Set the enabled state; setting the current state again is a no-op
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        let tool = self
            .tools
            .get_mut(id)
            .ok_or_else(|| ToolSystemError::ToolNotFound(id.to_string()))?;
        tool.enabled = enabled;
        Ok(())
    }

    /// Get a tool by id
    pub fn get(&self, id: &str) -> Option<&Tool> {
        self.tools.get(id)
    }

    /// Find the tool that owns an xml tag
    pub fn find_by_tag(&self, tag: &str) -> Option<&Tool> {
        self.tools.values().find(|t| t.xml_tag == tag)
    }

    /// Find the tool owning a tag, ignoring ASCII case
    pub fn find_by_tag_ignore_case(&self, tag: &str) -> Option<&Tool> {
        self.tools.values().find(|t| t.xml_tag.eq_ignore_ascii_case(tag))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    /// All tools in registration order
    pub fn all(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values().filter(|t| t.enabled)
    }

    pub fn disabled(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values().filter(|t| !t.enabled)
    }

    /// Every registered tag, enabled or not
    pub fn tags(&self) -> Vec<String> {
        self.tools.values().map(|t| t.xml_tag.clone()).collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let enabled_tools = self.enabled().count();
        RegistryStats {
            total_tools: self.tools.len(),
            enabled_tools,
            disabled_tools: self.tools.len() - enabled_tools,
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::PayloadDecoder;

    fn tool(id: &str) -> Tool {
        Tool::new(id, format!("{} tool", id), PayloadDecoder::json())
    }

    fn ids<'a>(tools: impl Iterator<Item = &'a Tool>) -> Vec<&'a str> {
        tools.map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_registry_new_empty() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.stats(), RegistryStats::default());
    }

    #[test]
    fn test_register_keeps_order() {
        let mut registry = ToolRegistry::new();
        for id in ["c", "a", "b"] {
            registry.register(tool(id)).unwrap();
        }
        assert_eq!(ids(registry.all()), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_register_duplicate_id_leaves_registry_unchanged() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("a")).unwrap();

        let dup = tool("a").with_xml_tag("other").disabled();
        let err = registry.register(dup).unwrap_err();
        assert!(matches!(err, ToolSystemError::DuplicateTool(ref id) if id == "a"));

        assert_eq!(registry.len(), 1);
        let kept = registry.get("a").unwrap();
        assert_eq!(kept.xml_tag, "a");
        assert!(kept.enabled);
    }

    #[test]
    fn test_register_duplicate_tag() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("a")).unwrap();

        let err = registry.register(tool("b").with_xml_tag("a")).unwrap_err();
        assert!(err.is_registration_error());
        assert!(!registry.contains("b"));
    }

    #[test]
    fn test_tags_differing_in_case_are_distinct_by_default() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("upper").with_xml_tag("Note")).unwrap();
        registry.register(tool("lower").with_xml_tag("note")).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_folded_tags_collide_ignoring_case() {
        let mut registry = ToolRegistry::new().with_folded_tags(true);
        registry.register(tool("upper").with_xml_tag("Note")).unwrap();

        let err = registry.register(tool("lower").with_xml_tag("note")).unwrap_err();
        assert!(matches!(err, ToolSystemError::DuplicateTag { ref tag, ref owner }
            if tag == "note" && owner == "upper"));
        assert!(!registry.contains("lower"));
    }

    #[test]
    fn test_register_rejects_unmatchable_tags() {
        let mut registry = ToolRegistry::new();
        let too_long = "t".repeat(crate::stream::MAX_TAG_LEN + 1);
        for tag in ["cursor jump", "1step", "", too_long.as_str()] {
            let err = registry.register(tool("bad").with_xml_tag(tag)).unwrap_err();
            assert!(matches!(err, ToolSystemError::InvalidTag { .. }), "{}", tag);
            assert!(err.is_registration_error());
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister() {
        let mut registry = ToolRegistry::new();
        for id in ["a", "b", "c"] {
            registry.register(tool(id)).unwrap();
        }

        let removed = registry.unregister("b").unwrap();
        assert_eq!(removed.id, "b");
        assert_eq!(ids(registry.all()), vec!["a", "c"]);

        let err = registry.unregister("b").unwrap_err();
        assert!(err.is_lookup_error());
    }

    #[test]
    fn test_set_enabled_is_idempotent() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("a")).unwrap();

        registry.set_enabled("a", true).unwrap();
        assert!(registry.get("a").unwrap().enabled);

        registry.set_enabled("a", false).unwrap();
        registry.set_enabled("a", false).unwrap();
        assert!(!registry.get("a").unwrap().enabled);
    }

    #[test]
    fn test_set_enabled_unknown() {
        let mut registry = ToolRegistry::new();
        let err = registry.set_enabled("ghost", true).unwrap_err();
        assert!(matches!(err, ToolSystemError::ToolNotFound(ref id) if id == "ghost"));
    }

    #[test]
    fn test_enabled_and_disabled_views() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("a")).unwrap();
        registry.register(tool("b").disabled()).unwrap();
        registry.register(tool("c")).unwrap();

        assert_eq!(ids(registry.enabled()), vec!["a", "c"]);
        assert_eq!(ids(registry.disabled()), vec!["b"]);
        assert_eq!(
            registry.stats(),
            RegistryStats {
                total_tools: 3,
                enabled_tools: 2,
                disabled_tools: 1
            }
        );
    }

    #[test]
    fn test_stats_invariant_over_operation_sequence() {
        let mut registry = ToolRegistry::new();
        let ops: Vec<Box<dyn Fn(&mut ToolRegistry)>> = vec![
            Box::new(|r| drop(r.register(tool("a")))),
            Box::new(|r| drop(r.register(tool("b").disabled()))),
            Box::new(|r| drop(r.register(tool("a")))),
            Box::new(|r| drop(r.set_enabled("b", true))),
            Box::new(|r| drop(r.set_enabled("a", false))),
            Box::new(|r| drop(r.unregister("b"))),
            Box::new(|r| drop(r.unregister("zzz"))),
            Box::new(|r| drop(r.set_enabled("zzz", true))),
        ];

        for op in ops {
            op(&mut registry);
            let stats = registry.stats();
            assert_eq!(stats.total_tools, stats.enabled_tools + stats.disabled_tools);
            assert_eq!(stats.total_tools, registry.len());
        }
    }

    #[test]
    fn test_find_by_tag() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("jump").with_xml_tag("cursor_jump")).unwrap();

        assert_eq!(registry.find_by_tag("cursor_jump").unwrap().id, "jump");
        assert!(registry.find_by_tag("Cursor_Jump").is_none());
        assert_eq!(registry.find_by_tag_ignore_case("Cursor_Jump").unwrap().id, "jump");
        assert_eq!(registry.tags(), vec!["cursor_jump"]);
    }
}
