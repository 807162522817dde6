//! Prompt Builder - assemble ordered sections into one instruction block

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::render::contextual_replace;

/// One titled piece of the system prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSection {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Ascending sort key; ties keep insertion order
    pub order: i32,
}

impl PromptSection {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>, order: i32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            order,
        }
    }
}

/// How sections are joined and wrapped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildTemplate {
    /// Text placed before the first section
    pub prefix: Option<String>,
    /// Text placed after the last section
    pub suffix: Option<String>,
    pub separator: String,
    /// Prefix each section with "{n}. "
    pub numbered: bool,
}

impl Default for BuildTemplate {
    fn default() -> Self {
        Self {
            prefix: None,
            suffix: None,
            separator: "\n\n".to_string(),
            numbered: false,
        }
    }
}

/// Ordered list of prompt sections plus a placeholder context
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
    context: Map<String, Value>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with a placeholder context
    pub fn with_context(context: Map<String, Value>) -> Self {
        Self {
            sections: Vec::new(),
            context,
        }
    }

    pub fn add_section(&mut self, section: PromptSection) -> &mut Self {
        self.sections.push(section);
        self
    }

    pub fn add_sections(&mut self, sections: impl IntoIterator<Item = PromptSection>) -> &mut Self {
        self.sections.extend(sections);
        self
    }

    /// Remove every section with this id; returns whether any was removed
    pub fn remove_section(&mut self, id: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.id != id);
        self.sections.len() != before
    }

    /// Merge values into the placeholder context
    pub fn set_context(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn sections(&self) -> &[PromptSection] {
        &self.sections
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }

    /// Assemble the prompt.
    ///
    /// Sections are stably sorted by `order`, their `{{key}}` placeholders
    /// filled from the builder context, optionally numbered, joined with the
    /// separator and wrapped with prefix/suffix. The result is trimmed.
    pub fn build(&self, template: Option<&BuildTemplate>) -> String {
        let default_template = BuildTemplate::default();
        let template = template.unwrap_or(&default_template);

        let mut ordered: Vec<&PromptSection> = self.sections.iter().collect();
        ordered.sort_by_key(|s| s.order);

        let body = ordered
            .iter()
            .enumerate()
            .map(|(i, section)| {
                let content = contextual_replace(&section.content, &self.context);
                if template.numbered {
                    format!("{}. {}", i + 1, content)
                } else {
                    content
                }
            })
            .collect::<Vec<_>>()
            .join(&template.separator);

        let parts: Vec<&str> = [template.prefix.as_deref(), Some(body.as_str()), template.suffix.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.trim().is_empty())
            .collect();

        parts.join(&template.separator).trim().to_string()
    }
}
