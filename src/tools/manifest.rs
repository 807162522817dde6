//! Tool manifest loading from YAML
//!
//! A manifest declares tools as data (id, tag, decoder, schema, prompt
//! template) plus an initial global context. Handlers cannot be declared in
//! YAML; attach them to the returned tools with `Tool::with_handler`.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::GlobalContext;
use crate::error::{Result, ToolSystemError};

use super::definition::{PayloadDecoder, Tool};

fn default_enabled() -> bool {
    true
}

/// YAML representation of a tool
#[derive(Debug, Clone, Deserialize)]
struct ManifestTool {
    id: String,
    name: Option<String>,
    description: String,
    xml_tag: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    version: Option<String>,
    category: Option<String>,
    #[serde(default)]
    order: i32,
    decoder: String,
    schema: Option<Value>,
    prompt: Option<String>,
    metadata: Option<Map<String, Value>>,
}

/// Declarative tool set loaded from YAML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolManifest {
    #[serde(default)]
    tools: Vec<ManifestTool>,
    #[serde(default)]
    context: Map<String, Value>,
}

impl ToolManifest {
    /// Load a manifest from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Load a manifest from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let manifest: ToolManifest = serde_yaml::from_str(content)?;
        Ok(manifest)
    }

    /// Number of declared tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Initial global context declared by the manifest
    pub fn context(&self) -> GlobalContext {
        GlobalContext::from(self.context.clone())
    }

    /// Build the declared tools in manifest order
    pub fn into_tools(self) -> Result<Vec<Tool>> {
        self.tools.into_iter().map(Self::convert_tool).collect()
    }

    fn convert_tool(decl: ManifestTool) -> Result<Tool> {
        let decoder = PayloadDecoder::from_name(&decl.decoder).ok_or_else(|| {
            ToolSystemError::Manifest(format!("Invalid decoder '{}' for tool '{}'", decl.decoder, decl.id))
        })?;

        if let Some(schema) = &decl.schema
            && !(schema.is_object() || schema.is_boolean())
        {
            return Err(ToolSystemError::Manifest(format!(
                "Schema for tool '{}' must be a mapping",
                decl.id
            )));
        }

        let mut tool = Tool::new(decl.id, decl.description, decoder).with_prompt_order(decl.order);

        if let Some(name) = decl.name {
            tool = tool.with_name(name);
        }
        if let Some(tag) = decl.xml_tag {
            tool = tool.with_xml_tag(tag);
        }
        if let Some(version) = decl.version {
            tool = tool.with_version(version);
        }
        if let Some(category) = decl.category {
            tool = tool.with_category(category);
        }
        if let Some(schema) = decl.schema {
            tool = tool.with_schema(schema);
        }
        if let Some(metadata) = decl.metadata {
            tool = tool.with_metadata(metadata);
        }
        if let Some(template) = decl.prompt {
            tool = tool.with_prompt_template(template);
        }
        if !decl.enabled {
            tool = tool.disabled();
        }

        Ok(tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_YAML: &str = r#"
context:
  project: toolstream
tools:
  - id: sentiment
    name: Sentiment
    description: Classify the sentiment of the text
    decoder: json
    order: 2
    category: analysis
    schema:
      type: object
      required: [label]
      properties:
        label:
          type: string
          enum: [positive, negative, neutral]
        confidence:
          type: number
    metadata:
      owner: nlp
  - id: note
    description: Free-form note
    xml_tag: scratch
    decoder: text
    enabled: false
    prompt: "Notes for {{project}} go in <scratch>."
"#;

    #[test]
    fn test_manifest_from_yaml() {
        let manifest = ToolManifest::from_yaml(SAMPLE_YAML).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.context().get_string("project").as_deref(), Some("toolstream"));
    }

    #[test]
    fn test_manifest_into_tools() {
        let tools = ToolManifest::from_yaml(SAMPLE_YAML).unwrap().into_tools().unwrap();
        assert_eq!(tools.len(), 2);

        let sentiment = &tools[0];
        assert_eq!(sentiment.id, "sentiment");
        assert_eq!(sentiment.name, "Sentiment");
        assert_eq!(sentiment.xml_tag, "sentiment");
        assert_eq!(sentiment.category, "analysis");
        assert_eq!(sentiment.prompt_order, 2);
        assert!(sentiment.enabled);
        assert_eq!(sentiment.decoder().name(), "json");
        assert_eq!(sentiment.schema["required"][0], "label");
        assert_eq!(sentiment.metadata.as_ref().unwrap()["owner"], "nlp");

        let note = &tools[1];
        assert_eq!(note.name, "note");
        assert_eq!(note.xml_tag, "scratch");
        assert!(!note.enabled);
        assert_eq!(note.decoder().name(), "text");
        assert_eq!(note.version, "1.0.0");
    }

    #[test]
    fn test_manifest_prompt_template_uses_context() {
        let manifest = ToolManifest::from_yaml(SAMPLE_YAML).unwrap();
        let ctx = manifest.context();
        let tools = manifest.into_tools().unwrap();

        let section = tools[1].generate_prompt_section(&ctx);
        assert_eq!(section.content, "Notes for toolstream go in <scratch>.");
    }

    #[test]
    fn test_manifest_schema_is_enforced() {
        let tools = ToolManifest::from_yaml(SAMPLE_YAML).unwrap().into_tools().unwrap();
        let sentiment = &tools[0];

        let ok = sentiment.decode(r#"{"label": "positive"}"#).unwrap();
        assert!(sentiment.validate_response(&ok).is_ok());

        let bad = sentiment.decode(r#"{"label": "angry"}"#).unwrap();
        assert!(sentiment.validate_response(&bad).is_err());
    }

    #[test]
    fn test_manifest_invalid_decoder() {
        let yaml = r#"
tools:
  - id: bad
    description: Bad decoder
    decoder: xml
"#;
        let err = ToolManifest::from_yaml(yaml).unwrap().into_tools().unwrap_err();
        assert!(matches!(err, ToolSystemError::Manifest(_)));
        assert!(err.to_string().contains("Invalid decoder 'xml'"));
    }

    #[test]
    fn test_manifest_missing_decoder_is_rejected() {
        let yaml = r#"
tools:
  - id: bad
    description: No decoder
"#;
        assert!(matches!(ToolManifest::from_yaml(yaml), Err(ToolSystemError::Yaml(_))));
    }

    #[test]
    fn test_manifest_invalid_schema() {
        let yaml = r#"
tools:
  - id: bad
    description: Scalar schema
    decoder: json
    schema: 42
"#;
        let err = ToolManifest::from_yaml(yaml).unwrap().into_tools().unwrap_err();
        assert!(matches!(err, ToolSystemError::Manifest(_)));
    }

    #[test]
    fn test_manifest_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_YAML.as_bytes()).unwrap();

        let manifest = ToolManifest::from_file(file.path()).unwrap();
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn test_manifest_missing_file() {
        let result = ToolManifest::from_file("/nonexistent/toolstream/tools.yml");
        assert!(matches!(result, Err(ToolSystemError::Io(_))));
    }

    #[test]
    fn test_manifest_empty() {
        let manifest = ToolManifest::from_yaml("{}").unwrap();
        assert!(manifest.is_empty());
        assert!(manifest.into_tools().unwrap().is_empty());
    }
}
