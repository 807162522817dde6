//! Tool capability records
//!
//! A tool bundles its data (id, tag, schema, ...) with the functions the
//! system dispatches to: a prompt-section generator, a payload decoder, an
//! optional extra validator and a response handler. Nothing is subclassed;
//! the system calls the stored functions directly.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::domain::GlobalContext;
use crate::prompt::{PromptSection, contextual_replace};

use super::schema;

/// Future returned by a tool handler
pub type HandlerFuture = BoxFuture<'static, eyre::Result<()>>;

/// Handler called with the validated payload and a context snapshot
pub type HandleResponseFn = Arc<dyn Fn(Value, GlobalContext) -> HandlerFuture + Send + Sync>;

/// Generates the tool's contribution to the system prompt
pub type PromptSectionFn = Arc<dyn Fn(&GlobalContext) -> PromptSection + Send + Sync>;

/// Extra validation run after the schema check
pub type ValidateResponseFn = Arc<dyn Fn(&Value) -> Result<(), Vec<String>> + Send + Sync>;

type DecodeFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// Turns a captured block body into a payload value.
///
/// The body of a tagged block is opaque text; each tool states how it is
/// decoded. There is no implicit default.
#[derive(Clone)]
pub struct PayloadDecoder {
    name: &'static str,
    decode: DecodeFn,
}

impl PayloadDecoder {
    /// Parse the (trimmed) body as JSON
    pub fn json() -> Self {
        Self {
            name: "json",
            decode: Arc::new(|raw| serde_json::from_str(raw.trim()).map_err(|e| e.to_string())),
        }
    }

    /// Pass the body through verbatim as a JSON string
    pub fn text() -> Self {
        Self {
            name: "text",
            decode: Arc::new(|raw| Ok(Value::String(raw.to_string()))),
        }
    }

    /// Custom decoding function
    pub fn custom<F>(name: &'static str, decode: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name,
            decode: Arc::new(decode),
        }
    }

    /// Parse from a manifest name ("json" / "text")
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "json" => Some(Self::json()),
            "text" | "plain" => Some(Self::text()),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn decode(&self, raw: &str) -> Result<Value, String> {
        (self.decode)(raw)
    }
}

impl fmt::Debug for PayloadDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PayloadDecoder").field(&self.name).finish()
    }
}

/// A registered capability: prompt contribution plus response handler
#[derive(Clone)]
pub struct Tool {
    /// Unique id
    pub id: String,
    /// Display name used as the prompt section title
    pub name: String,
    /// Human-readable description for the LLM
    pub description: String,
    /// JSON schema for the decoded payload
    pub schema: Value,
    /// Tag the tool's blocks are wrapped in (unique)
    pub xml_tag: String,
    /// Initial enabled state
    pub enabled: bool,
    pub metadata: Option<Map<String, Value>>,
    pub version: String,
    pub category: String,
    /// Prompt section ordering key
    pub prompt_order: i32,
    decoder: PayloadDecoder,
    prompt_section: Option<PromptSectionFn>,
    validator: Option<ValidateResponseFn>,
    handler: Option<HandleResponseFn>,
}

impl Tool {
    /// Create a tool whose tag and name default to its id
    pub fn new(id: impl Into<String>, description: impl Into<String>, decoder: PayloadDecoder) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            xml_tag: id.clone(),
            id,
            description: description.into(),
            schema: schema::permissive(),
            enabled: true,
            metadata: None,
            version: "1.0.0".to_string(),
            category: "general".to_string(),
            prompt_order: 0,
            decoder,
            prompt_section: None,
            validator: None,
            handler: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_xml_tag(mut self, tag: impl Into<String>) -> Self {
        self.xml_tag = tag.into();
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_prompt_order(mut self, order: i32) -> Self {
        self.prompt_order = order;
        self
    }

    /// Register the tool in the disabled state
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Replace the generated prompt section
    pub fn with_prompt_section<F>(mut self, generate: F) -> Self
    where
        F: Fn(&GlobalContext) -> PromptSection + Send + Sync + 'static,
    {
        self.prompt_section = Some(Arc::new(generate));
        self
    }

    /// Prompt section rendered from a `{{key}}` template over the context
    pub fn with_prompt_template(self, template: impl Into<String>) -> Self {
        let template = template.into();
        let (id, title, order) = (self.id.clone(), self.name.clone(), self.prompt_order);
        self.with_prompt_section(move |ctx| {
            PromptSection::new(id.clone(), title.clone(), contextual_replace(&template, ctx.as_map()), order)
        })
    }

    /// Extra validation applied after the schema check
    pub fn with_validator<F>(mut self, validate: F) -> Self
    where
        F: Fn(&Value) -> Result<(), Vec<String>> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validate));
        self
    }

    /// Async handler invoked for every validated payload
    pub fn with_handler<F, Fut>(mut self, handle: F) -> Self
    where
        F: Fn(Value, GlobalContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |data, ctx| handle(data, ctx).boxed()));
        self
    }

    pub fn decoder(&self) -> &PayloadDecoder {
        &self.decoder
    }

    /// Prompt section for this tool under the given context
    pub fn generate_prompt_section(&self, ctx: &GlobalContext) -> PromptSection {
        match &self.prompt_section {
            Some(generate) => generate(ctx),
            None => self.default_prompt_section(),
        }
    }

    fn default_prompt_section(&self) -> PromptSection {
        let mut content = format!("## {}\n{}\n\nTo use it, emit:\n<{}>\n", self.name, self.description, self.xml_tag);
        content.push_str(match self.decoder.name() {
            "json" => "{ JSON payload }",
            _ => "payload",
        });
        content.push_str(&format!("\n</{}>", self.xml_tag));

        if self.schema.as_object().is_some_and(|s| !s.is_empty()) {
            content.push_str(&format!("\n\nPayload schema: {}", self.schema));
        }

        PromptSection::new(self.id.clone(), self.name.clone(), content, self.prompt_order)
    }

    /// Decode a raw block body
    pub fn decode(&self, raw: &str) -> Result<Value, String> {
        self.decoder.decode(raw)
    }

    /// Schema check followed by the custom validator, if any
    pub fn validate_response(&self, data: &Value) -> Result<(), Vec<String>> {
        schema::validate(&self.schema, data)?;
        match &self.validator {
            Some(validate) => validate(data),
            None => Ok(()),
        }
    }

    /// Run the handler; tools without one accept every payload
    pub async fn handle_response(&self, data: Value, ctx: GlobalContext) -> eyre::Result<()> {
        match &self.handler {
            Some(handle) => handle(data, ctx).await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("id", &self.id)
            .field("xml_tag", &self.xml_tag)
            .field("enabled", &self.enabled)
            .field("version", &self.version)
            .field("category", &self.category)
            .field("decoder", &self.decoder)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}
