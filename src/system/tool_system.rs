//! Tool system - registry, prompt generation and stream dispatch
//!
//! A `ToolSystem` owns its registry, global context, results and event
//! channel. Processing is sequential: each chunk is fully parsed and every
//! completed block is decoded, validated and handled (the handler is
//! awaited) before the next chunk is requested, so results and events are
//! produced in arrival order.

use futures::{Stream, StreamExt, stream};
use log::{debug, info, trace, warn};

use crate::domain::{
    EventBus, EventKind, GlobalContext, StreamSummary, SubscriptionId, ToolEvent, ToolResult,
};
use crate::error::{Result, StreamError};
use crate::prompt::{BuildTemplate, PromptBuilder};
use crate::stream::{CapturedBlock, ParseEvent, ParserOptions, StreamingXmlParser};
use crate::tools::{RegistryStats, Tool, ToolRegistry};

use super::callbacks::{StreamCallbacks, StreamIssue, TerminationHandle};

/// Construction parameters for a `ToolSystem`
#[derive(Debug, Clone, Default)]
pub struct ToolSystemConfig {
    pub tools: Vec<Tool>,
    pub global_context: Option<GlobalContext>,
    pub parser: ParserOptions,
    pub prompt: BuildTemplate,
}

impl ToolSystemConfig {
    pub fn new(tools: Vec<Tool>) -> Self {
        Self {
            tools,
            ..Default::default()
        }
    }

    pub fn with_global_context(mut self, ctx: GlobalContext) -> Self {
        self.global_context = Some(ctx);
        self
    }

    pub fn with_parser_options(mut self, options: ParserOptions) -> Self {
        self.parser = options;
        self
    }

    pub fn with_prompt_template(mut self, template: BuildTemplate) -> Self {
        self.prompt = template;
        self
    }
}

/// What happened to one captured block
enum Dispatch {
    Handled(ToolResult),
    Failed(StreamError),
    Dropped,
}

/// Coordinates tools, prompt generation and stream processing
#[derive(Debug)]
pub struct ToolSystem {
    registry: ToolRegistry,
    context: GlobalContext,
    results: Vec<ToolResult>,
    events: EventBus,
    parser_options: ParserOptions,
    prompt_template: BuildTemplate,
    termination: TerminationHandle,
}

impl ToolSystem {
    /// Build a system from its config; duplicate ids or tags fail, and with
    /// `lowercase` matching tags that differ only in case are duplicates
    pub fn new(config: ToolSystemConfig) -> Result<Self> {
        let mut registry = ToolRegistry::new().with_folded_tags(config.parser.lowercase);
        for tool in config.tools {
            registry.register(tool)?;
        }
        info!("Tool system created with {} tools", registry.len());

        Ok(Self {
            registry,
            context: config.global_context.unwrap_or_default(),
            results: Vec::new(),
            events: EventBus::new(),
            parser_options: config.parser,
            prompt_template: config.prompt,
            termination: TerminationHandle::new(),
        })
    }

    // ----- control surface -----

    pub fn register_tool(&mut self, tool: Tool) -> Result<()> {
        let id = tool.id.clone();
        self.registry.register(tool)?;
        info!("Registered tool '{}'", id);
        self.events.emit(&ToolEvent::ToolRegistered { id });
        Ok(())
    }

    pub fn unregister_tool(&mut self, id: &str) -> Result<Tool> {
        let tool = self.registry.unregister(id)?;
        info!("Unregistered tool '{}'", id);
        self.events.emit(&ToolEvent::ToolUnregistered { id: id.to_string() });
        Ok(tool)
    }

    /// Enable a tool; enabling an enabled tool is valid and still emits
    pub fn enable_tool(&mut self, id: &str) -> Result<()> {
        self.registry.set_enabled(id, true)?;
        debug!("Enabled tool '{}'", id);
        self.events.emit(&ToolEvent::ToolEnabled { id: id.to_string() });
        Ok(())
    }

    /// Disable a tool; disabling a disabled tool is valid and still emits
    pub fn disable_tool(&mut self, id: &str) -> Result<()> {
        self.registry.set_enabled(id, false)?;
        debug!("Disabled tool '{}'", id);
        self.events.emit(&ToolEvent::ToolDisabled { id: id.to_string() });
        Ok(())
    }

    /// Shallow-merge values into the global context
    pub fn update_global_context<I, K>(&mut self, updates: I)
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        self.context.merge(updates);
    }

    /// Ask the running (or next) `process_stream` call to stop
    pub fn terminate_stream(&self, reason: impl Into<String>) {
        self.termination.terminate(reason);
    }

    /// Handle that can stop a run while this system is mutably borrowed
    pub fn termination_handle(&self) -> TerminationHandle {
        self.termination.clone()
    }

    pub fn clear_results(&mut self) {
        self.results.clear();
    }

    /// Clear results and any pending termination request
    pub fn reset(&mut self) {
        self.results.clear();
        self.termination.clear();
    }

    // ----- query surface -----

    pub fn get_tool(&self, id: &str) -> Option<&Tool> {
        self.registry.get(id)
    }

    pub fn get_all_tools(&self) -> Vec<&Tool> {
        self.registry.all().collect()
    }

    pub fn get_enabled_tools(&self) -> Vec<&Tool> {
        self.registry.enabled().collect()
    }

    pub fn get_disabled_tools(&self) -> Vec<&Tool> {
        self.registry.disabled().collect()
    }

    pub fn get_stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Results of the current or most recent run, in arrival order
    pub fn get_results(&self) -> &[ToolResult] {
        &self.results
    }

    /// Latest result produced by a tool
    pub fn get_result(&self, tool_id: &str) -> Option<&ToolResult> {
        self.results.iter().rev().find(|r| r.tool_id() == tool_id)
    }

    pub fn global_context(&self) -> &GlobalContext {
        &self.context
    }

    // ----- events -----

    /// Subscribe to one kind of event
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&ToolEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(kind, listener)
    }

    /// Subscribe to every event
    pub fn on_any<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&ToolEvent) + Send + Sync + 'static,
    {
        self.events.subscribe_all(listener)
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ----- prompt surface -----

    /// System prompt built from every enabled tool's section
    pub fn generate_system_prompt(&self) -> String {
        let template = self.prompt_template.clone();
        self.build_prompt_with(&template)
    }

    /// Same as `generate_system_prompt` with an explicit template
    pub fn build_prompt_with(&self, template: &BuildTemplate) -> String {
        // sections render their own placeholders; the builder adds no second pass
        let mut builder = PromptBuilder::new();
        builder.add_sections(self.registry.enabled().map(|t| t.generate_prompt_section(&self.context)));

        let prompt = builder.build(Some(template));
        debug!("Generated system prompt from {} sections", builder.sections().len());
        self.events.emit(&ToolEvent::PromptGenerated { prompt: prompt.clone() });
        prompt
    }

    // ----- streaming surface -----

    /// Consume a chunk stream to the end (or until terminated).
    ///
    /// Results from a previous run are cleared first. Decode, validation and
    /// handler failures and parse warnings are reported through events and
    /// `on_error`; they never stop the stream.
    pub async fn process_stream<S>(&mut self, chunks: S, mut callbacks: StreamCallbacks<'_>) -> StreamSummary
    where
        S: Stream<Item = String>,
    {
        let mut chunks = std::pin::pin!(chunks);
        let mut parser = StreamingXmlParser::new(self.registry.tags(), self.parser_options);
        let mut summary = StreamSummary::default();

        self.results.clear();
        info!("Parsing started ({} tools registered)", self.registry.len());
        self.events.emit(&ToolEvent::ParsingStarted);

        loop {
            if let Some(reason) = self.termination.take() {
                return self.terminate(&mut parser, summary, reason);
            }
            let Some(chunk) = chunks.next().await else {
                break;
            };
            summary.chunks += 1;
            trace!("Chunk {} ({} bytes)", summary.chunks, chunk.len());

            let parsed = parser.feed(&chunk);
            callbacks.chunk(&chunk);
            for event in parsed {
                if let Some(reason) = self.termination.take() {
                    return self.terminate(&mut parser, summary, reason);
                }
                self.handle_parse_event(event, &mut summary, &mut callbacks).await;
            }
        }

        if let Some(reason) = self.termination.take() {
            return self.terminate(&mut parser, summary, reason);
        }
        for event in parser.finish() {
            if let Some(reason) = self.termination.take() {
                return self.terminate(&mut parser, summary, reason);
            }
            self.handle_parse_event(event, &mut summary, &mut callbacks).await;
        }
        if let Some(reason) = self.termination.take() {
            return self.terminate(&mut parser, summary, reason);
        }

        info!(
            "Parsing complete: {} blocks, {} results, {} errors, {} warnings",
            summary.blocks, summary.results, summary.errors, summary.warnings
        );
        self.events.emit(&ToolEvent::ParsingComplete {
            summary: summary.clone(),
        });
        callbacks.complete(&self.results);
        summary
    }

    /// Process a complete text as a single chunk
    pub async fn process_text(&mut self, text: &str) -> StreamSummary {
        self.process_stream(stream::iter([text.to_string()]), StreamCallbacks::default())
            .await
    }

    /// Process pre-split chunks in order
    pub async fn process_chunks<I, T>(&mut self, chunks: I) -> StreamSummary
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let chunks: Vec<String> = chunks.into_iter().map(Into::into).collect();
        self.process_stream(stream::iter(chunks), StreamCallbacks::default())
            .await
    }

    fn terminate(&mut self, parser: &mut StreamingXmlParser, mut summary: StreamSummary, reason: String) -> StreamSummary {
        if !parser.is_idle() {
            debug!("Discarding {} pending bytes on termination", parser.pending().len());
        }
        parser.reset();
        info!("Stream terminated: {}", reason);
        summary.terminated = Some(reason.clone());
        self.events.emit(&ToolEvent::StreamTerminated { reason });
        summary
    }

    async fn handle_parse_event(
        &mut self,
        event: ParseEvent,
        summary: &mut StreamSummary,
        callbacks: &mut StreamCallbacks<'_>,
    ) {
        match event {
            ParseEvent::Text(text) => trace!("Text outside tool blocks: {} bytes", text.len()),
            ParseEvent::Warning(warning) => {
                summary.warnings += 1;
                warn!("Parse recovery: {}", warning);
                self.events.emit(&ToolEvent::ParseWarning(warning.clone()));
                callbacks.error(StreamIssue::Parse(warning));
            }
            ParseEvent::Block(block) => {
                summary.blocks += 1;
                let raw = block.content.clone();
                match self.dispatch(block).await {
                    Dispatch::Handled(result) => {
                        summary.results += 1;
                        self.results.push(result.clone());
                        self.events.emit(&ToolEvent::ToolResult(result));
                    }
                    Dispatch::Failed(error) => {
                        summary.errors += 1;
                        warn!("{}", error);
                        self.events.emit(&ToolEvent::ToolError {
                            tool_id: error.tool_id().to_string(),
                            raw,
                            error: error.clone(),
                        });
                        callbacks.error(StreamIssue::Dispatch(error));
                    }
                    Dispatch::Dropped => {}
                }
            }
        }
    }

    /// Decode, validate and hand one block to its tool
    async fn dispatch(&self, block: CapturedBlock) -> Dispatch {
        let Some(tool) = self.registry.find_by_tag(&block.tag).filter(|t| t.enabled).cloned() else {
            warn!("Dropping <{}> block: no enabled tool owns this tag", block.tag);
            return Dispatch::Dropped;
        };

        let data = match tool.decode(&block.content) {
            Ok(data) => data,
            Err(message) => {
                return Dispatch::Failed(StreamError::Decode {
                    tool_id: tool.id.clone(),
                    message,
                });
            }
        };

        if let Err(errors) = tool.validate_response(&data) {
            return Dispatch::Failed(StreamError::Validation {
                tool_id: tool.id.clone(),
                errors,
            });
        }

        let result = ToolResult::new(tool.id.clone(), tool.xml_tag.clone(), data.clone(), tool.metadata.clone());
        debug!("Dispatching <{}> to '{}'", block.tag, tool.id);
        if let Err(e) = tool.handle_response(data, self.context.clone()).await {
            return Dispatch::Failed(StreamError::Handler {
                tool_id: tool.id.clone(),
                message: format!("{:#}", e),
            });
        }

        Dispatch::Handled(result)
    }
}
