//! Toolstream - streaming tool-call extraction for LLM output
//!
//! Tools are registered with an xml tag, a payload decoder, a schema and an
//! async handler. The `ToolSystem` builds the system prompt that teaches a
//! model those tags, then consumes the model's output chunk by chunk,
//! extracting every complete `<tag>...</tag>` block and dispatching it to the
//! owning tool as soon as its closing tag arrives.

pub mod domain;
pub mod error;
pub mod prompt;
pub mod stream;
pub mod system;
pub mod tools;

pub use domain::{EventKind, GlobalContext, StreamSummary, ToolEvent, ToolResult};
pub use error::{ParseRecoveryError, Result, StreamError, ToolSystemError};
pub use prompt::{BuildTemplate, PromptBuilder, PromptSection};
pub use stream::{ParserOptions, StreamingXmlParser};
pub use system::{StreamCallbacks, StreamIssue, TerminationHandle, ToolSystem, ToolSystemConfig};
pub use tools::{PayloadDecoder, Tool, ToolManifest, ToolRegistry};
