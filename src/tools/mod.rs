//! Tool System - tool definitions, registry and manifest loading

mod definition;
mod manifest;
mod registry;
pub mod schema;

pub use definition::{HandleResponseFn, HandlerFuture, PayloadDecoder, PromptSectionFn, Tool, ValidateResponseFn};
pub use manifest::ToolManifest;
pub use registry::{RegistryStats, ToolRegistry};
