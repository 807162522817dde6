//! Tool System - the coordinator tying tools, prompts and streams together

mod callbacks;
mod tool_system;

pub use callbacks::{StreamCallbacks, StreamIssue, TerminationHandle};
pub use tool_system::{ToolSystem, ToolSystemConfig};
