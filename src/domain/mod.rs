//! Domain types for Toolstream
//!
//! - GlobalContext: shared key/value map used for prompts and handlers
//! - ToolResult: one successfully handled tool block
//! - ToolEvent: notifications emitted by the tool system, and the bus that
//!   delivers them

pub mod context;
pub mod event;
pub mod result;

pub use context::{GlobalContext, value_to_string};
pub use event::{EventBus, EventKind, StreamSummary, SubscriptionId, ToolEvent, event_types};
pub use result::ToolResult;
