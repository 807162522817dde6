//! Typed event channel for tool system observers.
//!
//! Delivery is synchronous and in order: `emit` calls every matching
//! subscriber, in subscription order, before it returns.

use std::fmt;

use serde::Serialize;

use crate::error::{ParseRecoveryError, StreamError};

use super::result::ToolResult;

/// Event name constants
pub mod event_types {
    pub const TOOL_RESULT: &str = "toolResult";
    pub const TOOL_ERROR: &str = "toolError";
    pub const PROMPT_GENERATED: &str = "promptGenerated";
    pub const PARSING_STARTED: &str = "parsingStarted";
    pub const PARSING_COMPLETE: &str = "parsingComplete";
    pub const TOOL_ENABLED: &str = "toolEnabled";
    pub const TOOL_DISABLED: &str = "toolDisabled";
    pub const TOOL_REGISTERED: &str = "toolRegistered";
    pub const TOOL_UNREGISTERED: &str = "toolUnregistered";
    pub const PARSE_WARNING: &str = "parseWarning";
    pub const STREAM_TERMINATED: &str = "streamTerminated";
}

/// Discriminant used to subscribe to one kind of event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ToolResult,
    ToolError,
    PromptGenerated,
    ParsingStarted,
    ParsingComplete,
    ToolEnabled,
    ToolDisabled,
    ToolRegistered,
    ToolUnregistered,
    ParseWarning,
    StreamTerminated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolResult => event_types::TOOL_RESULT,
            Self::ToolError => event_types::TOOL_ERROR,
            Self::PromptGenerated => event_types::PROMPT_GENERATED,
            Self::ParsingStarted => event_types::PARSING_STARTED,
            Self::ParsingComplete => event_types::PARSING_COMPLETE,
            Self::ToolEnabled => event_types::TOOL_ENABLED,
            Self::ToolDisabled => event_types::TOOL_DISABLED,
            Self::ToolRegistered => event_types::TOOL_REGISTERED,
            Self::ToolUnregistered => event_types::TOOL_UNREGISTERED,
            Self::ParseWarning => event_types::PARSE_WARNING,
            Self::StreamTerminated => event_types::STREAM_TERMINATED,
        }
    }

    /// Parse from the camelCase event name
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            event_types::TOOL_RESULT => Some(Self::ToolResult),
            event_types::TOOL_ERROR => Some(Self::ToolError),
            event_types::PROMPT_GENERATED => Some(Self::PromptGenerated),
            event_types::PARSING_STARTED => Some(Self::ParsingStarted),
            event_types::PARSING_COMPLETE => Some(Self::ParsingComplete),
            event_types::TOOL_ENABLED => Some(Self::ToolEnabled),
            event_types::TOOL_DISABLED => Some(Self::ToolDisabled),
            event_types::TOOL_REGISTERED => Some(Self::ToolRegistered),
            event_types::TOOL_UNREGISTERED => Some(Self::ToolUnregistered),
            event_types::PARSE_WARNING => Some(Self::ParseWarning),
            event_types::STREAM_TERMINATED => Some(Self::StreamTerminated),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters describing one `process_stream` run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    /// Chunks consumed from the input
    pub chunks: usize,
    /// Completed blocks captured by the parser
    pub blocks: usize,
    /// Tool results recorded
    pub results: usize,
    /// Decode, validation and handler errors
    pub errors: usize,
    /// Parse recovery warnings
    pub warnings: usize,
    /// Termination reason when the run was stopped early
    pub terminated: Option<String>,
}

/// Something observable happened inside a tool system
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEvent {
    ToolResult(ToolResult),
    ToolError {
        tool_id: String,
        raw: String,
        error: StreamError,
    },
    PromptGenerated {
        prompt: String,
    },
    ParsingStarted,
    ParsingComplete {
        summary: StreamSummary,
    },
    ToolEnabled {
        id: String,
    },
    ToolDisabled {
        id: String,
    },
    ToolRegistered {
        id: String,
    },
    ToolUnregistered {
        id: String,
    },
    ParseWarning(ParseRecoveryError),
    StreamTerminated {
        reason: String,
    },
}

impl ToolEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ToolResult(_) => EventKind::ToolResult,
            Self::ToolError { .. } => EventKind::ToolError,
            Self::PromptGenerated { .. } => EventKind::PromptGenerated,
            Self::ParsingStarted => EventKind::ParsingStarted,
            Self::ParsingComplete { .. } => EventKind::ParsingComplete,
            Self::ToolEnabled { .. } => EventKind::ToolEnabled,
            Self::ToolDisabled { .. } => EventKind::ToolDisabled,
            Self::ToolRegistered { .. } => EventKind::ToolRegistered,
            Self::ToolUnregistered { .. } => EventKind::ToolUnregistered,
            Self::ParseWarning(_) => EventKind::ParseWarning,
            Self::StreamTerminated { .. } => EventKind::StreamTerminated,
        }
    }

    /// Name of the event, e.g. "toolResult"
    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&ToolEvent) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    kind: Option<EventKind>,
    listener: Listener,
}

/// Subscriber list with synchronous, in-order delivery
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a single kind of event
    pub fn subscribe<F>(&mut self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&ToolEvent) + Send + Sync + 'static,
    {
        self.push(Some(kind), Box::new(listener))
    }

    /// Subscribe to every event
    pub fn subscribe_all<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&ToolEvent) + Send + Sync + 'static,
    {
        self.push(None, Box::new(listener))
    }

    fn push(&mut self, kind: Option<EventKind>, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, kind, listener });
        id
    }

    /// Remove a subscriber; returns false if it was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Deliver an event to every matching subscriber before returning
    pub fn emit(&self, event: &ToolEvent) {
        let kind = event.kind();
        for subscriber in &self.subscribers {
            if subscriber.kind.is_none_or(|k| k == kind) {
                (subscriber.listener)(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
