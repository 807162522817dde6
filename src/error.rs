//! Error types for Toolstream
//!
//! Centralized error handling using thiserror. Only registry misuse and I/O
//! surface as `ToolSystemError` at the call site; everything that goes wrong
//! while a stream is being processed is reported as a `StreamError` or a
//! `ParseRecoveryError` through the event channel.

use thiserror::Error;

/// Errors returned directly to the caller
#[derive(Debug, Error)]
pub enum ToolSystemError {
    /// A tool with this id is already registered
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// Another tool already claims this xml tag
    #[error("XML tag '{tag}' already used by tool '{owner}'")]
    DuplicateTag { tag: String, owner: String },

    /// The xml tag can never be matched as `<tag>`
    #[error("Invalid XML tag '{tag}' for tool '{tool_id}'")]
    InvalidTag { tool_id: String, tag: String },

    /// No tool with this id is registered
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool manifest could not be turned into tools
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ToolSystemError {
    /// Duplicate id, duplicate tag or unusable tag on registration
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTool(_) | Self::DuplicateTag { .. } | Self::InvalidTag { .. }
        )
    }

    /// Unknown id passed to unregister/enable/disable
    pub fn is_lookup_error(&self) -> bool {
        matches!(self, Self::ToolNotFound(_))
    }
}

/// Recoverable failures while dispatching a captured block
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StreamError {
    /// The tool's decoder rejected the raw block body
    #[error("Failed to decode payload for '{tool_id}': {message}")]
    Decode { tool_id: String, message: String },

    /// The decoded payload does not satisfy the tool's schema
    #[error("Validation failed for '{tool_id}': {}", .errors.join("; "))]
    Validation { tool_id: String, errors: Vec<String> },

    /// The tool's handler returned an error
    #[error("Handler for '{tool_id}' failed: {message}")]
    Handler { tool_id: String, message: String },
}

impl StreamError {
    /// Id of the tool the failing block was routed to
    pub fn tool_id(&self) -> &str {
        match self {
            Self::Decode { tool_id, .. } | Self::Validation { tool_id, .. } | Self::Handler { tool_id, .. } => {
                tool_id
            }
        }
    }
}

/// Non-fatal problems found by the streaming parser
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseRecoveryError {
    /// A well-formed tag that no tool claims (strict mode only)
    #[error("Unknown tag <{tag}>")]
    UnknownTag { tag: String },

    /// Stream ended inside a registered block; the block was discarded
    #[error("Stream ended inside <{tag}> ({buffered} bytes discarded)")]
    UnterminatedBlock { tag: String, buffered: usize },

    /// Stream ended while an opening tag was still being read
    #[error("Stream ended inside an opening tag: {partial}")]
    UnterminatedOpenTag { partial: String },
}

/// Result type alias for Toolstream operations
pub type Result<T> = std::result::Result<T, ToolSystemError>;
