//! Per-run callbacks and the cooperative termination handle.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::domain::ToolResult;
use crate::error::{ParseRecoveryError, StreamError};

/// Anything reported to `on_error` during a run
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StreamIssue {
    #[error(transparent)]
    Dispatch(#[from] StreamError),

    #[error(transparent)]
    Parse(#[from] ParseRecoveryError),
}

type ChunkFn<'a> = Box<dyn FnMut(&str) + Send + 'a>;
type CompleteFn<'a> = Box<dyn FnMut(&[ToolResult]) + Send + 'a>;
type ErrorFn<'a> = Box<dyn FnMut(&StreamIssue) + Send + 'a>;

/// Optional hooks for one `process_stream` call
#[derive(Default)]
pub struct StreamCallbacks<'a> {
    pub(crate) on_chunk: Option<ChunkFn<'a>>,
    pub(crate) on_complete: Option<CompleteFn<'a>>,
    pub(crate) on_error: Option<ErrorFn<'a>>,
}

impl<'a> StreamCallbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with each raw chunk after it has been parsed
    pub fn on_chunk(mut self, f: impl FnMut(&str) + Send + 'a) -> Self {
        self.on_chunk = Some(Box::new(f));
        self
    }

    /// Called with all results once the stream is fully consumed.
    /// Not called when the run is terminated.
    pub fn on_complete(mut self, f: impl FnMut(&[ToolResult]) + Send + 'a) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Called for every dispatch error and parse warning
    pub fn on_error(mut self, f: impl FnMut(&StreamIssue) + Send + 'a) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub(crate) fn chunk(&mut self, chunk: &str) {
        if let Some(f) = self.on_chunk.as_mut() {
            f(chunk);
        }
    }

    pub(crate) fn complete(&mut self, results: &[ToolResult]) {
        if let Some(f) = self.on_complete.as_mut() {
            f(results);
        }
    }

    pub(crate) fn error(&mut self, issue: StreamIssue) {
        if let Some(f) = self.on_error.as_mut() {
            f(&issue);
        }
    }
}

/// Shared flag requesting that the current (or next) run stop.
///
/// Cloned handles refer to the same flag, so a run can be stopped from a
/// callback, a handler or another task while the owning system is busy.
#[derive(Debug, Clone, Default)]
pub struct TerminationHandle {
    reason: Arc<Mutex<Option<String>>>,
}

impl TerminationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination; a later request replaces the reason
    pub fn terminate(&self, reason: impl Into<String>) {
        *self.lock() = Some(reason.into());
    }

    pub fn is_requested(&self) -> bool {
        self.lock().is_some()
    }

    /// Consume the pending request
    pub(crate) fn take(&self) -> Option<String> {
        self.lock().take()
    }

    pub(crate) fn clear(&self) {
        self.lock().take();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.reason.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_handle_shared_between_clones() {
        let handle = TerminationHandle::new();
        let other = handle.clone();
        assert!(!handle.is_requested());

        other.terminate("user cancelled");
        assert!(handle.is_requested());
        assert_eq!(handle.take().as_deref(), Some("user cancelled"));
        assert!(!other.is_requested());
    }

    #[test]
    fn test_termination_latest_reason_wins() {
        let handle = TerminationHandle::new();
        handle.terminate("first");
        handle.terminate("second");
        assert_eq!(handle.take().as_deref(), Some("second"));
    }

    #[test]
    fn test_clear() {
        let handle = TerminationHandle::new();
        handle.terminate("stop");
        handle.clear();
        assert!(!handle.is_requested());
    }

    #[test]
    fn test_callbacks_are_optional() {
        let mut callbacks = StreamCallbacks::new();
        callbacks.chunk("x");
        callbacks.complete(&[]);
        callbacks.error(StreamIssue::Parse(ParseRecoveryError::UnknownTag { tag: "c".into() }));
    }

    #[test]
    fn test_callbacks_receive_values() {
        let mut chunks = Vec::new();
        let mut issues = Vec::new();
        {
            let mut callbacks = StreamCallbacks::new()
                .on_chunk(|c| chunks.push(c.to_string()))
                .on_error(|i| issues.push(i.to_string()));
            callbacks.chunk("<a>");
            callbacks.error(StreamIssue::Parse(ParseRecoveryError::UnknownTag { tag: "c".into() }));
        }
        assert_eq!(chunks, vec!["<a>"]);
        assert_eq!(issues, vec!["Unknown tag <c>"]);
    }
}
