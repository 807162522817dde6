//! Incremental parser for tagged tool blocks in streamed model output.
//!
//! The parser is a three-state machine:
//!
//! - `Outside`: plain text, scanning for `<`
//! - `Opening`: reading a tag name up to `>`
//! - `Content`: accumulating a registered tag's body until `</tag>`
//!
//! Any text that cannot be decided yet (a partial opening tag, a body whose
//! closing marker has not arrived) stays in the pending buffer and is
//! rescanned together with the next chunk. Every decision depends only on
//! the text seen so far, so the captured blocks are the same no matter how
//! the input is split into chunks.
//!
//! Only simple single-level tags are recognised: `<name>` where `name`
//! starts with an ASCII letter or `_` and continues with ASCII letters,
//! digits, `_`, `-`, `.` or `:`. Anything else, including tags with
//! attributes, is plain text.

use std::collections::HashMap;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::error::ParseRecoveryError;

/// Longest tag name considered before the span is treated as text
pub const MAX_TAG_LEN: usize = 64;

/// Whether `c` may appear in a tag name at this position
fn is_tag_name_char(c: char, first: bool) -> bool {
    if first {
        c.is_ascii_alphabetic() || c == '_'
    } else {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
    }
}

/// Whether the parser can ever recognise `<name>` as an opening tag
pub fn is_valid_tag_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_TAG_LEN
        && name.chars().enumerate().all(|(i, c)| is_tag_name_char(c, i == 0))
}

/// Parser behaviour switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Match tag names ignoring ASCII case
    pub lowercase: bool,
    /// Collapse whitespace runs in captured content to single spaces
    pub normalize: bool,
    /// Report unknown opening tags as warnings instead of passing them through as text
    pub strict_mode: bool,
}

/// Current scan state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Outside,
    Opening,
    Content,
}

/// A completed `(tag, content)` pair; content is verbatim unless normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedBlock {
    pub tag: String,
    pub content: String,
}

/// Output of the parser
#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent {
    /// Text outside any registered block
    Text(String),
    /// A registered block closed
    Block(CapturedBlock),
    /// Something was skipped; parsing continues
    Warning(ParseRecoveryError),
}

enum OpenScan {
    /// Need more input to decide
    Incomplete,
    /// The first `len` bytes are literal text
    NotATag(usize),
    /// A complete opening tag spanning `len` bytes
    Tag { name: String, len: usize },
}

/// Streaming tag extractor for a fixed set of registered tags
#[derive(Debug, Clone)]
pub struct StreamingXmlParser {
    /// Match key (folded when `lowercase`) -> registered tag name
    tags: HashMap<String, String>,
    options: ParserOptions,
    mode: ScanMode,
    open_tag: Option<String>,
    closing_marker: String,
    pending: String,
    /// Offset in `pending` where the closing-marker search resumes
    scan_from: usize,
}

impl StreamingXmlParser {
    /// Create a parser recognising the given tags
    pub fn new<I, S>(tags: I, options: ParserOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = tags
            .into_iter()
            .map(|t| {
                let tag = t.into();
                (Self::match_key(&tag, options.lowercase), tag)
            })
            .collect();

        Self {
            tags,
            options,
            mode: ScanMode::Outside,
            open_tag: None,
            closing_marker: String::new(),
            pending: String::new(),
            scan_from: 0,
        }
    }

    fn match_key(tag: &str, lowercase: bool) -> String {
        if lowercase { tag.to_ascii_lowercase() } else { tag.to_string() }
    }

    pub fn options(&self) -> ParserOptions {
        self.options
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Registered tag currently open, if any
    pub fn open_tag(&self) -> Option<&str> {
        self.open_tag.as_deref()
    }

    /// Text retained for the next chunk
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Outside any tag with nothing buffered
    pub fn is_idle(&self) -> bool {
        self.mode == ScanMode::Outside && self.pending.is_empty()
    }

    /// Feed one chunk, returning everything that could be decided
    pub fn feed(&mut self, chunk: &str) -> Vec<ParseEvent> {
        let mut events = Vec::new();
        self.pending.push_str(chunk);
        self.drain(&mut events);
        events
    }

    /// End of input. An unfinished tag or block is discarded with a warning.
    pub fn finish(&mut self) -> Vec<ParseEvent> {
        let mut events = Vec::new();
        match self.mode {
            ScanMode::Outside => {
                if !self.pending.is_empty() {
                    events.push(ParseEvent::Text(std::mem::take(&mut self.pending)));
                }
            }
            ScanMode::Opening => {
                let partial = std::mem::take(&mut self.pending);
                warn!("Stream ended inside an opening tag: {:?}", partial);
                events.push(ParseEvent::Warning(ParseRecoveryError::UnterminatedOpenTag { partial }));
            }
            ScanMode::Content => {
                let tag = self.open_tag.clone().unwrap_or_default();
                let buffered = self.pending.len();
                warn!("Stream ended inside <{}>, discarding {} bytes", tag, buffered);
                events.push(ParseEvent::Warning(ParseRecoveryError::UnterminatedBlock { tag, buffered }));
            }
        }
        self.reset();
        events
    }

    /// Feed a complete text and finish
    pub fn parse_complete(&mut self, text: &str) -> Vec<ParseEvent> {
        let mut events = self.feed(text);
        events.extend(self.finish());
        events
    }

    /// Drop all buffered state and return to `Outside`
    pub fn reset(&mut self) {
        self.mode = ScanMode::Outside;
        self.open_tag = None;
        self.closing_marker.clear();
        self.pending.clear();
        self.scan_from = 0;
    }

    fn drain(&mut self, events: &mut Vec<ParseEvent>) {
        loop {
            match self.mode {
                ScanMode::Outside => match self.pending.find('<') {
                    None => {
                        if !self.pending.is_empty() {
                            events.push(ParseEvent::Text(std::mem::take(&mut self.pending)));
                        }
                        return;
                    }
                    Some(pos) => {
                        if pos > 0 {
                            events.push(ParseEvent::Text(self.pending.drain(..pos).collect()));
                        }
                        self.mode = ScanMode::Opening;
                    }
                },
                ScanMode::Opening => match self.scan_open_tag() {
                    OpenScan::Incomplete => return,
                    OpenScan::NotATag(len) => {
                        events.push(ParseEvent::Text(self.pending.drain(..len).collect()));
                        self.mode = ScanMode::Outside;
                    }
                    OpenScan::Tag { name, len } => {
                        let raw: String = self.pending.drain(..len).collect();
                        match self.tags.get(&Self::match_key(&name, self.options.lowercase)).cloned() {
                            Some(tag) => {
                                trace!("Opened <{}>", tag);
                                self.closing_marker = Self::match_key(&format!("</{}>", tag), self.options.lowercase);
                                self.open_tag = Some(tag);
                                self.scan_from = 0;
                                self.mode = ScanMode::Content;
                            }
                            None if self.options.strict_mode => {
                                debug!("Unknown tag <{}> in strict mode", name);
                                events.push(ParseEvent::Warning(ParseRecoveryError::UnknownTag { tag: name }));
                                self.mode = ScanMode::Outside;
                            }
                            None => {
                                events.push(ParseEvent::Text(raw));
                                self.mode = ScanMode::Outside;
                            }
                        }
                    }
                },
                ScanMode::Content => match self.find_closing_marker() {
                    None => {
                        self.scan_from = self.resume_offset();
                        return;
                    }
                    Some(pos) => {
                        let mut content: String = self.pending.drain(..pos).collect();
                        self.pending.replace_range(..self.closing_marker.len(), "");
                        if self.options.normalize {
                            content = content.split_whitespace().collect::<Vec<_>>().join(" ");
                        }
                        let tag = self.open_tag.take().unwrap_or_default();
                        trace!("Closed <{}> with {} bytes", tag, content.len());
                        events.push(ParseEvent::Block(CapturedBlock { tag, content }));
                        self.closing_marker.clear();
                        self.scan_from = 0;
                        self.mode = ScanMode::Outside;
                    }
                },
            }
        }
    }

    /// Inspect `pending`, which starts with `<`
    fn scan_open_tag(&self) -> OpenScan {
        let mut closing = false;
        let mut name_start = 1;

        for (i, c) in self.pending.char_indices().skip(1) {
            if c == '>' {
                let name = &self.pending[name_start..i];
                return if name.is_empty() || closing {
                    // `<>`, `</>` and stray closing tags stay as text
                    OpenScan::NotATag(i + 1)
                } else {
                    OpenScan::Tag {
                        name: name.to_string(),
                        len: i + 1,
                    }
                };
            }

            let name_len = i - name_start;
            let valid = if i == 1 && c == '/' {
                closing = true;
                name_start = 2;
                true
            } else {
                is_tag_name_char(c, name_len == 0)
            };

            if !valid || name_len >= MAX_TAG_LEN {
                return OpenScan::NotATag(i);
            }
        }

        OpenScan::Incomplete
    }

    fn find_closing_marker(&self) -> Option<usize> {
        let from = self.scan_from;
        let haystack = &self.pending[from..];
        let found = if self.options.lowercase {
            haystack.to_ascii_lowercase().find(&self.closing_marker)
        } else {
            haystack.find(&self.closing_marker)
        };
        found.map(|pos| from + pos)
    }

    /// Earliest offset where a closing marker could still start
    fn resume_offset(&self) -> usize {
        let keep = self.closing_marker.len().saturating_sub(1);
        let mut offset = self.pending.len().saturating_sub(keep);
        while !self.pending.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}
