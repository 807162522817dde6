//! Streaming extraction of tagged tool blocks
//!
//! Model output arrives in arbitrary chunks; the parser reassembles
//! complete `<tag>...</tag>` blocks for every registered tag.

mod parser;

pub use parser::{CapturedBlock, MAX_TAG_LEN, ParseEvent, ParserOptions, ScanMode, StreamingXmlParser, is_valid_tag_name};
