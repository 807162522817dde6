//! Prompt System - section assembly and placeholder rendering
//!
//! Tools contribute `PromptSection`s; the `PromptBuilder` orders and joins
//! them into the instruction block prepended to the model's system prompt.

mod builder;
mod render;

pub use builder::{BuildTemplate, PromptBuilder, PromptSection};
pub use render::{contextual_replace, validate_xml_structure};
