//! Placeholder substitution and a coarse tag-balance check.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::domain::context::value_to_string;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder regex"));

static OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z_][A-Za-z0-9_.:\-]*)(\s[^<>]*)?>").expect("open tag regex"));

static CLOSE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</([A-Za-z_][A-Za-z0-9_.:\-]*)\s*>").expect("close tag regex"));

/// Replace `{{key}}` placeholders with the context value's string form.
///
/// Strings are inserted verbatim, other values as JSON. Placeholders whose
/// key is missing are left untouched.
pub fn contextual_replace(template: &str, context: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match context.get(&caps[1]) {
            Some(value) => value_to_string(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Coarse well-formedness heuristic: the number of opening tags equals the
/// number of closing tags. Self-closing tags are ignored. Nesting, order
/// and matching names are not checked.
pub fn validate_xml_structure(text: &str) -> bool {
    let opens = OPEN_TAG
        .find_iter(text)
        .filter(|m| !m.as_str().ends_with("/>"))
        .count();
    let closes = CLOSE_TAG.find_iter(text).count();
    opens == closes
}
