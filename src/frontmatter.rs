//! Front-matter parsing.
//!
//! A note may start with a YAML block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Weekly review
//! tags: [review, planning]
//! ---
//! Body text starts here.
//! ```
//!
//! [`parse`] splits such a note into its [`Metadata`] and body. It never
//! fails: a missing or unterminated fence, invalid YAML, or a block that is
//! not a mapping all degrade to "no metadata" with the text left untouched.

use serde_yaml::Value;

use crate::models::{MetaValue, Metadata};

const FENCE: &str = "---";

/// Split `raw` into `(metadata, body)`.
///
/// The body is everything after the closing fence line. Only that line's
/// terminator is consumed; blank lines that follow are preserved.
pub fn parse(raw: &str) -> (Metadata, &str) {
    let Some((block, body)) = split_block(raw) else {
        return (Metadata::new(), raw);
    };
    match parse_block(block) {
        Some(metadata) => (metadata, body),
        None => (Metadata::new(), raw),
    }
}

/// Compose a note from metadata and body. Empty metadata returns the body
/// unchanged.
pub fn render(metadata: &Metadata, body: &str) -> String {
    if metadata.is_empty() {
        return body.to_string();
    }
    let yaml = serde_yaml::to_string(metadata).unwrap_or_default();
    format!("{FENCE}\n{}\n{FENCE}\n{}", yaml.trim_end_matches('\n'), body)
}

/// Locate the fenced block. Returns the raw block text and the body slice.
fn split_block(raw: &str) -> Option<(&str, &str)> {
    let (first, mut rest) = next_line(raw)?;
    if first != FENCE {
        return None;
    }
    let block_start = raw.len() - rest.len();

    loop {
        let line_start = raw.len() - rest.len();
        let (line, after) = next_line(rest)?;
        if line == FENCE {
            return Some((&raw[block_start..line_start], after));
        }
        rest = after;
    }
}

/// Split off one line (without its `\n` / `\r\n`) and the remainder.
fn next_line(s: &str) -> Option<(&str, &str)> {
    if s.is_empty() {
        return None;
    }
    let (line, rest) = match s.find('\n') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    };
    Some((line.strip_suffix('\r').unwrap_or(line), rest))
}

fn parse_block(block: &str) -> Option<Metadata> {
    if block.trim().is_empty() {
        return Some(Metadata::new());
    }
    match serde_yaml::from_str::<Value>(block).ok()? {
        Value::Mapping(mapping) => Some(to_metadata(mapping)),
        // A block holding only comments
        Value::Null => Some(Metadata::new()),
        _ => None,
    }
}

fn to_metadata(mapping: serde_yaml::Mapping) -> Metadata {
    mapping
        .into_iter()
        .map(|(k, v)| (key_to_string(k), to_meta_value(v)))
        .collect()
}

fn key_to_string(key: Value) -> String {
    match key {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .unwrap_or_default()
            .trim_end()
            .to_string(),
    }
}

fn to_meta_value(value: Value) -> MetaValue {
    match value {
        Value::Null => MetaValue::Null,
        Value::Bool(b) => MetaValue::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                MetaValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                MetaValue::Float(f)
            } else {
                MetaValue::String(n.to_string())
            }
        }
        Value::String(s) => MetaValue::String(s),
        Value::Sequence(seq) => MetaValue::List(seq.into_iter().map(to_meta_value).collect()),
        Value::Mapping(m) => MetaValue::Map(to_metadata(m)),
        Value::Tagged(tagged) => to_meta_value(tagged.value),
    }
}
