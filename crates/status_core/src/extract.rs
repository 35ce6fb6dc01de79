//! Locating and decoding the fenced status block inside a single message.
//!
//! A status block looks like
//!
//! ````text
//! ```myst
//! time: 2024-05-01 14:30
//! news:
//!   title: ...
//! ```
//! ````
//!
//! The inner text is repaired line by line and then decoded as YAML. Any
//! failure along the way means "no block in this message", never an error.

use crate::error::Result;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use tracing::debug;

pub const DEFAULT_MARKER: &str = "myst";

/// Top-level mapping decoded from a status block.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBlock {
    entries: Mapping,
}

impl DecodedBlock {
    pub fn new(entries: Mapping) -> Self {
        Self { entries }
    }

    /// Looks up a top-level key. Non-string scalar keys (`1: ...`) match by
    /// their text form.
    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup(&self.entries, key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Looks up `key` inside the nested mapping stored under `container`.
    pub fn get_nested(&self, container: &str, key: &str) -> Option<&Value> {
        let nested = self.get(container)?.as_mapping()?;
        lookup(nested, key)
    }

    pub fn entries(&self) -> &Mapping {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        yaml_to_json(&Value::Mapping(self.entries.clone()))
    }
}

fn lookup<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a Value> {
    if let Some(value) = mapping.get(key) {
        return Some(value);
    }
    mapping
        .iter()
        .find(|(k, _)| scalar_text(k).as_deref() == Some(key))
        .map(|(_, v)| v)
}

/// Text form of a scalar node; `None` for null, sequences and mappings.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Converts a decoded node to JSON, falling back to its YAML text when the
/// node has keys JSON cannot represent.
pub fn yaml_to_json(value: &Value) -> serde_json::Value {
    match serde_json::to_value(value) {
        Ok(json) => json,
        Err(err) => {
            debug!(error = %err, "decoded node is not representable as JSON");
            serde_yaml::to_string(value)
                .map(|text| serde_json::Value::String(text.trim_end().to_string()))
                .unwrap_or(serde_json::Value::Null)
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlockExtractor {
    marker: String,
    fence: Regex,
    ambiguous_value: Regex,
    block_scalar: Regex,
}

impl BlockExtractor {
    pub fn new(marker: &str) -> Result<Self> {
        let fence = Regex::new(&format!(r"```{}\s*\n((?s:.*?))```", regex::escape(marker)))?;
        // `key: value` where the value opens with `*` (alias), `:` or `：`.
        let ambiguous_value = Regex::new(r"^([^:\n]+:[ \t]+)([*:：].*?)[ \t]*$")?;
        // `key: |` / `key: >-` opening a literal or folded scalar.
        let block_scalar = Regex::new(r"^[^:\n]+:[ \t]+[|>][-+0-9]*[ \t]*(#.*)?$")?;
        Ok(Self {
            marker: marker.to_string(),
            fence,
            ambiguous_value,
            block_scalar,
        })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Inner text of the first fenced block without surrounding blank
    /// lines. Indentation of the first line is kept.
    pub fn find_block<'a>(&self, text: &'a str) -> Option<&'a str> {
        let captures = self.fence.captures(text)?;
        captures.get(1).map(|inner| trim_blank_lines(inner.as_str()))
    }

    pub fn extract_block(&self, text: &str) -> Option<DecodedBlock> {
        if text.is_empty() {
            return None;
        }
        let inner = self.find_block(text)?;
        let repaired = self.repair(inner);

        match serde_yaml::from_str::<Value>(&repaired) {
            Ok(Value::Mapping(entries)) => {
                debug!(marker = %self.marker, keys = entries.len(), "decoded status block");
                Some(DecodedBlock::new(entries))
            }
            Ok(other) => {
                debug!(marker = %self.marker, kind = node_kind(&other), "status block is not a mapping");
                None
            }
            Err(err) => {
                debug!(marker = %self.marker, error = %err, raw = %inner, "failed to decode status block");
                None
            }
        }
    }

    /// Quotes scalar values whose first character would otherwise be read
    /// as an alias or a nested mapping. Running it twice changes nothing.
    /// Lines inside `|` and `>` block scalars are left untouched.
    pub fn repair(&self, content: &str) -> String {
        let mut scalar_indent: Option<usize> = None;
        let mut lines = Vec::new();
        for line in content.lines() {
            if let Some(indent) = scalar_indent {
                if line.trim().is_empty() || indent_of(line) > indent {
                    lines.push(line.to_string());
                    continue;
                }
                scalar_indent = None;
            }
            if self.block_scalar.is_match(line) {
                scalar_indent = Some(indent_of(line));
                lines.push(line.to_string());
                continue;
            }
            match self.ambiguous_value.captures(line) {
                Some(caps) => lines.push(format!("{}{}", &caps[1], quote(&caps[2]))),
                None => lines.push(line.to_string()),
            }
        }
        lines.join("\n")
    }

    /// Message text with the first status block removed, for display.
    pub fn strip_block(&self, text: &str) -> String {
        if !self.fence.is_match(text) {
            return text.to_string();
        }
        self.fence.replacen(text, 1, "").trim_end().to_string()
    }
}

fn trim_blank_lines(inner: &str) -> &str {
    let inner = inner.trim_end();
    let first_content = inner.len() - inner.trim_start().len();
    let line_start = inner[..first_content].rfind('\n').map(|i| i + 1).unwrap_or(0);
    &inner[line_start..]
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn node_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}
