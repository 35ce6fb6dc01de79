use crate::extract::{scalar_text, yaml_to_json, DecodedBlock};
use crate::schema::{DualNumber, FieldDescriptor, FieldType, FieldValue, News, StatusRecord};
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::debug;

// Candidate keys per fixed attribute, canonical first. Older blocks used the
// Chinese keys, so they stay in the chain after the current English ones.
const DATE_KEYS: &[&str] = &["time", "時間", "date"];
const LOCATION_KEYS: &[&str] = &["place", "地點", "location"];
const WEATHER_KEYS: &[&str] = &["weather", "天氣"];

// (container, key) pairs for the nested news record.
const NEWS_TITLE_KEYS: &[(&str, &str)] = &[("news", "title"), ("新聞", "標題")];
const NEWS_CONTENT_KEYS: &[(&str, &str)] = &[("news", "content"), ("新聞", "內文")];
const NEWS_TYPE_KEYS: &[(&str, &str)] = &[("news", "type"), ("新聞", "類型")];

const PERCENT_SUFFIXES: &[char] = &['%', '％'];

pub fn map_fields(block: &DecodedBlock, fields: &[FieldDescriptor]) -> StatusRecord {
    let record = StatusRecord {
        date: first_top_level(block, DATE_KEYS),
        location: first_top_level(block, LOCATION_KEYS),
        weather: first_top_level(block, WEATHER_KEYS),
        news: News {
            kind: first_nested(block, NEWS_TYPE_KEYS),
            title: first_nested(block, NEWS_TITLE_KEYS),
            content: first_nested(block, NEWS_CONTENT_KEYS),
        },
        custom_fields: map_custom_fields(block, fields),
    };
    debug!(
        date = %record.date,
        location = %record.location,
        custom = record.custom_fields.len(),
        "mapped status record"
    );
    record
}

fn first_top_level(block: &DecodedBlock, candidates: &[&str]) -> String {
    candidates
        .iter()
        .find_map(|key| block.get(key).and_then(scalar_text))
        .unwrap_or_default()
}

fn first_nested(block: &DecodedBlock, candidates: &[(&str, &str)]) -> String {
    candidates
        .iter()
        .find_map(|(container, key)| block.get_nested(container, key).and_then(scalar_text))
        .unwrap_or_default()
}

fn map_custom_fields(block: &DecodedBlock, fields: &[FieldDescriptor]) -> BTreeMap<String, FieldValue> {
    let mut custom_fields = BTreeMap::new();
    for field in fields {
        if !field.enabled || field.name.is_empty() {
            continue;
        }
        let Some(raw) = block.get(&field.name) else {
            continue;
        };
        let value = match field.field_type {
            FieldType::Text => FieldValue::Text(value_text(raw)),
            FieldType::Number => coerce_number(&field.name, raw),
        };
        custom_fields.insert(field.id.clone(), value);
    }
    custom_fields
}

/// String form used for text fields. Nested nodes render as compact JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Sequence(_) | Value::Mapping(_) => yaml_to_json(value).to_string(),
        _ => scalar_text(value).unwrap_or_default(),
    }
}

fn coerce_number(name: &str, raw: &Value) -> FieldValue {
    let text = value_text(raw);
    let trimmed = text.trim();
    let (clean, had_suffix) = match trimmed.strip_suffix(PERCENT_SUFFIXES) {
        Some(clean) => (clean, true),
        None => (trimmed, false),
    };
    let parsed = parse_number(clean);
    debug!(field = name, raw = trimmed, clean, parsed = ?parsed, "number field coercion");

    match parsed {
        Some(value) if had_suffix => FieldValue::Dual(DualNumber {
            value,
            display: trimmed.to_string(),
        }),
        Some(value) => FieldValue::Number(value),
        None => FieldValue::Raw(yaml_to_json(raw)),
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}
