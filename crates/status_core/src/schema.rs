use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Number,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldDescriptor {
    pub id: String,          // stable join key, survives renames
    pub name: String,        // key expected inside the status block
    #[serde(default)]
    pub description: String, // only used when building the prompt
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
}

fn default_enabled() -> bool {
    true
}

impl FieldDescriptor {
    /// New enabled field with a freshly generated id.
    pub fn new(name: impl Into<String>, description: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            order: 0,
            enabled: true,
            field_type,
        }
    }
}

/// Numeric reading that keeps the text it was parsed from, e.g. `"42%"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DualNumber {
    pub value: f64,      // stripped magnitude, for progress bars
    pub display: String, // original trimmed text
}

/// One mapped custom field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Dual(DualNumber),
    Number(f64),
    Text(String),
    /// Decoded value passed through when a number field held non-numeric content.
    Raw(Value),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Dual(dual) => Some(dual.value),
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct News {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub date: String,
    pub location: String,
    pub weather: String,
    pub news: News,
    /// Keyed by field descriptor id. Missing entries mean "unknown", never zero.
    pub custom_fields: BTreeMap<String, FieldValue>,
}
