use crate::error::{Result, StatusError};
use crate::extract::DEFAULT_MARKER;
use crate::schema::{FieldDescriptor, FieldType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Language {
    #[default]
    #[serde(rename = "zh-TW")]
    ZhTw,
    #[serde(rename = "en")]
    En,
}

/// Which fixed attributes the prompt asks the model for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FixedFieldsEnabled {
    pub time: bool,
    pub place: bool,
    pub weather: bool,
    pub news: bool,
}

impl Default for FixedFieldsEnabled {
    fn default() -> Self {
        Self {
            time: true,
            place: true,
            weather: true,
            news: true,
        }
    }
}

/// Replacement descriptions for the fixed attributes in the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CustomPrompt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(alias = "newsTitle", skip_serializing_if = "Option::is_none")]
    pub news_title: Option<String>,
    #[serde(alias = "newsContent", skip_serializing_if = "Option::is_none")]
    pub news_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Settings {
    pub panel_enabled: bool,
    pub language: Language,
    pub marker: String, // fence tag, e.g. "myst"
    pub fields: Vec<FieldDescriptor>,
    pub fixed_fields_enabled: FixedFieldsEnabled,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<CustomPrompt>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            panel_enabled: false,
            language: Language::default(),
            marker: DEFAULT_MARKER.to_string(),
            fields: default_fields(),
            fixed_fields_enabled: FixedFieldsEnabled::default(),
            custom_prompt: None,
        }
    }
}

fn default_fields() -> Vec<FieldDescriptor> {
    let mut affection = FieldDescriptor::new(
        "好感度",
        "<char>目前對<user>的好感度,最低為0最高為100, 純數字",
        FieldType::Number,
    );
    affection.order = 0;
    let mut thoughts = FieldDescriptor::new("內心話", "<char>當前內心第一人稱想法, 100字內", FieldType::Text);
    thoughts.order = 1;
    vec![affection, thoughts]
}

impl Settings {
    /// Loads and validates a settings file. When the file has no `fields`
    /// key the default fields are written back, so their ids stay stable
    /// across loads.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let settings = Self::from_toml(&raw)?;
        let table: toml::Table = toml::from_str(&raw)?;
        if !table.contains_key("fields") {
            settings.save(path)?;
            info!(path = %path.display(), "persisted default fields");
        }
        debug!(path = %path.display(), fields = settings.fields.len(), "loaded settings");
        Ok(settings)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.marker.trim().is_empty() {
            return Err(StatusError::InvalidSettings("marker must not be empty".into()));
        }

        let mut ids = HashSet::new();
        let mut enabled_names = HashSet::new();
        for field in &self.fields {
            if field.id.is_empty() {
                return Err(StatusError::InvalidSettings(format!("field '{}' has an empty id", field.name)));
            }
            if !ids.insert(field.id.as_str()) {
                return Err(StatusError::InvalidSettings(format!("duplicate field id '{}'", field.id)));
            }
            if field.enabled && !enabled_names.insert(field.name.as_str()) {
                return Err(StatusError::InvalidSettings(format!(
                    "enabled fields share the name '{}'",
                    field.name
                )));
            }
        }
        Ok(())
    }

    /// Enabled fields in display order; equal `order` keeps list order.
    pub fn enabled_fields_in_order(&self) -> Vec<&FieldDescriptor> {
        let mut fields: Vec<&FieldDescriptor> = self.fields.iter().filter(|field| field.enabled).collect();
        fields.sort_by_key(|field| field.order);
        fields
    }
}
