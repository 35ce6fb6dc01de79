//! Settings backup and restore as JSON.

use crate::error::{Result, StatusError};
use crate::schema::FieldDescriptor;
use crate::settings::{CustomPrompt, FixedFieldsEnabled, Language, Settings};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub version: String,
    pub timestamp: i64, // unix milliseconds
    pub fields: Vec<FieldDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<CustomPrompt>,
    pub fixed_fields_enabled: FixedFieldsEnabled,
    pub language: Language,
    pub marker: String,
}

pub fn export_settings(settings: &Settings, version: &str) -> ExportData {
    let timestamp = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
    info!(version, fields = settings.fields.len(), "exporting settings");
    ExportData {
        version: version.to_string(),
        timestamp,
        fields: settings.fields.clone(),
        custom_prompt: settings.custom_prompt.clone(),
        fixed_fields_enabled: settings.fixed_fields_enabled.clone(),
        language: settings.language,
        marker: settings.marker.clone(),
    }
}

/// Keys found in an import; absent keys leave the current setting alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub version: Option<String>,
    pub fields: Option<Vec<FieldDescriptor>>,
    pub custom_prompt: Option<CustomPrompt>,
    pub fixed_fields_enabled: Option<FixedFieldsEnabled>,
    pub language: Option<Language>,
    pub marker: Option<String>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.fields.is_none()
            && self.custom_prompt.is_none()
            && self.fixed_fields_enabled.is_none()
            && self.language.is_none()
            && self.marker.is_none()
    }

    /// Merged copy of `current`, validated before it is returned.
    pub fn apply(self, current: &Settings) -> Result<Settings> {
        let mut merged = current.clone();
        if let Some(fields) = self.fields {
            merged.fields = fields;
        }
        if let Some(custom_prompt) = self.custom_prompt {
            merged.custom_prompt = Some(custom_prompt);
        }
        if let Some(fixed) = self.fixed_fields_enabled {
            merged.fixed_fields_enabled = fixed;
        }
        if let Some(language) = self.language {
            merged.language = language;
        }
        if let Some(marker) = self.marker {
            merged.marker = marker;
        }
        merged.validate()?;
        Ok(merged)
    }
}

pub fn validate_import(raw: &str) -> Result<SettingsPatch> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(StatusError::InvalidImport("expected a JSON object".into()));
    }
    let patch: SettingsPatch =
        serde_json::from_value(value).map_err(|err| StatusError::InvalidImport(err.to_string()))?;
    if let Some(version) = &patch.version {
        debug!(version = %version, "import data version");
    }
    Ok(patch)
}
