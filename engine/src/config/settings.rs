// Engine settings: an embedded default document, optionally overlaid by a
// JSON file supplied on the command line or through ESG_ENGINE_CONFIG.
use serde::Deserialize;
use serde_json::map::Entry;
use serde_json::Value;
use shared::NumberFormat;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

const DEFAULT_CONFIG: &str = include_str!("../../config/default.json");

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Memory,
    JsonFile,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StorageSettings {
    pub kind: StorageKind,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EngineSettings {
    pub storage: StorageSettings,
    pub default_unit: String,
    pub number_format: NumberFormat,
    pub csv_delimiter: char,
    pub log_filter: String,
}

impl EngineSettings {
    pub fn load_default() -> Result<Self, EngineError> {
        Self::from_value(Self::default_document()?)
    }

    /// Loads the embedded defaults and overlays `path` when given. Keys absent
    /// from the file keep their default values; nested objects merge key by key.
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        let mut document = Self::default_document()?;
        if let Some(path) = path {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                EngineError::ConfigError(format!("Failed to read config '{}': {}", path.display(), e))
            })?;
            let overlay: Value = serde_json::from_str(&raw).map_err(|e| {
                EngineError::ConfigError(format!("Failed to parse config '{}': {}", path.display(), e))
            })?;
            merge_json(&mut document, overlay);
            tracing::debug!(config = %path.display(), "Applied configuration overlay");
        }
        Self::from_value(document)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.default_unit.trim().is_empty() {
            return Err(EngineError::ConfigError("default_unit must not be empty".to_string()));
        }
        if self.storage.kind == StorageKind::JsonFile && self.storage.path.is_none() {
            return Err(EngineError::ConfigError(
                "storage.path is required when storage.kind is json_file".to_string(),
            ));
        }
        if !self.csv_delimiter.is_ascii() || self.csv_delimiter.is_ascii_alphanumeric() {
            return Err(EngineError::ConfigError(format!(
                "csv_delimiter must be an ASCII punctuation or whitespace character, got '{}'",
                self.csv_delimiter
            )));
        }
        // '"' is the CSV quote character.
        if self.csv_delimiter == '"' {
            return Err(EngineError::ConfigError(
                "csv_delimiter must not be the quote character '\"'".to_string(),
            ));
        }
        self.number_format
            .validate()
            .map_err(|e| EngineError::ConfigError(format!("number_format: {}", e)))?;
        Ok(())
    }

    fn default_document() -> Result<Value, EngineError> {
        serde_json::from_str(DEFAULT_CONFIG)
            .map_err(|e| EngineError::ConfigError(format!("Embedded default config is invalid: {}", e)))
    }

    fn from_value(document: Value) -> Result<Self, EngineError> {
        let settings: EngineSettings = serde_json::from_value(document)
            .map_err(|e| EngineError::ConfigError(format!("Invalid configuration: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }
}

fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.entry(key) {
                    Entry::Occupied(mut existing) => merge_json(existing.get_mut(), value),
                    Entry::Vacant(slot) => {
                        slot.insert(value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
