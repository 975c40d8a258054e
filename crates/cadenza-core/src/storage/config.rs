use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kernel::constants;
use crate::storage::error::{StorageResult, StorageSystemError};
use crate::storage::tree::ConfigMap;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    /// Whether the format can hold the settings tree (which may contain nulls).
    pub fn supports_tree(&self) -> bool {
        match self {
            ConfigFormat::Json => true,
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => true,
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => false,
        }
    }

    /// Serialize the whole settings tree.
    pub fn serialize_tree(&self, tree: &ConfigMap) -> StorageResult<String> {
        self.serialize(tree)
    }

    /// Parse a settings tree; the document root must be a mapping.
    pub fn parse_tree(&self, data: &str) -> StorageResult<ConfigMap> {
        match self.deserialize::<Value>(data)? {
            Value::Object(map) => Ok(map),
            other => Err(StorageSystemError::InvalidRoot {
                found: value_kind(&other).to_string(),
            }),
        }
    }

    /// Serialize any value in this format
    pub fn serialize<T: Serialize>(&self, value: &T) -> StorageResult<String> {
        let ser_err = |format: &str, e: Box<dyn std::error::Error + Send + Sync>| {
            StorageSystemError::SerializationError { format: format.to_string(), source: e }
        };
        match self {
            ConfigFormat::Json => {
                serde_json::to_string_pretty(value).map_err(|e| ser_err("json", Box::new(e)))
            }
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(value).map_err(|e| ser_err("yaml", Box::new(e))),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => {
                toml::to_string_pretty(value).map_err(|e| ser_err("toml", Box::new(e)))
            }
        }
    }

    /// Deserialize any value from this format
    pub fn deserialize<T: DeserializeOwned>(&self, data: &str) -> StorageResult<T> {
        let de_err = |format: &str, e: Box<dyn std::error::Error + Send + Sync>| {
            StorageSystemError::DeserializationError { format: format.to_string(), source: e }
        };
        match self {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| de_err("json", Box::new(e))),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| de_err("yaml", Box::new(e))),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| de_err("toml", Box::new(e))),
        }
    }
}

impl Default for ConfigFormat {
    fn default() -> Self {
        ConfigFormat::Json
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Settings of the store itself: where the tree lives and how it is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory holding the settings file and its backup
    pub storage_dir: PathBuf,
    /// File name of the settings tree inside `storage_dir`
    pub file_name: String,
    /// Debounce delay, in seconds, between the last write and the save
    pub save_delay_secs: f64,
    /// Serialization format of the settings tree
    pub format: ConfigFormat,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("."),
            file_name: constants::SETTINGS_FILE_NAME.to_string(),
            save_delay_secs: constants::DEFAULT_SAVE_DELAY.as_secs_f64(),
            format: ConfigFormat::Json,
        }
    }
}

impl StoreSettings {
    /// Default settings rooted at `storage_dir`
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self { storage_dir: storage_dir.into(), ..Self::default() }
    }

    /// Load settings from a JSON, YAML or TOML file, chosen by extension.
    pub fn from_file(path: &Path) -> StorageResult<Self> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| StorageSystemError::UnsupportedConfigFormat(path.display().to_string()))?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageSystemError::FileNotFound(path.to_path_buf())
            } else {
                StorageSystemError::io(e, "read_settings", path.to_path_buf())
            }
        })?;
        let settings: StoreSettings = format.deserialize(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> StorageResult<()> {
        if !self.format.supports_tree() {
            return Err(StorageSystemError::UnsupportedConfigFormat(format!(
                "{} cannot hold the settings tree",
                self.format.extension()
            )));
        }
        if let Err(e) = Duration::try_from_secs_f64(self.save_delay_secs) {
            return Err(StorageSystemError::InvalidSettings(format!(
                "invalid save delay {}: {}",
                self.save_delay_secs, e
            )));
        }
        if self.file_name.is_empty() {
            return Err(StorageSystemError::InvalidSettings("empty settings file name".to_string()));
        }
        Ok(())
    }

    /// Debounce delay; settings that fail [`Self::validate`] get the default.
    pub fn save_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.save_delay_secs).unwrap_or_else(|e| {
            log::warn!("Invalid save delay {}: {}; using the default", self.save_delay_secs, e);
            constants::DEFAULT_SAVE_DELAY
        })
    }

    /// Absolute location of the settings file
    pub fn settings_path(&self) -> PathBuf {
        self.storage_dir.join(&self.file_name)
    }
}
