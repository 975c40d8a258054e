use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kernel::constants::CONF_LOG_LEVEL;
use crate::provider::error::EntryValidationError;

/// Data type of a config entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntryType {
    Boolean,
    String,
    /// A string stored encrypted at rest and masked in events
    SecureString,
    Integer,
    Float,
    /// Display-only text; never stored
    Label,
    /// Button that triggers a resolver action; never stored
    Action,
}

impl ConfigEntryType {
    /// Entries that exist only for display and carry no stored value
    pub fn is_ui_only(&self) -> bool {
        matches!(self, ConfigEntryType::Label | ConfigEntryType::Action)
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ConfigEntryType::Boolean => value.is_boolean(),
            ConfigEntryType::String | ConfigEntryType::SecureString => value.is_string(),
            ConfigEntryType::Integer => value.is_i64() || value.is_u64(),
            ConfigEntryType::Float => value.is_number(),
            ConfigEntryType::Label | ConfigEntryType::Action => true,
        }
    }
}

/// One selectable value of an entry with a fixed set of options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigValueOption {
    pub title: String,
    pub value: Value,
}

impl ConfigValueOption {
    pub fn new(title: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Typed descriptor of a single configurable option, optionally carrying
/// its current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    #[serde(rename = "type")]
    pub entry_type: ConfigEntryType,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ConfigValueOption>,
    /// Inclusive numeric bounds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
    #[serde(default)]
    pub multi_value: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl ConfigEntry {
    pub fn new(key: impl Into<String>, entry_type: ConfigEntryType, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entry_type,
            label: label.into(),
            default_value: None,
            required: true,
            options: Vec::new(),
            range: None,
            multi_value: false,
            hidden: false,
            description: None,
            value: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_options(mut self, options: Vec<ConfigValueOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn multi_value(mut self) -> Self {
        self.multi_value = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_secure(&self) -> bool {
        self.entry_type == ConfigEntryType::SecureString
    }

    /// Stored value, falling back to the schema default.
    pub fn current_value(&self) -> Option<&Value> {
        self.value
            .as_ref()
            .filter(|value| !value.is_null())
            .or(self.default_value.as_ref())
            .filter(|value| !value.is_null())
    }

    /// Check the current value against type, options and range.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.entry_type.is_ui_only() {
            return Ok(());
        }
        let Some(value) = self.current_value() else {
            if self.required {
                return Err(EntryValidationError::new(&self.key, "a value is required"));
            }
            return Ok(());
        };
        if self.multi_value {
            let Some(items) = value.as_array() else {
                return Err(EntryValidationError::new(&self.key, "expected a list of values"));
            };
            return items.iter().try_for_each(|item| self.validate_single(item));
        }
        self.validate_single(value)
    }

    fn validate_single(&self, value: &Value) -> Result<(), EntryValidationError> {
        if !self.entry_type.accepts(value) {
            return Err(EntryValidationError::new(
                &self.key,
                format!("expected a {:?} value, got {}", self.entry_type, value),
            ));
        }
        if !self.options.is_empty() && !self.options.iter().any(|option| &option.value == value) {
            return Err(EntryValidationError::new(&self.key, format!("{} is not one of the allowed options", value)));
        }
        if let (Some((min, max)), Some(number)) = (self.range, value.as_f64()) {
            if number < min || number > max {
                return Err(EntryValidationError::new(
                    &self.key,
                    format!("{} is outside the range {}..={}", number, min, max),
                ));
            }
        }
        Ok(())
    }
}

/// The `log_level` entry appended to every provider and core module schema.
pub fn log_level_entry() -> ConfigEntry {
    ConfigEntry::new(CONF_LOG_LEVEL, ConfigEntryType::String, "Log level")
        .with_default("GLOBAL")
        .with_options(
            ["global", "info", "warning", "error", "debug"]
                .into_iter()
                .map(|level| ConfigValueOption::new(level, level.to_uppercase()))
                .collect(),
        )
        .with_description("Log level for this component; GLOBAL follows the application setting.")
}
