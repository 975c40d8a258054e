use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::error::{ConfigError, ConfigResult};
use crate::crypto::SecretCipher;
use crate::kernel::constants::SECURE_STRING_SUBSTITUTE;
use crate::provider::entries::ConfigEntry;
use crate::provider::manifest::ProviderType;
use crate::storage::tree::ConfigMap;

/// Keys of changed values, `values/<key>` for schema entries.
pub type ChangedKeys = BTreeSet<String>;

/// Schema entries of one entity together with their current values.
///
/// Entries keep the resolver's order. Secure strings are held decrypted in
/// memory, encrypted by [`ConfigValues::to_raw`] and masked by
/// [`ConfigValues::masked`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfigValues {
    entries: Vec<ConfigEntry>,
}

impl ConfigValues {
    /// Fill `entries` with the stored raw values of `owner`.
    ///
    /// A secret that fails to decrypt is logged and left unset.
    pub fn parse(mut entries: Vec<ConfigEntry>, raw: &ConfigMap, cipher: &SecretCipher, owner: &str) -> Self {
        for entry in &mut entries {
            entry.value = None;
            if entry.entry_type.is_ui_only() {
                continue;
            }
            let Some(value) = raw.get(&entry.key).filter(|value| !value.is_null()) else {
                continue;
            };
            entry.value = match (entry.is_secure(), value) {
                (true, Value::String(secret)) => match cipher.decrypt(secret) {
                    Ok(plain) => Some(Value::String(plain)),
                    Err(e) => {
                        log::warn!("Could not decrypt '{}' of {}: {}", entry.key, owner, e);
                        None
                    }
                },
                _ => Some(value.clone()),
            };
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&ConfigEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Stored value or schema default of `key`
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(ConfigEntry::current_value)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set a single value. Returns whether it changed.
    ///
    /// Unknown keys and display-only entries are ignored; a secure entry
    /// receiving the masking placeholder keeps its stored secret.
    pub fn update(&mut self, key: &str, value: &Value) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.key == key) else {
            return false;
        };
        if entry.entry_type.is_ui_only() {
            return false;
        }
        if entry.is_secure() && value.as_str() == Some(SECURE_STRING_SUBSTITUTE) {
            return false;
        }
        let new_value = Some(value.clone()).filter(|value| !value.is_null());
        if entry.value == new_value || (new_value.is_some() && entry.current_value() == new_value.as_ref()) {
            return false;
        }
        entry.value = new_value;
        true
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for entry in &self.entries {
            entry.validate()?;
        }
        Ok(())
    }

    /// Stored form: values differing from their default, secrets encrypted.
    pub fn to_raw(&self, cipher: &SecretCipher) -> ConfigResult<ConfigMap> {
        let mut raw = ConfigMap::new();
        for entry in &self.entries {
            if entry.entry_type.is_ui_only() {
                continue;
            }
            let Some(value) = entry.value.as_ref() else {
                continue;
            };
            if entry.default_value.as_ref() == Some(value) {
                continue;
            }
            let value = match (entry.is_secure(), value) {
                (true, Value::String(secret)) => Value::String(cipher.encrypt(secret)?),
                _ => value.clone(),
            };
            raw.insert(entry.key.clone(), value);
        }
        Ok(raw)
    }

    /// Display form: current values with secrets replaced by the placeholder.
    pub fn masked(&self) -> ConfigMap {
        self.entries
            .iter()
            .filter(|entry| !entry.entry_type.is_ui_only())
            .filter_map(|entry| {
                let value = entry.current_value()?;
                let value = if entry.is_secure() {
                    Value::String(SECURE_STRING_SUBSTITUTE.to_string())
                } else {
                    value.clone()
                };
                Some((entry.key.clone(), value))
            })
            .collect()
    }

    /// Apply the schema-keyed part of `changes`, recording `values/<key>`.
    fn apply(&mut self, changes: &ConfigMap, root_keys: &[&str], changed: &mut ChangedKeys) {
        for (key, value) in changes {
            if root_keys.contains(&key.as_str()) {
                continue;
            }
            if self.update(key, value) {
                changed.insert(format!("values/{}", key));
            }
        }
    }
}

fn default_true() -> bool {
    true
}

fn parse_raw<T: serde::de::DeserializeOwned>(raw: &Value, what: &str) -> ConfigResult<T> {
    serde_json::from_value(raw.clone()).map_err(|e| ConfigError::InvalidConfig(format!("malformed {} config: {}", what, e)))
}

fn update_enabled(current: &mut bool, changes: &ConfigMap, changed: &mut ChangedKeys) -> ConfigResult<()> {
    let Some(value) = changes.get("enabled") else {
        return Ok(());
    };
    let enabled = value
        .as_bool()
        .ok_or_else(|| ConfigError::InvalidConfig(format!("'enabled' must be a boolean, got {}", value)))?;
    if *current != enabled {
        *current = enabled;
        changed.insert("enabled".to_string());
    }
    Ok(())
}

fn update_name(current: &mut Option<String>, changes: &ConfigMap, changed: &mut ChangedKeys) -> ConfigResult<()> {
    let Some(value) = changes.get("name") else {
        return Ok(());
    };
    let name = match value {
        Value::Null => None,
        Value::String(name) if name.is_empty() => None,
        Value::String(name) => Some(name.clone()),
        other => return Err(ConfigError::InvalidConfig(format!("'name' must be a string, got {}", other))),
    };
    if *current != name {
        *current = name;
        changed.insert("name".to_string());
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct RawProviderConfig {
    #[serde(rename = "type")]
    provider_type: ProviderType,
    domain: String,
    instance_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    default_name: Option<String>,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
    #[serde(default)]
    values: ConfigMap,
}

/// Configuration of one provider instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub domain: String,
    pub instance_id: String,
    pub name: Option<String>,
    pub default_name: Option<String>,
    pub enabled: bool,
    pub last_error: Option<String>,
    pub values: ConfigValues,
}

impl ProviderConfig {
    /// Parse the stored form, filling `entries` with its values.
    pub fn from_raw(raw: &Value, entries: Vec<ConfigEntry>, cipher: &SecretCipher) -> ConfigResult<Self> {
        let raw: RawProviderConfig = parse_raw(raw, "provider")?;
        let values = ConfigValues::parse(entries, &raw.values, cipher, &raw.instance_id);
        Ok(Self {
            provider_type: raw.provider_type,
            domain: raw.domain,
            instance_id: raw.instance_id,
            name: raw.name,
            default_name: raw.default_name,
            enabled: raw.enabled,
            last_error: raw.last_error,
            values,
        })
    }

    pub fn to_raw(&self, cipher: &SecretCipher) -> ConfigResult<Value> {
        let raw = RawProviderConfig {
            provider_type: self.provider_type,
            domain: self.domain.clone(),
            instance_id: self.instance_id.clone(),
            name: self.name.clone(),
            default_name: self.default_name.clone(),
            enabled: self.enabled,
            last_error: self.last_error.clone(),
            values: self.values.to_raw(cipher)?,
        };
        serde_json::to_value(raw).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    /// Merge `changes` (`enabled`, `name` and schema values). Returns the changed keys.
    pub fn update(&mut self, changes: &ConfigMap) -> ConfigResult<ChangedKeys> {
        let mut changed = ChangedKeys::new();
        update_enabled(&mut self.enabled, changes, &mut changed)?;
        update_name(&mut self.name, changes, &mut changed)?;
        self.values.apply(changes, &["enabled", "name"], &mut changed);
        Ok(changed)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.values.validate()
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.default_name.as_deref())
            .unwrap_or(&self.instance_id)
    }

    /// JSON view with secrets masked, as handed to events and displays
    pub fn to_display(&self) -> Value {
        serde_json::json!({
            "type": self.provider_type,
            "domain": self.domain,
            "instance_id": self.instance_id,
            "name": self.name,
            "default_name": self.default_name,
            "enabled": self.enabled,
            "last_error": self.last_error,
            "values": self.values.masked(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawPlayerConfig {
    provider: String,
    player_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    default_name: Option<String>,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_true")]
    available: bool,
    #[serde(default)]
    values: ConfigMap,
}

/// Configuration of one player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// Instance id of the provider controlling the player
    pub provider: String,
    pub player_id: String,
    pub name: Option<String>,
    pub default_name: Option<String>,
    pub enabled: bool,
    pub available: bool,
    pub values: ConfigValues,
}

impl PlayerConfig {
    /// A fresh config with the given raw values stored as-is
    pub fn new_raw(player_id: &str, provider: &str, name: &str, enabled: bool, values: ConfigMap) -> Value {
        serde_json::json!({
            "provider": provider,
            "player_id": player_id,
            "name": null,
            "default_name": Some(name).filter(|name| !name.is_empty()),
            "enabled": enabled,
            "available": true,
            "values": values,
        })
    }

    pub fn from_raw(raw: &Value, entries: Vec<ConfigEntry>, cipher: &SecretCipher) -> ConfigResult<Self> {
        let raw: RawPlayerConfig = parse_raw(raw, "player")?;
        let values = ConfigValues::parse(entries, &raw.values, cipher, &raw.player_id);
        Ok(Self {
            provider: raw.provider,
            player_id: raw.player_id,
            name: raw.name,
            default_name: raw.default_name,
            enabled: raw.enabled,
            available: raw.available,
            values,
        })
    }

    pub fn to_raw(&self, cipher: &SecretCipher) -> ConfigResult<Value> {
        let raw = RawPlayerConfig {
            provider: self.provider.clone(),
            player_id: self.player_id.clone(),
            name: self.name.clone(),
            default_name: self.default_name.clone(),
            enabled: self.enabled,
            available: self.available,
            values: self.values.to_raw(cipher)?,
        };
        serde_json::to_value(raw).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    pub fn update(&mut self, changes: &ConfigMap) -> ConfigResult<ChangedKeys> {
        let mut changed = ChangedKeys::new();
        update_enabled(&mut self.enabled, changes, &mut changed)?;
        update_name(&mut self.name, changes, &mut changed)?;
        self.values.apply(changes, &["enabled", "name"], &mut changed);
        Ok(changed)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.values.validate()
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.default_name.as_deref())
            .unwrap_or(&self.player_id)
    }

    pub fn to_display(&self) -> Value {
        serde_json::json!({
            "provider": self.provider,
            "player_id": self.player_id,
            "name": self.name,
            "default_name": self.default_name,
            "enabled": self.enabled,
            "available": self.available,
            "values": self.values.masked(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawCoreConfig {
    domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
    #[serde(default)]
    values: ConfigMap,
}

/// Configuration of one core module.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    pub domain: String,
    pub last_error: Option<String>,
    pub values: ConfigValues,
}

impl CoreConfig {
    /// Stored form of an empty config for `domain`
    pub fn empty_raw(domain: &str) -> Value {
        serde_json::json!({ "domain": domain, "values": {} })
    }

    pub fn from_raw(raw: &Value, entries: Vec<ConfigEntry>, cipher: &SecretCipher) -> ConfigResult<Self> {
        let raw: RawCoreConfig = parse_raw(raw, "core")?;
        let values = ConfigValues::parse(entries, &raw.values, cipher, &raw.domain);
        Ok(Self {
            domain: raw.domain,
            last_error: raw.last_error,
            values,
        })
    }

    pub fn to_raw(&self, cipher: &SecretCipher) -> ConfigResult<Value> {
        let raw = RawCoreConfig {
            domain: self.domain.clone(),
            last_error: self.last_error.clone(),
            values: self.values.to_raw(cipher)?,
        };
        serde_json::to_value(raw).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    pub fn update(&mut self, changes: &ConfigMap) -> ChangedKeys {
        let mut changed = ChangedKeys::new();
        self.values.apply(changes, &[], &mut changed);
        changed
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.values.validate()
    }

    pub fn to_display(&self) -> Value {
        serde_json::json!({
            "domain": self.domain,
            "last_error": self.last_error,
            "values": self.values.masked(),
        })
    }
}
