use std::fmt;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::config::dsp::{DspConfig, DspFilter};
use crate::config::error::{ConfigError, ConfigResult, EntityKind};
use crate::config::models::{CoreConfig, PlayerConfig, ProviderConfig};
use crate::crypto::SecretCipher;
use crate::event::{ConfigEvent, EventManager};
use crate::kernel::constants::{
    BASE_KEYS, CONFIGURABLE_CORE_MODULES, CONF_CORE, CONF_DEPRECATED_EQ_BASS, CONF_DEPRECATED_EQ_MID,
    CONF_DEPRECATED_EQ_TREBLE, CONF_LOG_LEVEL, CONF_ONBOARD_DONE, CONF_PLAYERS, CONF_PLAYER_DSP, CONF_PROVIDERS,
    INSTANCE_SUFFIX_LEN,
};
use crate::provider::entries::{log_level_entry, ConfigEntry};
use crate::provider::host::RuntimeHooks;
use crate::provider::manifest::{ManifestRegistry, ProviderType};
use crate::provider::resolver::{ConfigEntryResolver, EntryRequest, EntryScope};
use crate::storage::store::ConfigStore;
use crate::storage::tree::ConfigMap;

const DEPRECATED_EQ_KEYS: [&str; 3] = [CONF_DEPRECATED_EQ_BASS, CONF_DEPRECATED_EQ_MID, CONF_DEPRECATED_EQ_TREBLE];

fn provider_path(instance_id: &str) -> String {
    format!("{}/{}", CONF_PROVIDERS, instance_id)
}

fn player_path(player_id: &str) -> String {
    format!("{}/{}", CONF_PLAYERS, player_id)
}

fn dsp_path(player_id: &str) -> String {
    format!("{}/{}", CONF_PLAYER_DSP, player_id)
}

fn core_path(domain: &str) -> String {
    format!("{}/{}", CONF_CORE, domain)
}

/// Path of a raw value below an entity: base keys live on the entity itself.
fn raw_key_path(base: &str, key: &str) -> String {
    if BASE_KEYS.contains(&key) {
        format!("{}/{}", base, key)
    } else {
        format!("{}/values/{}", base, key)
    }
}

fn str_field<'a>(raw: &'a Value, field: &str) -> Option<&'a str> {
    raw.get(field).and_then(Value::as_str)
}

fn to_json<T: serde::Serialize>(value: &T) -> ConfigResult<Value> {
    serde_json::to_value(value).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
}

/// Creates, updates and removes provider, player, core module and DSP configs.
///
/// Lifecycle operations run one at a time: a second add, update or remove
/// waits until the running one, including its activation call, finished.
/// Reads never wait.
pub struct ConfigController {
    store: ConfigStore,
    cipher: Arc<SecretCipher>,
    manifests: Arc<ManifestRegistry>,
    resolver: Arc<dyn ConfigEntryResolver>,
    hooks: RuntimeHooks,
    events: Arc<dyn EventManager>,
    lifecycle: Mutex<()>,
}

impl fmt::Debug for ConfigController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigController")
            .field("store", &self.store)
            .field("manifests", &self.manifests.len())
            .finish_non_exhaustive()
    }
}

impl ConfigController {
    pub fn new(
        store: ConfigStore,
        cipher: Arc<SecretCipher>,
        manifests: Arc<ManifestRegistry>,
        resolver: Arc<dyn ConfigEntryResolver>,
        hooks: RuntimeHooks,
        events: Arc<dyn EventManager>,
    ) -> Self {
        Self {
            store,
            cipher,
            manifests,
            resolver,
            hooks,
            events,
            lifecycle: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn cipher(&self) -> &SecretCipher {
        &self.cipher
    }

    pub fn manifests(&self) -> &ManifestRegistry {
        &self.manifests
    }

    pub fn hooks(&self) -> &RuntimeHooks {
        &self.hooks
    }

    /// Queue a notification. Lifecycle operations queue while holding the
    /// lifecycle lock and call [`Self::flush_events`] once it is released,
    /// so handlers may call back into the controller.
    async fn emit(&self, event: ConfigEvent) {
        self.events.queue_event(Box::new(event)).await;
    }

    async fn flush_events(&self) {
        // notifications are fire-and-forget
        let processed = self.events.process_queue().await;
        if processed > 0 {
            log::debug!("Dispatched {} config events", processed);
        }
    }

    /// Mapping below a top-level section, empty when absent
    fn raw_section(&self, section: &str) -> ConfigMap {
        match self.store.get_opt(section) {
            Some(Value::Object(map)) => map,
            _ => ConfigMap::new(),
        }
    }

    fn raw_values(&self, base: &str) -> ConfigMap {
        match self.store.get_opt(&format!("{}/values", base)) {
            Some(Value::Object(map)) => map,
            _ => ConfigMap::new(),
        }
    }

    /// Raw value below `base`, preferring `values/<key>` over `<key>`
    fn raw_value(&self, base: &str, key: &str, default: Value) -> Value {
        self.store
            .get_opt(&format!("{}/values/{}", base, key))
            .or_else(|| self.store.get_opt(&format!("{}/{}", base, key)))
            .unwrap_or(default)
    }

    async fn resolve(&self, request: EntryRequest, with_log_level: bool) -> ConfigResult<Vec<ConfigEntry>> {
        let mut entries = self
            .resolver
            .get_entries(&request)
            .await
            .map_err(|source| ConfigError::Resolver {
                scope: request.scope.to_string(),
                source,
            })?;
        if with_log_level && !entries.iter().any(|entry| entry.key == CONF_LOG_LEVEL) {
            entries.push(log_level_entry());
        }
        Ok(entries)
    }

    fn instance_ids_of(&self, domain: &str) -> Vec<String> {
        self.raw_section(CONF_PROVIDERS)
            .into_iter()
            .filter(|(_, raw)| str_field(raw, "domain") == Some(domain))
            .map(|(instance_id, _)| instance_id)
            .collect()
    }

    fn allocate_instance_id(&self, domain: &str, multi_instance: bool) -> String {
        if !multi_instance {
            return domain.to_string();
        }
        loop {
            let suffix: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(INSTANCE_SUFFIX_LEN)
                .map(char::from)
                .collect();
            let instance_id = format!("{}--{}", domain, suffix);
            if !self.store.contains(&provider_path(&instance_id)) {
                return instance_id;
            }
        }
    }

    async fn deactivate(&self, instance_id: &str, is_removed: bool) {
        if let Err(e) = self.hooks.providers.deactivate(instance_id, is_removed).await {
            log::warn!("Failed to unload provider '{}': {}", instance_id, e);
        }
    }

    // --- Providers ---

    /// All provider configs, optionally filtered. Configs of domains without
    /// a manifest are skipped.
    pub async fn get_provider_configs(
        &self,
        provider_type: Option<ProviderType>,
        domain: Option<&str>,
        include_values: bool,
    ) -> ConfigResult<Vec<ProviderConfig>> {
        let mut configs = Vec::new();
        for (instance_id, raw) in self.raw_section(CONF_PROVIDERS) {
            let Some(raw_domain) = str_field(&raw, "domain") else {
                continue;
            };
            if !self.manifests.contains(raw_domain) || domain.is_some_and(|domain| domain != raw_domain) {
                continue;
            }
            let config = match ProviderConfig::from_raw(&raw, Vec::new(), &self.cipher) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Skipping provider config '{}': {}", instance_id, e);
                    continue;
                }
            };
            if provider_type.is_some_and(|provider_type| provider_type != config.provider_type) {
                continue;
            }
            if include_values {
                configs.push(self.get_provider_config(&instance_id).await?);
            } else {
                configs.push(config);
            }
        }
        Ok(configs)
    }

    pub async fn get_provider_config(&self, instance_id: &str) -> ConfigResult<ProviderConfig> {
        let raw = self
            .store
            .get_opt(&provider_path(instance_id))
            .ok_or_else(|| ConfigError::not_found(EntityKind::Provider, instance_id))?;
        let domain = str_field(&raw, "domain")
            .ok_or_else(|| ConfigError::InvalidConfig(format!("provider config '{}' has no domain", instance_id)))?;
        let values = raw.get("values").and_then(Value::as_object).cloned().unwrap_or_default();
        let entries = self
            .get_provider_config_entries(domain, Some(instance_id), None, Some(values))
            .await?;
        ProviderConfig::from_raw(&raw, entries, &self.cipher)
    }

    /// Stored value or schema default of a provider entry, cached until the
    /// next write.
    pub async fn get_provider_config_value(&self, instance_id: &str, key: &str) -> ConfigResult<Option<Value>> {
        if let Some(value) = self.store.cache().get(instance_id, key) {
            return Ok(Some(value));
        }
        // a write while the resolver runs makes this value stale
        let generation = self.store.cache().generation();
        let config = self.get_provider_config(instance_id).await?;
        let value = config.values.value(key).cloned();
        if let Some(value) = &value {
            self.store.cache().insert(generation, instance_id, key, value.clone());
        }
        Ok(value)
    }

    pub async fn get_provider_config_value_or(&self, instance_id: &str, key: &str, fallback: Value) -> ConfigResult<Value> {
        Ok(self
            .get_provider_config_value(instance_id, key)
            .await?
            .unwrap_or(fallback))
    }

    /// Entries to set up or edit a provider, followed by the `log_level` entry.
    ///
    /// Without `values` the stored values of `instance_id` are passed to the
    /// resolver.
    pub async fn get_provider_config_entries(
        &self,
        domain: &str,
        instance_id: Option<&str>,
        action: Option<&str>,
        values: Option<ConfigMap>,
    ) -> ConfigResult<Vec<ConfigEntry>> {
        self.manifests.require(domain)?;
        let values = values
            .or_else(|| instance_id.map(|instance_id| self.raw_values(&provider_path(instance_id))))
            .unwrap_or_default();
        let scope = EntryScope::Provider {
            domain: domain.to_string(),
            instance_id: instance_id.map(str::to_string),
        };
        let request = EntryRequest::new(scope, values).with_action(action.map(str::to_string));
        self.resolve(request, true).await
    }

    /// Add a new instance of `domain` (no `instance_id`) or update an existing
    /// one, then mark onboarding as done.
    pub async fn save_provider_config(
        &self,
        domain: &str,
        values: ConfigMap,
        instance_id: Option<&str>,
    ) -> ConfigResult<ProviderConfig> {
        let result = {
            let _guard = self.lifecycle.lock().await;
            match instance_id {
                Some(instance_id) => self.update_provider_locked(instance_id, values).await,
                None => self.add_provider_locked(domain, values).await,
            }
        };
        self.flush_events().await;
        let config = result?;
        if self.store.get_opt(CONF_ONBOARD_DONE) != Some(Value::Bool(true)) {
            self.store.set(CONF_ONBOARD_DONE, Value::Bool(true));
        }
        self.get_provider_config(&config.instance_id).await
    }

    pub async fn add_provider_config(&self, domain: &str, values: ConfigMap) -> ConfigResult<ProviderConfig> {
        let result = {
            let _guard = self.lifecycle.lock().await;
            self.add_provider_locked(domain, values).await
        };
        self.flush_events().await;
        result
    }

    pub async fn update_provider_config(&self, instance_id: &str, values: ConfigMap) -> ConfigResult<ProviderConfig> {
        let result = {
            let _guard = self.lifecycle.lock().await;
            self.update_provider_locked(instance_id, values).await
        };
        self.flush_events().await;
        result
    }

    pub async fn remove_provider_config(&self, instance_id: &str) -> ConfigResult<()> {
        let result = {
            let _guard = self.lifecycle.lock().await;
            self.remove_provider_locked(instance_id).await
        };
        self.flush_events().await;
        result
    }

    async fn add_provider_locked(&self, domain: &str, values: ConfigMap) -> ConfigResult<ProviderConfig> {
        let manifest = self.manifests.require(domain)?;
        if let Some(depends_on) = manifest.depends_on.as_deref() {
            let loaded = self.hooks.providers.loaded_instances();
            if !loaded.iter().any(|provider| provider.domain == depends_on) {
                return Err(ConfigError::DependencyUnmet {
                    domain: domain.to_string(),
                    depends_on: depends_on.to_string(),
                });
            }
        }
        if !manifest.multi_instance && !self.instance_ids_of(domain).is_empty() {
            return Err(ConfigError::MultiInstanceForbidden(domain.to_string()));
        }
        let instance_id = self.allocate_instance_id(domain, manifest.multi_instance);
        let entries = self
            .get_provider_config_entries(domain, Some(&instance_id), None, Some(values.clone()))
            .await?;
        let raw = json!({
            "type": manifest.provider_type,
            "domain": domain,
            "instance_id": instance_id,
            "default_name": manifest.name,
            "enabled": manifest.enabled_by_default,
            "values": {},
        });
        let mut config = ProviderConfig::from_raw(&raw, entries, &self.cipher)?;
        config.update(&values)?;
        config.validate()?;

        let path = provider_path(&instance_id);
        self.store.set(&path, config.to_raw(&self.cipher)?);
        if config.enabled {
            if let Err(source) = self.hooks.providers.activate(&config).await {
                log::error!("Provider '{}' failed to load, discarding its config: {}", instance_id, source);
                self.store.remove(&path);
                return Err(ConfigError::ActivationFailed { instance_id, source });
            }
            if config.provider_type == ProviderType::Music {
                self.hooks.library.start_sync(&instance_id);
            }
        }
        log::info!("Added provider '{}' (enabled: {})", instance_id, config.enabled);
        self.emit(ConfigEvent::ProviderConfigSaved {
            instance_id,
            config: config.to_display(),
        })
        .await;
        Ok(config)
    }

    async fn update_provider_locked(&self, instance_id: &str, values: ConfigMap) -> ConfigResult<ProviderConfig> {
        let mut config = self.get_provider_config(instance_id).await?;
        let changed = config.update(&values)?;
        let available = self.hooks.providers.is_available(instance_id);
        if changed.is_empty() && config.enabled == available {
            log::debug!("Provider '{}' unchanged", instance_id);
            return Ok(config);
        }
        config.validate()?;
        let manifest = self.manifests.require(&config.domain)?;
        if !config.enabled && !manifest.allow_disable {
            return Err(ConfigError::DisableNotAllowed(instance_id.to_string()));
        }
        config.last_error = None;
        let path = provider_path(instance_id);
        self.store.set(&path, config.to_raw(&self.cipher)?);

        if config.enabled {
            if let Err(source) = self.hooks.providers.activate(&config).await {
                log::error!("Provider '{}' failed to load: {}", instance_id, source);
                self.store.set(&format!("{}/last_error", path), Value::String(source.to_string()));
                return Err(ConfigError::ActivationFailed {
                    instance_id: instance_id.to_string(),
                    source,
                });
            }
        } else {
            for loaded in self.hooks.providers.loaded_instances() {
                let depends_on = self
                    .manifests
                    .get(&loaded.domain)
                    .and_then(|manifest| manifest.depends_on.as_deref());
                if loaded.instance_id != instance_id && depends_on == Some(config.domain.as_str()) {
                    log::info!("Unloading '{}', which depends on '{}'", loaded.instance_id, config.domain);
                    self.deactivate(&loaded.instance_id, false).await;
                }
            }
            self.deactivate(instance_id, false).await;
            if config.provider_type == ProviderType::Player {
                for player in self.hooks.players.players_for_provider(instance_id) {
                    self.hooks.players.unregister_player(&player.player_id);
                }
            }
        }
        log::info!("Updated provider '{}' (enabled: {})", instance_id, config.enabled);
        self.emit(ConfigEvent::ProviderConfigSaved {
            instance_id: instance_id.to_string(),
            config: config.to_display(),
        })
        .await;
        Ok(config)
    }

    async fn remove_provider_locked(&self, instance_id: &str) -> ConfigResult<()> {
        let path = provider_path(instance_id);
        let raw = self
            .store
            .get_opt(&path)
            .ok_or_else(|| ConfigError::not_found(EntityKind::Provider, instance_id))?;
        let builtin = str_field(&raw, "domain")
            .and_then(|domain| self.manifests.get(domain))
            .is_some_and(|manifest| manifest.builtin);
        if builtin {
            return Err(ConfigError::RemovalForbidden(format!("Builtin provider '{}'", instance_id)));
        }
        self.store.remove(&path);
        self.deactivate(instance_id, true).await;

        let provider_type = raw
            .get("type")
            .cloned()
            .and_then(|value| serde_json::from_value::<ProviderType>(value).ok());
        match provider_type {
            Some(ProviderType::Music) => {
                if let Err(e) = self.hooks.library.cleanup_provider(instance_id).await {
                    log::warn!("Library cleanup of '{}' failed: {}", instance_id, e);
                }
            }
            Some(ProviderType::Player) => {
                for player in self.hooks.players.players_for_provider(instance_id) {
                    self.hooks.players.unregister_player(&player.player_id);
                }
                self.remove_player_configs_of(instance_id);
            }
            _ => {}
        }
        log::info!("Removed provider '{}'", instance_id);
        self.emit(ConfigEvent::ProviderConfigRemoved {
            instance_id: instance_id.to_string(),
        })
        .await;
        Ok(())
    }

    /// Drop the player and DSP configs of every player owned by `instance_id`.
    fn remove_player_configs_of(&self, instance_id: &str) {
        self.store.mutate(|tree| {
            let player_ids: Vec<String> = tree
                .get(CONF_PLAYERS)
                .and_then(Value::as_object)
                .map(|players| {
                    players
                        .iter()
                        .filter(|(_, raw)| str_field(raw, "provider") == Some(instance_id))
                        .map(|(player_id, _)| player_id.clone())
                        .collect()
                })
                .unwrap_or_default();
            let mut changed = false;
            for player_id in &player_ids {
                log::debug!("Removing config of orphaned player '{}'", player_id);
                changed |= tree.remove(&player_path(player_id)).is_some();
                changed |= tree.remove(&dsp_path(player_id)).is_some();
            }
            changed
        });
    }

    /// Reset a single stored provider value to its default.
    pub fn remove_provider_config_value(&self, instance_id: &str, key: &str) -> bool {
        self.store
            .remove(&format!("{}/values/{}", provider_path(instance_id), key))
            .is_some()
    }

    /// Create the config of a built-in provider unless one exists already.
    pub async fn create_builtin_provider_config(&self, domain: &str) -> ConfigResult<()> {
        let _guard = self.lifecycle.lock().await;
        if !self.instance_ids_of(domain).is_empty() {
            return Ok(());
        }
        let manifest = self.manifests.require(domain)?;
        let instance_id = self.allocate_instance_id(domain, manifest.multi_instance);
        let entries = self
            .get_provider_config_entries(domain, None, None, Some(ConfigMap::new()))
            .await?;
        let raw = json!({
            "type": manifest.provider_type,
            "domain": domain,
            "instance_id": instance_id,
            "name": manifest.name,
            "enabled": manifest.enabled_by_default,
            "values": {},
        });
        let config = ProviderConfig::from_raw(&raw, entries, &self.cipher)?;
        config.validate()?;
        self.store.set(&provider_path(&instance_id), config.to_raw(&self.cipher)?);
        log::info!("Created config for builtin provider '{}'", instance_id);
        Ok(())
    }

    /// Activate a provider again with its stored config. A config removed in
    /// the meantime is ignored.
    pub async fn reload_provider(&self, instance_id: &str) -> ConfigResult<()> {
        let config = match self.get_provider_config(instance_id).await {
            Ok(config) => config,
            Err(ConfigError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };
        self.hooks
            .providers
            .activate(&config)
            .await
            .map_err(|source| ConfigError::ActivationFailed {
                instance_id: instance_id.to_string(),
                source,
            })
    }

    /// Stored value without validation or default.
    pub fn get_raw_provider_config_value(&self, instance_id: &str, key: &str, default: Value) -> Value {
        self.raw_value(&provider_path(instance_id), key, default)
    }

    /// Store a value without validation, optionally encrypting it first.
    pub fn set_raw_provider_config_value(&self, instance_id: &str, key: &str, value: Value, encrypted: bool) -> ConfigResult<()> {
        let base = provider_path(instance_id);
        if !self.store.contains(&base) {
            return Err(ConfigError::not_found(EntityKind::Provider, instance_id));
        }
        let value = match (encrypted, value) {
            (true, Value::String(plain)) => Value::String(self.cipher.encrypt(&plain)?),
            (_, value) => value,
        };
        self.store.set(&raw_key_path(&base, key), value);
        Ok(())
    }

    // --- Players ---

    /// Player configs, optionally of one provider instance. With values, only
    /// players of currently loaded providers are returned.
    pub async fn get_player_configs(&self, provider: Option<&str>, include_values: bool) -> ConfigResult<Vec<PlayerConfig>> {
        let mut configs = Vec::new();
        for (player_id, raw) in self.raw_section(CONF_PLAYERS) {
            let raw_provider = str_field(&raw, "provider").unwrap_or_default();
            if provider.is_some_and(|provider| provider != raw_provider) {
                continue;
            }
            if include_values {
                if self.hooks.providers.is_available(raw_provider) {
                    configs.push(self.get_player_config(&player_id).await?);
                }
                continue;
            }
            match PlayerConfig::from_raw(&raw, Vec::new(), &self.cipher) {
                Ok(config) => configs.push(config),
                Err(e) => log::warn!("Skipping player config '{}': {}", player_id, e),
            }
        }
        Ok(configs)
    }

    /// Full player config, merged with the live state of the player.
    pub async fn get_player_config(&self, player_id: &str) -> ConfigResult<PlayerConfig> {
        let mut raw = self
            .store
            .get_opt(&player_path(player_id))
            .ok_or_else(|| ConfigError::not_found(EntityKind::Player, player_id))?;
        let Value::Object(map) = &mut raw else {
            return Err(ConfigError::InvalidConfig(format!("player config '{}' is not a mapping", player_id)));
        };
        match self.hooks.players.player_state(player_id) {
            Some(state) => {
                map.insert("default_name".to_string(), Value::String(state.display_name));
                map.insert("provider".to_string(), Value::String(state.provider));
                map.insert("available".to_string(), Value::Bool(state.available));
            }
            None => {
                map.insert("available".to_string(), Value::Bool(false));
                if map.get("default_name").is_none_or(Value::is_null) {
                    map.insert("default_name".to_string(), Value::String(player_id.to_string()));
                }
            }
        }
        let provider = map.get("provider").and_then(Value::as_str).unwrap_or_default().to_string();
        let values = map.get("values").and_then(Value::as_object).cloned().unwrap_or_default();
        let scope = EntryScope::Player {
            provider,
            player_id: player_id.to_string(),
        };
        let entries = self.resolve(EntryRequest::new(scope, values), false).await?;
        PlayerConfig::from_raw(&raw, entries, &self.cipher)
    }

    pub async fn get_player_config_value(&self, player_id: &str, key: &str) -> ConfigResult<Option<Value>> {
        let config = self.get_player_config(player_id).await?;
        Ok(config.values.value(key).cloned())
    }

    pub async fn get_player_config_value_or(&self, player_id: &str, key: &str, fallback: Value) -> ConfigResult<Value> {
        Ok(self.get_player_config_value(player_id, key).await?.unwrap_or(fallback))
    }

    /// Merge `values` into a player config. The player runtime may veto the
    /// change, in which case nothing is stored.
    pub async fn save_player_config(&self, player_id: &str, values: ConfigMap) -> ConfigResult<PlayerConfig> {
        {
            let _guard = self.lifecycle.lock().await;
            let mut config = self.get_player_config(player_id).await?;
            let changed = config.update(&values)?;
            if changed.is_empty() {
                return Ok(config);
            }
            config.validate()?;
            self.hooks
                .players
                .on_player_config_change(&config, &changed)
                .await
                .map_err(|source| ConfigError::Rejected {
                    operation: format!("Update of player '{}'", player_id),
                    source,
                })?;
            self.store.set(&player_path(player_id), config.to_raw(&self.cipher)?);
            self.hooks.players.refresh_player(player_id);
            log::info!("Updated player '{}': {:?}", player_id, changed);
            self.emit(ConfigEvent::PlayerConfigUpdated {
                player_id: player_id.to_string(),
                config: config.to_display(),
            })
            .await;
        }
        self.flush_events().await;
        self.get_player_config(player_id).await
    }

    /// Remove a player config together with its DSP config.
    ///
    /// Providers that manage their own players remove the player first;
    /// otherwise the config of an active player can not be removed.
    pub async fn remove_player_config(&self, player_id: &str) -> ConfigResult<()> {
        let _guard = self.lifecycle.lock().await;
        let path = player_path(player_id);
        let raw = self
            .store
            .get_opt(&path)
            .ok_or_else(|| ConfigError::not_found(EntityKind::Player, player_id))?;
        let state = self.hooks.players.player_state(player_id);
        let provider = state
            .as_ref()
            .map(|state| state.provider.clone())
            .or_else(|| str_field(&raw, "provider").map(str::to_string))
            .unwrap_or_default();
        if self.hooks.players.supports_player_removal(&provider) {
            self.hooks
                .players
                .remove_player(player_id)
                .await
                .map_err(|source| ConfigError::Rejected {
                    operation: format!("Removal of player '{}'", player_id),
                    source,
                })?;
        } else if state.as_ref().is_some_and(|state| state.available) {
            return Err(ConfigError::ActionUnavailable(format!(
                "can not remove the config of active player '{}'",
                player_id
            )));
        }
        self.hooks.players.unregister_player(player_id);
        self.store.mutate(|tree| {
            let removed = tree.remove(&path).is_some();
            tree.remove(&dsp_path(player_id)).is_some() || removed
        });
        log::info!("Removed player config '{}'", player_id);
        Ok(())
    }

    /// Create the config of a newly registered player unless it exists; an
    /// existing config only gets its default name refreshed.
    pub fn create_default_player_config(
        &self,
        player_id: &str,
        provider: &str,
        name: &str,
        enabled: bool,
        values: Option<ConfigMap>,
    ) {
        let path = player_path(player_id);
        if self.store.contains(&path) {
            let name_path = format!("{}/default_name", path);
            if !name.is_empty() && self.store.get(&name_path, Value::Null).as_str() != Some(name) {
                self.store.set(&name_path, Value::String(name.to_string()));
            }
            return;
        }
        let raw = PlayerConfig::new_raw(player_id, provider, name, enabled, values.unwrap_or_default());
        self.store.set(&path, raw);
        log::debug!("Created default config for player '{}'", player_id);
    }

    pub fn get_raw_player_config_value(&self, player_id: &str, key: &str, default: Value) -> Value {
        self.raw_value(&player_path(player_id), key, default)
    }

    pub fn set_raw_player_config_value(&self, player_id: &str, key: &str, value: Value) -> ConfigResult<()> {
        let base = player_path(player_id);
        if !self.store.contains(&base) {
            return Err(ConfigError::not_found(EntityKind::Player, player_id));
        }
        self.store.set(&raw_key_path(&base, key), value);
        Ok(())
    }

    // --- Core modules ---

    fn require_core_module(domain: &str) -> ConfigResult<()> {
        if CONFIGURABLE_CORE_MODULES.contains(&domain) {
            Ok(())
        } else {
            Err(ConfigError::not_found(EntityKind::CoreModule, domain))
        }
    }

    pub async fn get_core_configs(&self, include_values: bool) -> ConfigResult<Vec<CoreConfig>> {
        let mut configs = Vec::with_capacity(CONFIGURABLE_CORE_MODULES.len());
        for domain in CONFIGURABLE_CORE_MODULES {
            let config = if include_values {
                self.get_core_config(domain).await?
            } else {
                let raw = self.store.get(&core_path(domain), CoreConfig::empty_raw(domain));
                CoreConfig::from_raw(&raw, Vec::new(), &self.cipher)?
            };
            configs.push(config);
        }
        Ok(configs)
    }

    pub async fn get_core_config(&self, domain: &str) -> ConfigResult<CoreConfig> {
        Self::require_core_module(domain)?;
        let raw = self.store.get(&core_path(domain), CoreConfig::empty_raw(domain));
        let entries = self.get_core_config_entries(domain, None, None).await?;
        CoreConfig::from_raw(&raw, entries, &self.cipher)
    }

    pub async fn get_core_config_value(&self, domain: &str, key: &str) -> ConfigResult<Option<Value>> {
        let config = self.get_core_config(domain).await?;
        Ok(config.values.value(key).cloned())
    }

    pub async fn get_core_config_entries(
        &self,
        domain: &str,
        action: Option<&str>,
        values: Option<ConfigMap>,
    ) -> ConfigResult<Vec<ConfigEntry>> {
        Self::require_core_module(domain)?;
        let values = values.unwrap_or_else(|| self.raw_values(&core_path(domain)));
        let scope = EntryScope::Core {
            domain: domain.to_string(),
        };
        let request = EntryRequest::new(scope, values).with_action(action.map(str::to_string));
        self.resolve(request, true).await
    }

    /// Merge `values` into a core module config. The module is reloaded with
    /// the new config before it is stored.
    pub async fn save_core_config(&self, domain: &str, values: ConfigMap) -> ConfigResult<CoreConfig> {
        {
            let _guard = self.lifecycle.lock().await;
            let mut config = self.get_core_config(domain).await?;
            let changed = config.update(&values);
            config.validate()?;
            if changed.is_empty() {
                return Ok(config);
            }
            self.hooks
                .core
                .reload(&config)
                .await
                .map_err(|source| ConfigError::Rejected {
                    operation: format!("Reload of core module '{}'", domain),
                    source,
                })?;
            config.last_error = None;
            self.store.set(&core_path(domain), config.to_raw(&self.cipher)?);
            log::info!("Updated core module '{}': {:?}", domain, changed);
        }
        self.get_core_config(domain).await
    }

    pub fn get_raw_core_config_value(&self, domain: &str, key: &str, default: Value) -> Value {
        self.raw_value(&core_path(domain), key, default)
    }

    /// Store a value without validation, creating the module config if needed.
    pub fn set_raw_core_config_value(&self, domain: &str, key: &str, value: Value) {
        let base = core_path(domain);
        self.store.mutate(|tree| {
            if !tree.contains(&base) {
                tree.set(&base, CoreConfig::empty_raw(domain));
            }
            tree.set(&format!("{}/values/{}", base, key), value);
            true
        });
    }

    // --- DSP ---

    /// Stored DSP config of a player, or a disabled default.
    ///
    /// Players that still carry the flat tone control values get them moved
    /// into a tone control filter; the new DSP config is stored and the old
    /// values are reset.
    pub fn get_player_dsp_config(&self, player_id: &str) -> ConfigResult<DspConfig> {
        let path = dsp_path(player_id);
        // an empty mapping counts as no config at all
        let stored = self
            .store
            .get_opt(&path)
            .filter(|raw| raw.as_object().is_none_or(|map| !map.is_empty()));
        if let Some(raw) = stored {
            return serde_json::from_value(raw)
                .map_err(|e| ConfigError::InvalidConfig(format!("malformed DSP config of '{}': {}", player_id, e)));
        }
        let [bass, mid, treble] = DEPRECATED_EQ_KEYS.map(|key| {
            self.get_raw_player_config_value(player_id, key, json!(0))
                .as_f64()
                .unwrap_or(0.0)
        });
        if bass == 0.0 && mid == 0.0 && treble == 0.0 {
            return Ok(DspConfig::default());
        }
        let config = DspConfig {
            enabled: true,
            filters: vec![DspFilter::tone_control(bass, mid, treble)],
            ..DspConfig::default()
        };
        let raw = to_json(&config)?;
        let player = player_path(player_id);
        self.store.mutate(|tree| {
            for key in DEPRECATED_EQ_KEYS {
                let value_path = format!("{}/values/{}", player, key);
                let stale = tree
                    .get(&value_path)
                    .or_else(|| tree.get(&format!("{}/{}", player, key)))
                    .and_then(Value::as_f64)
                    .is_some_and(|level| level != 0.0);
                if stale {
                    tree.set(&value_path, json!(0));
                }
            }
            tree.set(&path, raw);
            true
        });
        log::info!("Moved deprecated tone settings of player '{}' into its DSP config", player_id);
        Ok(config)
    }

    /// Validate and store a player's DSP config, then let the player runtime
    /// apply it.
    pub async fn save_dsp_config(&self, player_id: &str, config: DspConfig) -> ConfigResult<DspConfig> {
        config.validate()?;
        let raw = to_json(&config)?;
        {
            let _guard = self.lifecycle.lock().await;
            self.store.set(&dsp_path(player_id), raw.clone());
        }
        if let Err(e) = self.hooks.players.on_player_dsp_change(player_id).await {
            log::warn!("Player '{}' could not apply its DSP config: {}", player_id, e);
        }
        self.emit(ConfigEvent::PlayerDspConfigUpdated {
            player_id: player_id.to_string(),
            config: raw,
        })
        .await;
        self.flush_events().await;
        Ok(config)
    }
}
