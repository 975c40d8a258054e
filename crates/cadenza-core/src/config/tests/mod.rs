mod models_tests;

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::models::{ChangedKeys, CoreConfig, PlayerConfig, ProviderConfig};
use crate::config::ConfigController;
use crate::crypto::SecretCipher;
use crate::event::{ConfigEvent, DefaultEventManager, EventResult};
use crate::kernel::error::BoxError;
use crate::provider::{
    ConfigEntry, ConfigEntryResolver, ConfigEntryType, CoreModuleRuntime, LoadedProvider, ManifestBuilder, ManifestRegistry, MusicLibrary,
    PlayerRuntime, PlayerState, ProviderHost, ProviderType, RuntimeHooks, StaticEntryResolver,
};
use crate::storage::ConfigMap;
use crate::test_support::{memory_store, MemoryStorageProvider};

/// Runtime double that records every call and fails on request.
#[derive(Default)]
pub(super) struct MockRuntime {
    loaded: Mutex<BTreeMap<String, String>>,
    activations: Mutex<Vec<String>>,
    deactivations: Mutex<Vec<(String, bool)>>,
    fail_activation: AtomicBool,
    players: Mutex<BTreeMap<String, PlayerState>>,
    removal_providers: Mutex<HashSet<String>>,
    removed_players: Mutex<Vec<String>>,
    unregistered: Mutex<Vec<String>>,
    veto_player_changes: AtomicBool,
    refreshed: Mutex<Vec<String>>,
    dsp_changes: Mutex<Vec<String>>,
    fail_core_reload: AtomicBool,
    core_reloads: Mutex<Vec<String>>,
    cleaned_up: Mutex<Vec<String>>,
    synced: Mutex<Vec<String>>,
}

impl MockRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_activation(&self, fail: bool) {
        self.fail_activation.store(fail, Ordering::SeqCst);
    }

    pub fn set_veto_player_changes(&self, veto: bool) {
        self.veto_player_changes.store(veto, Ordering::SeqCst);
    }

    pub fn set_fail_core_reload(&self, fail: bool) {
        self.fail_core_reload.store(fail, Ordering::SeqCst);
    }

    pub fn add_player(&self, player_id: &str, provider: &str, available: bool) {
        self.players.lock().unwrap().insert(
            player_id.to_string(),
            PlayerState {
                player_id: player_id.to_string(),
                provider: provider.to_string(),
                display_name: format!("Player {}", player_id),
                available,
            },
        );
    }

    pub fn allow_player_removal(&self, provider: &str) {
        self.removal_providers.lock().unwrap().insert(provider.to_string());
    }

    pub fn activations(&self) -> Vec<String> {
        self.activations.lock().unwrap().clone()
    }

    pub fn deactivations(&self) -> Vec<(String, bool)> {
        self.deactivations.lock().unwrap().clone()
    }

    pub fn unregistered(&self) -> Vec<String> {
        self.unregistered.lock().unwrap().clone()
    }

    pub fn removed_players(&self) -> Vec<String> {
        self.removed_players.lock().unwrap().clone()
    }

    pub fn refreshed(&self) -> Vec<String> {
        self.refreshed.lock().unwrap().clone()
    }

    pub fn dsp_changes(&self) -> Vec<String> {
        self.dsp_changes.lock().unwrap().clone()
    }

    pub fn core_reloads(&self) -> Vec<String> {
        self.core_reloads.lock().unwrap().clone()
    }

    pub fn cleaned_up(&self) -> Vec<String> {
        self.cleaned_up.lock().unwrap().clone()
    }

    pub fn synced(&self) -> Vec<String> {
        self.synced.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderHost for MockRuntime {
    async fn activate(&self, config: &ProviderConfig) -> Result<(), BoxError> {
        self.activations.lock().unwrap().push(config.instance_id.clone());
        if self.fail_activation.load(Ordering::SeqCst) {
            return Err("provider refused to start".into());
        }
        self.loaded
            .lock()
            .unwrap()
            .insert(config.instance_id.clone(), config.domain.clone());
        Ok(())
    }

    async fn deactivate(&self, instance_id: &str, is_removed: bool) -> Result<(), BoxError> {
        self.deactivations
            .lock()
            .unwrap()
            .push((instance_id.to_string(), is_removed));
        self.loaded.lock().unwrap().remove(instance_id);
        Ok(())
    }

    fn is_available(&self, instance_id: &str) -> bool {
        self.loaded.lock().unwrap().contains_key(instance_id)
    }

    fn loaded_instances(&self) -> Vec<LoadedProvider> {
        self.loaded
            .lock()
            .unwrap()
            .iter()
            .map(|(instance_id, domain)| LoadedProvider {
                instance_id: instance_id.clone(),
                domain: domain.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl PlayerRuntime for MockRuntime {
    fn player_state(&self, player_id: &str) -> Option<PlayerState> {
        self.players.lock().unwrap().get(player_id).cloned()
    }

    fn players_for_provider(&self, instance_id: &str) -> Vec<PlayerState> {
        self.players
            .lock()
            .unwrap()
            .values()
            .filter(|player| player.provider == instance_id)
            .cloned()
            .collect()
    }

    fn supports_player_removal(&self, instance_id: &str) -> bool {
        self.removal_providers.lock().unwrap().contains(instance_id)
    }

    async fn remove_player(&self, player_id: &str) -> Result<(), BoxError> {
        self.removed_players.lock().unwrap().push(player_id.to_string());
        Ok(())
    }

    fn unregister_player(&self, player_id: &str) {
        self.players.lock().unwrap().remove(player_id);
        self.unregistered.lock().unwrap().push(player_id.to_string());
    }

    async fn on_player_config_change(&self, _config: &PlayerConfig, _changed: &ChangedKeys) -> Result<(), BoxError> {
        if self.veto_player_changes.load(Ordering::SeqCst) {
            return Err("player is busy".into());
        }
        Ok(())
    }

    async fn on_player_dsp_change(&self, player_id: &str) -> Result<(), BoxError> {
        self.dsp_changes.lock().unwrap().push(player_id.to_string());
        Ok(())
    }

    fn refresh_player(&self, player_id: &str) {
        self.refreshed.lock().unwrap().push(player_id.to_string());
    }
}

#[async_trait]
impl CoreModuleRuntime for MockRuntime {
    async fn reload(&self, config: &CoreConfig) -> Result<(), BoxError> {
        self.core_reloads.lock().unwrap().push(config.domain.clone());
        if self.fail_core_reload.load(Ordering::SeqCst) {
            return Err("port already in use".into());
        }
        Ok(())
    }
}

#[async_trait]
impl MusicLibrary for MockRuntime {
    async fn cleanup_provider(&self, instance_id: &str) -> Result<(), BoxError> {
        self.cleaned_up.lock().unwrap().push(instance_id.to_string());
        Ok(())
    }

    fn start_sync(&self, instance_id: &str) {
        self.synced.lock().unwrap().push(instance_id.to_string());
    }
}

/// Manifests used across the controller tests.
///
/// - `demo`: single instance, disabled when added
/// - `radio`: multi-instance music source with a secret
/// - `airplay`: player provider
/// - `bridge`: depends on `airplay`
/// - `builtin_source`: builtin, can not be disabled
pub(super) fn test_manifests() -> ManifestRegistry {
    ManifestRegistry::from_manifests([
        ManifestBuilder::new("demo", "Demo", ProviderType::Plugin)
            .enabled_by_default(false)
            .config_entry(
                ConfigEntry::new("greeting", ConfigEntryType::String, "Greeting")
                    .with_default("hello")
                    .optional(),
            )
            .build(),
        ManifestBuilder::new("radio", "Radio", ProviderType::Music)
            .multi_instance(true)
            .config_entry(ConfigEntry::new("url", ConfigEntryType::String, "Stream URL"))
            .config_entry(ConfigEntry::new("api_key", ConfigEntryType::SecureString, "API key").optional())
            .build(),
        ManifestBuilder::new("airplay", "AirPlay", ProviderType::Player).build(),
        ManifestBuilder::new("bridge", "Bridge", ProviderType::Plugin)
            .depends_on("airplay")
            .build(),
        ManifestBuilder::new("builtin_source", "Builtin source", ProviderType::Metadata)
            .builtin(true)
            .allow_disable(false)
            .build(),
    ])
    .unwrap()
}

pub(super) fn test_resolver(manifests: Arc<ManifestRegistry>) -> StaticEntryResolver {
    StaticEntryResolver::new(manifests)
        .with_player_entries(vec![
            ConfigEntry::new("crossfade", ConfigEntryType::Boolean, "Crossfade").with_default(false),
            ConfigEntry::new("output_limiter", ConfigEntryType::Boolean, "Output limiter").with_default(true),
        ])
        .with_core_entries(
            "webserver",
            vec![ConfigEntry::new("port", ConfigEntryType::Integer, "Port")
                .with_default(8095)
                .with_range(1.0, 65535.0)],
        )
}

/// Controller over an in-memory store with recording collaborators.
pub(super) struct Harness {
    pub storage: Arc<MemoryStorageProvider>,
    pub runtime: Arc<MockRuntime>,
    pub events: Arc<Mutex<Vec<ConfigEvent>>>,
    pub event_manager: Arc<DefaultEventManager>,
    pub controller: Arc<ConfigController>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_storage(MemoryStorageProvider::new()).await
    }

    pub async fn with_storage(storage: Arc<MemoryStorageProvider>) -> Self {
        Self::with_resolver(storage, |manifests| {
            let resolver: Arc<dyn ConfigEntryResolver> = Arc::new(test_resolver(manifests));
            resolver
        })
        .await
    }

    pub async fn with_resolver<F>(storage: Arc<MemoryStorageProvider>, make_resolver: F) -> Self
    where
        F: FnOnce(Arc<ManifestRegistry>) -> Arc<dyn ConfigEntryResolver>,
    {
        let store = memory_store(&storage).await;
        let cipher = Arc::new(SecretCipher::from_store(&store).unwrap());
        let manifests = Arc::new(test_manifests());
        let resolver = make_resolver(manifests.clone());
        let runtime = MockRuntime::new();
        let event_manager = Arc::new(DefaultEventManager::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&events);
        event_manager
            .register_sync_type_handler::<ConfigEvent, _>(move |event| {
                recorded.lock().unwrap().push(event.clone());
                EventResult::Continue
            })
            .await;
        let controller = Arc::new(ConfigController::new(
            store,
            cipher,
            manifests,
            resolver,
            RuntimeHooks::from_runtime(runtime.clone()),
            event_manager.clone(),
        ));
        Self {
            storage,
            runtime,
            events,
            event_manager,
            controller,
        }
    }

    pub fn events(&self) -> Vec<ConfigEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Flush everything written during setup and return the write count.
    pub fn settle(&self) -> usize {
        self.controller.store().save_now().unwrap();
        self.storage.writes()
    }
}

pub(super) fn values(value: Value) -> ConfigMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}
