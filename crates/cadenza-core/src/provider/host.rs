use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::config::models::{ChangedKeys, CoreConfig, PlayerConfig, ProviderConfig};
use crate::kernel::error::BoxError;

/// A provider instance currently running in the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedProvider {
    pub instance_id: String,
    pub domain: String,
}

/// Loads and unloads provider instances.
#[async_trait]
pub trait ProviderHost: Send + Sync {
    /// Start (or restart) the instance described by `config`.
    async fn activate(&self, config: &ProviderConfig) -> Result<(), BoxError>;

    /// Stop an instance. `is_removed` is set when its config is being deleted.
    async fn deactivate(&self, instance_id: &str, is_removed: bool) -> Result<(), BoxError>;

    fn is_available(&self, instance_id: &str) -> bool;

    fn loaded_instances(&self) -> Vec<LoadedProvider>;
}

/// Live state of a registered player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub player_id: String,
    /// Instance id of the controlling provider
    pub provider: String,
    pub display_name: String,
    pub available: bool,
}

/// The player manager side of player configs.
#[async_trait]
pub trait PlayerRuntime: Send + Sync {
    fn player_state(&self, player_id: &str) -> Option<PlayerState>;

    fn players_for_provider(&self, instance_id: &str) -> Vec<PlayerState>;

    /// Whether the provider instance can delete players itself (e.g. groups)
    fn supports_player_removal(&self, instance_id: &str) -> bool;

    async fn remove_player(&self, player_id: &str) -> Result<(), BoxError>;

    /// Drop a player registration without touching its config
    fn unregister_player(&self, player_id: &str);

    /// Apply a changed config; an error vetoes the change before it is stored.
    async fn on_player_config_change(&self, config: &PlayerConfig, changed: &ChangedKeys) -> Result<(), BoxError>;

    async fn on_player_dsp_change(&self, player_id: &str) -> Result<(), BoxError>;

    /// Recompute derived player attributes after a stored change
    fn refresh_player(&self, player_id: &str);
}

#[async_trait]
pub trait CoreModuleRuntime: Send + Sync {
    /// Reload a core module with `config`; an error keeps the old config.
    async fn reload(&self, config: &CoreConfig) -> Result<(), BoxError>;
}

#[async_trait]
pub trait MusicLibrary: Send + Sync {
    /// Remove library items that came from a removed provider instance
    async fn cleanup_provider(&self, instance_id: &str) -> Result<(), BoxError>;

    /// Start a background sync of a freshly added provider instance
    fn start_sync(&self, instance_id: &str);
}

/// Runtime collaborators used by the config controller.
#[derive(Clone)]
pub struct RuntimeHooks {
    pub providers: Arc<dyn ProviderHost>,
    pub players: Arc<dyn PlayerRuntime>,
    pub core: Arc<dyn CoreModuleRuntime>,
    pub library: Arc<dyn MusicLibrary>,
}

impl RuntimeHooks {
    /// Hooks all served by one runtime object
    pub fn from_runtime<R>(runtime: Arc<R>) -> Self
    where
        R: ProviderHost + PlayerRuntime + CoreModuleRuntime + MusicLibrary + 'static,
    {
        Self {
            providers: runtime.clone(),
            players: runtime.clone(),
            core: runtime.clone(),
            library: runtime,
        }
    }

    pub fn offline() -> Self {
        Self::from_runtime(Arc::new(OfflineRuntime::new()))
    }
}

impl std::fmt::Debug for RuntimeHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHooks").finish_non_exhaustive()
    }
}

/// Runtime without players or a library that records activated providers.
///
/// Used by the command line tool, which edits settings while the server is
/// not running.
#[derive(Debug, Default)]
pub struct OfflineRuntime {
    loaded: Mutex<BTreeMap<String, String>>,
}

impl OfflineRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn loaded(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.loaded.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ProviderHost for OfflineRuntime {
    async fn activate(&self, config: &ProviderConfig) -> Result<(), BoxError> {
        log::debug!("Marking provider '{}' as loaded", config.instance_id);
        self.loaded().insert(config.instance_id.clone(), config.domain.clone());
        Ok(())
    }

    async fn deactivate(&self, instance_id: &str, _is_removed: bool) -> Result<(), BoxError> {
        self.loaded().remove(instance_id);
        Ok(())
    }

    fn is_available(&self, instance_id: &str) -> bool {
        self.loaded().contains_key(instance_id)
    }

    fn loaded_instances(&self) -> Vec<LoadedProvider> {
        self.loaded()
            .iter()
            .map(|(instance_id, domain)| LoadedProvider {
                instance_id: instance_id.clone(),
                domain: domain.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl PlayerRuntime for OfflineRuntime {
    fn player_state(&self, _player_id: &str) -> Option<PlayerState> {
        None
    }

    fn players_for_provider(&self, _instance_id: &str) -> Vec<PlayerState> {
        Vec::new()
    }

    fn supports_player_removal(&self, _instance_id: &str) -> bool {
        false
    }

    async fn remove_player(&self, _player_id: &str) -> Result<(), BoxError> {
        Ok(())
    }

    fn unregister_player(&self, _player_id: &str) {}

    async fn on_player_config_change(&self, _config: &PlayerConfig, _changed: &ChangedKeys) -> Result<(), BoxError> {
        Ok(())
    }

    async fn on_player_dsp_change(&self, _player_id: &str) -> Result<(), BoxError> {
        Ok(())
    }

    fn refresh_player(&self, _player_id: &str) {}
}

#[async_trait]
impl CoreModuleRuntime for OfflineRuntime {
    async fn reload(&self, config: &CoreConfig) -> Result<(), BoxError> {
        log::debug!("Core module '{}' will pick up its config on next start", config.domain);
        Ok(())
    }
}

#[async_trait]
impl MusicLibrary for OfflineRuntime {
    async fn cleanup_provider(&self, _instance_id: &str) -> Result<(), BoxError> {
        Ok(())
    }

    fn start_sync(&self, instance_id: &str) {
        log::debug!("Library sync of '{}' deferred until the server runs", instance_id);
    }
}
