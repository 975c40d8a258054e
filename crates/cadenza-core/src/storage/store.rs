use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::runtime::Handle;

use crate::kernel::component::KernelComponent;
use crate::kernel::error::Result as KernelResult;
use crate::migration::MigrationPipeline;
use crate::storage::cache::ValueCache;
use crate::storage::config::StoreSettings;
use crate::storage::debounce::SaveDebouncer;
use crate::storage::error::StorageResult;
use crate::storage::persistence::PersistenceEngine;
use crate::storage::tree::{ConfigTree, ConfigValue};

struct StoreState {
    tree: ConfigTree,
    /// Set by every mutation, cleared by a successful durable write
    dirty: bool,
}

struct StoreInner {
    state: Mutex<StoreState>,
    engine: PersistenceEngine,
    debouncer: SaveDebouncer,
    cache: ValueCache,
}

impl StoreInner {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            log::error!("Settings store lock was poisoned; continuing with the last state");
            poisoned.into_inner()
        })
    }

    /// Write the tree while holding the state lock, so writes never interleave.
    fn write_locked(&self, state: &mut StoreState) -> StorageResult<()> {
        self.cache.clear();
        match self.engine.write(state.tree.as_map()) {
            Ok(()) => {
                state.dirty = false;
                Ok(())
            }
            Err(e) => {
                state.dirty = true;
                log::error!("Failed to persist settings: {}", e);
                Err(e)
            }
        }
    }

    fn flush_if_dirty(&self) -> StorageResult<()> {
        let mut state = self.state();
        if !state.dirty {
            return Ok(());
        }
        self.write_locked(&mut state)
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let dirty = match self.state.get_mut() {
            Ok(state) => state.dirty,
            Err(poisoned) => poisoned.into_inner().dirty,
        };
        if dirty {
            log::warn!("Settings store dropped with unsaved changes");
        }
    }
}

/// Path-addressed settings store with debounced, crash-safe persistence.
///
/// Cloning yields another handle to the same store. Every mutation marks the
/// store dirty, clears the [`ValueCache`] and (re)arms the save timer, so a
/// burst of changes ends in a single write. The store only exists in the
/// loaded state: [`ConfigStore::load`] is the sole constructor.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<StoreInner>,
}

impl ConfigStore {
    /// Load the tree through `engine` and run `migrations` against it.
    ///
    /// Missing or unparsable files never fail the load: the backup is tried
    /// next and the store starts empty when neither parses. When a migration
    /// changed the tree it is written immediately. Must be called from within
    /// a tokio runtime, which then drives the save timer.
    pub async fn load(engine: PersistenceEngine, save_delay: Duration, migrations: &MigrationPipeline) -> Self {
        let mut tree = ConfigTree::new();
        let mut migrated = false;
        if let Some(loaded) = engine.load() {
            let mut map = loaded.tree;
            migrated = migrations.run(&mut map).changed();
            tree = ConfigTree::from_map(map);
        }
        let store = Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState { tree, dirty: migrated }),
                engine,
                debouncer: SaveDebouncer::new(save_delay, Handle::current()),
                cache: ValueCache::new(),
            }),
        };
        if migrated {
            // failure is logged and left dirty for the next flush
            let _ = store.save_now();
        }
        store
    }

    /// Validate `settings` and load the store from the local filesystem.
    pub async fn open(settings: &StoreSettings, migrations: &MigrationPipeline) -> StorageResult<Self> {
        settings.validate()?;
        let engine = PersistenceEngine::from_settings(settings);
        Ok(Self::load(engine, settings.save_delay(), migrations).await)
    }

    /// Value at `path`, or `default` when absent or null.
    pub fn get(&self, path: &str, default: ConfigValue) -> ConfigValue {
        self.inner.state().tree.get_or(path, default)
    }

    /// Value at `path`; absent and null both read as `None`.
    pub fn get_opt(&self, path: &str) -> Option<ConfigValue> {
        self.inner.state().tree.get(path).cloned()
    }

    /// Typed value at `path`; a value of the wrong shape reads as `None`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.inner.state().tree.get_as(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner.state().tree.contains(path)
    }

    pub fn set(&self, path: &str, value: ConfigValue) {
        {
            let mut state = self.inner.state();
            state.tree.set(path, value);
            state.dirty = true;
        }
        self.schedule_save();
    }

    /// Set `path` only when nothing is stored there; an explicit null is kept.
    /// Returns whether the value was written.
    pub fn set_default(&self, path: &str, value: ConfigValue) -> bool {
        let written = {
            let mut state = self.inner.state();
            let written = state.tree.set_default(path, value);
            state.dirty |= written;
            written
        };
        if written {
            self.schedule_save();
        }
        written
    }

    /// Remove the value at `path`; a missing path is a no-op without a save.
    pub fn remove(&self, path: &str) -> Option<ConfigValue> {
        let removed = {
            let mut state = self.inner.state();
            let removed = state.tree.remove(path);
            state.dirty |= removed.is_some();
            removed
        };
        if removed.is_some() {
            self.schedule_save();
        }
        removed
    }

    /// Read the tree under the store lock.
    pub fn read<R>(&self, f: impl FnOnce(&ConfigTree) -> R) -> R {
        f(&self.inner.state().tree)
    }

    /// Apply several mutations under one lock with a single scheduled save.
    ///
    /// `f` reports whether it changed anything; nothing is scheduled otherwise.
    pub fn mutate(&self, f: impl FnOnce(&mut ConfigTree) -> bool) -> bool {
        let changed = {
            let mut state = self.inner.state();
            let changed = f(&mut state.tree);
            state.dirty |= changed;
            changed
        };
        if changed {
            self.schedule_save();
        }
        changed
    }

    /// Copy of the whole tree
    pub fn snapshot(&self) -> ConfigTree {
        self.inner.state().tree.clone()
    }

    /// Clear the value cache and (re)arm the debounced save.
    pub fn schedule_save(&self) {
        self.inner.cache.clear();
        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        self.inner.debouncer.arm(move || {
            if let Some(inner) = weak.upgrade() {
                // errors are logged and the store stays dirty
                let _ = inner.flush_if_dirty();
            }
        });
    }

    /// Cancel the pending save and write the tree now.
    pub fn save_now(&self) -> StorageResult<()> {
        self.inner.debouncer.cancel();
        let mut state = self.inner.state();
        self.inner.write_locked(&mut state)
    }

    /// Flush pending changes; performs no I/O when nothing is dirty.
    pub fn close(&self) -> StorageResult<()> {
        self.inner.debouncer.cancel();
        self.inner.flush_if_dirty()
    }

    /// Whether changes are waiting to be persisted
    pub fn has_pending_save(&self) -> bool {
        self.inner.state().dirty
    }

    pub fn cache(&self) -> &ValueCache {
        &self.inner.cache
    }

    pub fn engine(&self) -> &PersistenceEngine {
        &self.inner.engine
    }

    pub fn save_delay(&self) -> Duration {
        self.inner.debouncer.delay()
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("engine", &self.inner.engine)
            .field("save_delay", &self.inner.debouncer.delay())
            .field("pending_save", &self.has_pending_save())
            .finish()
    }
}

#[async_trait]
impl KernelComponent for ConfigStore {
    fn name(&self) -> &'static str {
        "ConfigStore"
    }

    async fn initialize(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn start(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn stop(&self) -> KernelResult<()> {
        log::info!("Flushing settings store");
        self.close().map_err(Into::into)
    }
}
