//! Helpers shared by unit tests across subsystems.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::migration::MigrationPipeline;
use crate::storage::error::{StorageResult, StorageSystemError};
use crate::storage::{ConfigFormat, ConfigStore, PersistenceEngine, StorageProvider};

pub const TEST_FILE: &str = "settings.json";
pub const TEST_DELAY: Duration = Duration::from_secs(5);

/// In-memory storage provider that counts durable writes.
#[derive(Debug, Default)]
pub struct MemoryStorageProvider {
    files: Mutex<HashMap<PathBuf, String>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStorageProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Provider pre-seeded with the given settings tree as the primary file
    pub fn with_tree(tree: Value) -> Arc<Self> {
        let provider = Self::new();
        provider.put(TEST_FILE, &tree.to_string());
        provider
    }

    pub fn put(&self, path: &str, contents: &str) {
        self.files.lock().unwrap().insert(PathBuf::from(path), contents.to_string());
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(Path::new(path)).cloned()
    }

    /// Parsed contents of the primary settings file
    pub fn tree(&self) -> Option<Value> {
        self.file(TEST_FILE).map(|content| serde_json::from_str(&content).unwrap())
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl StorageProvider for MemoryStorageProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.exists(path)
    }

    fn create_dir_all(&self, _path: &Path) -> StorageResult<()> {
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> StorageResult<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageSystemError::FileNotFound(path.to_path_buf()))
    }

    fn write_string(&self, path: &Path, contents: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageSystemError::io(
                std::io::Error::other("disk full"),
                "write_string",
                path.to_path_buf(),
            ));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.files.lock().unwrap().insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> StorageResult<()> {
        let mut files = self.files.lock().unwrap();
        let contents = files
            .remove(from)
            .ok_or_else(|| StorageSystemError::FileNotFound(from.to_path_buf()))?;
        files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> StorageResult<()> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageSystemError::FileNotFound(path.to_path_buf()))
    }
}

pub fn memory_engine(provider: &Arc<MemoryStorageProvider>) -> PersistenceEngine {
    PersistenceEngine::new(provider.clone(), TEST_FILE, ConfigFormat::Json)
}

/// Store over `provider` with no migration steps
pub async fn memory_store(provider: &Arc<MemoryStorageProvider>) -> ConfigStore {
    let pipeline = MigrationPipeline::new(Default::default());
    ConfigStore::load(memory_engine(provider), TEST_DELAY, &pipeline).await
}

/// Let the debounce timer fire
pub async fn elapse_save_delay() {
    tokio::time::sleep(TEST_DELAY + Duration::from_millis(10)).await;
}
