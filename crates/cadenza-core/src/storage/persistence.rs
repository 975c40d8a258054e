use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::kernel::constants;
use crate::storage::config::{ConfigFormat, StoreSettings};
use crate::storage::error::{StorageResult, StorageSystemError};
use crate::storage::local::LocalStorageProvider;
use crate::storage::provider::StorageProvider;
use crate::storage::tree::ConfigMap;

/// A settings tree read back from storage.
#[derive(Debug, Clone)]
pub struct LoadedTree {
    pub tree: ConfigMap,
    /// The file the tree was parsed from (primary or backup)
    pub source: PathBuf,
}

/// Whole-tree persistence of the settings file with one backup generation.
///
/// Writes rotate the current file to `<file>.backup` and then atomically
/// replace the primary file. Loads try the primary file first and fall back
/// to the backup. Callers serialize writes.
pub struct PersistenceEngine {
    provider: Arc<dyn StorageProvider>,
    file_path: PathBuf,
    backup_path: PathBuf,
    format: ConfigFormat,
}

impl PersistenceEngine {
    /// Create an engine writing `file_path` (relative to the provider root).
    pub fn new(provider: Arc<dyn StorageProvider>, file_path: impl Into<PathBuf>, format: ConfigFormat) -> Self {
        let file_path = file_path.into();
        let backup_path = backup_path_for(&file_path);
        Self {
            provider,
            file_path,
            backup_path,
            format,
        }
    }

    /// Create an engine on the local filesystem as described by `settings`.
    pub fn from_settings(settings: &StoreSettings) -> Self {
        let provider = Arc::new(LocalStorageProvider::new(settings.storage_dir.clone()));
        Self::new(provider, settings.file_name.clone(), settings.format)
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    pub fn provider(&self) -> &Arc<dyn StorageProvider> {
        &self.provider
    }

    /// Load the tree from the primary file, falling back to the backup.
    ///
    /// Missing and unparsable files are skipped; `None` means first run.
    pub fn load(&self) -> Option<LoadedTree> {
        for candidate in [&self.file_path, &self.backup_path] {
            let content = match self.provider.read_to_string(candidate) {
                Ok(content) => content,
                Err(StorageSystemError::FileNotFound(_)) => continue,
                Err(e) => {
                    log::error!("Error while reading persistent storage file {}: {}", candidate.display(), e);
                    continue;
                }
            };
            match self.format.parse_tree(&content) {
                Ok(tree) => {
                    log::debug!("Loaded persistent settings from {}", candidate.display());
                    return Some(LoadedTree {
                        tree,
                        source: candidate.clone(),
                    });
                }
                Err(e) => {
                    log::error!("Error while parsing persistent storage file {}: {}", candidate.display(), e);
                }
            }
        }
        log::debug!("Started with empty storage: No persistent storage file found.");
        None
    }

    /// Durably write the whole tree.
    pub fn write(&self, tree: &ConfigMap) -> StorageResult<()> {
        let content = self.format.serialize_tree(tree)?;
        self.rotate_backup()
            .and_then(|_| self.provider.write_string(&self.file_path, &content))
            .map_err(|e| StorageSystemError::persistence(self.file_path.clone(), e))?;
        log::debug!("Saved data to persistent storage");
        Ok(())
    }

    fn rotate_backup(&self) -> StorageResult<()> {
        if !self.provider.is_file(&self.file_path) {
            return Ok(());
        }
        if self.provider.is_file(&self.backup_path) {
            self.provider.remove_file(&self.backup_path)?;
        }
        self.provider.rename(&self.file_path, &self.backup_path)
    }
}

impl fmt::Debug for PersistenceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceEngine")
            .field("provider", &self.provider.name())
            .field("file_path", &self.file_path)
            .field("format", &self.format)
            .finish()
    }
}

fn backup_path_for(file_path: &Path) -> PathBuf {
    let mut name = file_path.as_os_str().to_os_string();
    name.push(constants::BACKUP_SUFFIX);
    PathBuf::from(name)
}
