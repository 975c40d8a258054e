use std::fmt::Debug;
use std::path::Path;

use crate::storage::error::StorageResult;

/// Trait for storage backends the settings file is persisted to.
///
/// Paths are relative to the provider's root. `write_string` must replace the
/// target atomically: readers observe either the old or the new contents.
pub trait StorageProvider: Send + Sync + Debug {
    /// Get the name of this provider
    fn name(&self) -> &str;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Create a directory and all its parent directories
    fn create_dir_all(&self, path: &Path) -> StorageResult<()>;

    /// Read a file to a string
    fn read_to_string(&self, path: &Path) -> StorageResult<String>;

    /// Atomically replace a file with the given contents
    fn write_string(&self, path: &Path, contents: &str) -> StorageResult<()>;

    /// Move a file from one path to another
    fn rename(&self, from: &Path, to: &Path) -> StorageResult<()>;

    /// Remove a file
    fn remove_file(&self, path: &Path) -> StorageResult<()>;
}
