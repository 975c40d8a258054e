//! # Cadenza Core Storage
//!
//! The settings tree and everything needed to keep it on disk.
//!
//! - [`ConfigTree`]: in-memory tree addressed by `/`-delimited paths.
//! - [`StorageProvider`] / [`LocalStorageProvider`]: file access with atomic replace.
//! - [`PersistenceEngine`]: whole-tree writes with one backup generation and
//!   backup-tolerant loads.
//! - [`SaveDebouncer`]: cancellable deferred save.
//! - [`ValueCache`]: memo of resolved single values, cleared on every write.
//! - [`ConfigStore`]: the handle callers use, combining all of the above.
pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod local;
pub mod persistence;
pub mod provider;
pub mod store;
pub mod tree;

pub use cache::ValueCache;
pub use config::{ConfigFormat, StoreSettings};
pub use debounce::SaveDebouncer;
pub use error::{StorageResult, StorageSystemError};
pub use local::LocalStorageProvider;
pub use persistence::{LoadedTree, PersistenceEngine};
pub use provider::StorageProvider;
pub use store::ConfigStore;
pub use tree::{ConfigMap, ConfigTree, ConfigValue, PATH_SEPARATOR};
