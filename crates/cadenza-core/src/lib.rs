//! # Cadenza Core
//!
//! Persistent configuration core of a music server: a path-addressed settings
//! tree with debounced, crash-safe persistence, load-time migrations,
//! encrypted secrets and the lifecycle of provider, player, core module and
//! DSP configs.
pub mod config;
pub mod crypto;
pub mod event;
pub mod kernel;
pub mod migration;
pub mod provider;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConfigController, ConfigError, DspConfig, PlayerConfig, ProviderConfig};
pub use crypto::SecretCipher;
pub use event::{ConfigEvent, Event, EventManager};
pub use kernel::error::Error as KernelError;
pub use kernel::Application;
pub use migration::MigrationPipeline;
pub use provider::{ManifestRegistry, OfflineRuntime, RuntimeHooks, StaticEntryResolver};
pub use storage::{ConfigStore, StoreSettings};
