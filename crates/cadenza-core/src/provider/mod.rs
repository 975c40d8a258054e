//! # Cadenza Core Providers
//!
//! Everything the config layer knows about provider modules without running
//! them.
//!
//! - [`ProviderManifest`] and [`ManifestRegistry`]: static descriptors of each
//!   provider domain (multi-instance support, dependency, removability).
//! - [`ConfigEntry`]: typed schema of one configurable option.
//! - [`ConfigEntryResolver`]: produces the entries of a provider, player or
//!   core module. [`StaticEntryResolver`] serves fixed tables.
//! - [`ProviderHost`], [`PlayerRuntime`], [`CoreModuleRuntime`] and
//!   [`MusicLibrary`]: the runtime side that reacts to config changes,
//!   bundled in [`RuntimeHooks`]. [`OfflineRuntime`] stands in when no
//!   server is running.
pub mod entries;
pub mod error;
pub mod host;
pub mod manifest;
pub mod resolver;

pub use entries::{log_level_entry, ConfigEntry, ConfigEntryType, ConfigValueOption};
pub use error::{EntryValidationError, ManifestError};
pub use host::{
    CoreModuleRuntime, LoadedProvider, MusicLibrary, OfflineRuntime, PlayerRuntime, PlayerState, ProviderHost,
    RuntimeHooks,
};
pub use manifest::{ManifestBuilder, ManifestRegistry, ProviderManifest, ProviderType};
pub use resolver::{ConfigEntryResolver, EntryRequest, EntryScope, StaticEntryResolver};

#[cfg(test)]
mod tests;
