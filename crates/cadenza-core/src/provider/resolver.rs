use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::kernel::error::BoxError;
use crate::provider::entries::ConfigEntry;
use crate::provider::error::ManifestError;
use crate::provider::manifest::ManifestRegistry;
use crate::storage::tree::ConfigMap;

/// Entity whose config entries are requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryScope {
    /// A provider domain; `instance_id` is `None` while setting up a new instance
    Provider { domain: String, instance_id: Option<String> },
    /// A player, owned by the provider instance `provider`
    Player { provider: String, player_id: String },
    Core { domain: String },
}

impl fmt::Display for EntryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryScope::Provider {
                domain,
                instance_id: Some(instance_id),
            } => write!(f, "provider '{}' ({})", instance_id, domain),
            EntryScope::Provider { domain, instance_id: None } => write!(f, "new provider of '{}'", domain),
            EntryScope::Player { player_id, .. } => write!(f, "player '{}'", player_id),
            EntryScope::Core { domain } => write!(f, "core module '{}'", domain),
        }
    }
}

/// Arguments of a single resolver call.
#[derive(Debug, Clone)]
pub struct EntryRequest {
    pub scope: EntryScope,
    /// Action key triggered from an entry of type `Action`
    pub action: Option<String>,
    /// Current (possibly intermediate, unsaved) raw values
    pub values: ConfigMap,
}

impl EntryRequest {
    pub fn new(scope: EntryScope, values: ConfigMap) -> Self {
        Self {
            scope,
            action: None,
            values,
        }
    }

    pub fn with_action(mut self, action: Option<String>) -> Self {
        self.action = action;
        self
    }
}

/// Produces the ordered, typed config entries of an entity.
///
/// Output is used for a single operation and never cached.
#[async_trait]
pub trait ConfigEntryResolver: Send + Sync {
    async fn get_entries(&self, request: &EntryRequest) -> Result<Vec<ConfigEntry>, BoxError>;
}

/// Resolver over fixed entry tables.
///
/// Provider entries come from the manifests; player entries are a common set
/// followed by the entries registered for the player's provider instance;
/// core module entries are registered per module. Actions are not supported.
#[derive(Debug, Clone)]
pub struct StaticEntryResolver {
    manifests: Arc<ManifestRegistry>,
    player_entries: Vec<ConfigEntry>,
    provider_player_entries: HashMap<String, Vec<ConfigEntry>>,
    core_entries: HashMap<String, Vec<ConfigEntry>>,
}

impl StaticEntryResolver {
    pub fn new(manifests: Arc<ManifestRegistry>) -> Self {
        Self {
            manifests,
            player_entries: Vec::new(),
            provider_player_entries: HashMap::new(),
            core_entries: HashMap::new(),
        }
    }

    /// Entries shared by every player
    pub fn with_player_entries(mut self, entries: Vec<ConfigEntry>) -> Self {
        self.player_entries = entries;
        self
    }

    /// Extra entries for players of the provider instance `provider`
    pub fn with_provider_player_entries(mut self, provider: &str, entries: Vec<ConfigEntry>) -> Self {
        self.provider_player_entries.insert(provider.to_string(), entries);
        self
    }

    pub fn with_core_entries(mut self, domain: &str, entries: Vec<ConfigEntry>) -> Self {
        self.core_entries.insert(domain.to_string(), entries);
        self
    }
}

#[async_trait]
impl ConfigEntryResolver for StaticEntryResolver {
    async fn get_entries(&self, request: &EntryRequest) -> Result<Vec<ConfigEntry>, BoxError> {
        if let Some(action) = &request.action {
            return Err(format!("action '{}' is not supported for {}", action, request.scope).into());
        }
        let entries = match &request.scope {
            EntryScope::Provider { domain, .. } => {
                let manifest = self.manifests.get(domain).ok_or_else(|| ManifestError::UnknownDomain(domain.clone()))?;
                manifest.config_entries.clone()
            }
            EntryScope::Player { provider, .. } => self
                .player_entries
                .iter()
                .chain(self.provider_player_entries.get(provider).into_iter().flatten())
                .cloned()
                .collect(),
            EntryScope::Core { domain } => self.core_entries.get(domain).cloned().unwrap_or_default(),
        };
        Ok(entries)
    }
}
