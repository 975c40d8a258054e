use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::provider::entries::ConfigEntry;
use crate::provider::error::ManifestError;

/// Kind of provider a manifest describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Music,
    Player,
    Metadata,
    Plugin,
    Core,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderType::Music => "music",
            ProviderType::Player => "player",
            ProviderType::Metadata => "metadata",
            ProviderType::Plugin => "plugin",
            ProviderType::Core => "core",
        };
        f.write_str(name)
    }
}

fn default_true() -> bool {
    true
}

/// Static descriptor of a provider domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderManifest {
    pub domain: String,
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    #[serde(default)]
    pub description: String,
    /// Whether several instances of this domain may be configured
    #[serde(default)]
    pub multi_instance: bool,
    /// Set up automatically and never removable
    #[serde(default)]
    pub builtin: bool,
    #[serde(default = "default_true")]
    pub allow_disable: bool,
    /// Domain that must have an active instance before this one can be added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    /// Enabled state of a freshly added instance
    #[serde(default = "default_true")]
    pub enabled_by_default: bool,
    /// Entries served by the built-in resolver for this domain
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_entries: Vec<ConfigEntry>,
}

impl ProviderManifest {
    pub fn new(domain: &str, name: &str, provider_type: ProviderType) -> Self {
        Self {
            domain: domain.to_string(),
            name: name.to_string(),
            provider_type,
            description: String::new(),
            multi_instance: false,
            builtin: false,
            allow_disable: true,
            depends_on: None,
            enabled_by_default: true,
            config_entries: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        let invalid = |message: &str| ManifestError::Invalid {
            domain: self.domain.clone(),
            message: message.to_string(),
        };
        if self.domain.is_empty() {
            return Err(invalid("domain must not be empty"));
        }
        if self.domain.contains('/') {
            return Err(invalid("domain must not contain '/'"));
        }
        if self.depends_on.as_deref() == Some(self.domain.as_str()) {
            return Err(invalid("a provider cannot depend on itself"));
        }
        let mut keys = HashSet::new();
        if let Some(entry) = self.config_entries.iter().find(|entry| !keys.insert(entry.key.as_str())) {
            return Err(invalid(&format!("duplicate config entry '{}'", entry.key)));
        }
        Ok(())
    }
}

/// Builder for creating a provider manifest
pub struct ManifestBuilder {
    manifest: ProviderManifest,
}

impl ManifestBuilder {
    pub fn new(domain: &str, name: &str, provider_type: ProviderType) -> Self {
        Self {
            manifest: ProviderManifest::new(domain, name, provider_type),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.manifest.description = description.to_string();
        self
    }

    pub fn multi_instance(mut self, multi_instance: bool) -> Self {
        self.manifest.multi_instance = multi_instance;
        self
    }

    pub fn builtin(mut self, builtin: bool) -> Self {
        self.manifest.builtin = builtin;
        self
    }

    pub fn allow_disable(mut self, allow_disable: bool) -> Self {
        self.manifest.allow_disable = allow_disable;
        self
    }

    pub fn depends_on(mut self, domain: &str) -> Self {
        self.manifest.depends_on = Some(domain.to_string());
        self
    }

    pub fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.manifest.enabled_by_default = enabled;
        self
    }

    pub fn config_entry(mut self, entry: ConfigEntry) -> Self {
        self.manifest.config_entries.push(entry);
        self
    }

    pub fn build(self) -> ProviderManifest {
        self.manifest
    }
}

/// Registry of known provider manifests, keyed by domain.
#[derive(Debug, Default, Clone)]
pub struct ManifestRegistry {
    manifests: BTreeMap<String, ProviderManifest>,
}

impl ManifestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manifests<I>(manifests: I) -> Result<Self, ManifestError>
    where
        I: IntoIterator<Item = ProviderManifest>,
    {
        let mut registry = Self::new();
        for manifest in manifests {
            registry.register(manifest)?;
        }
        Ok(registry)
    }

    /// Parse a JSON list of manifests
    pub fn from_json_str(data: &str) -> Result<Self, ManifestError> {
        let manifests: Vec<ProviderManifest> = serde_json::from_str(data)?;
        Self::from_manifests(manifests)
    }

    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let data = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&data)
    }

    pub fn register(&mut self, manifest: ProviderManifest) -> Result<(), ManifestError> {
        manifest.validate()?;
        if self.manifests.contains_key(&manifest.domain) {
            return Err(ManifestError::DuplicateDomain(manifest.domain));
        }
        log::debug!("Registered provider manifest '{}'", manifest.domain);
        self.manifests.insert(manifest.domain.clone(), manifest);
        Ok(())
    }

    pub fn get(&self, domain: &str) -> Option<&ProviderManifest> {
        self.manifests.get(domain)
    }

    /// Manifest for `domain` or `UnknownDomain`
    pub fn require(&self, domain: &str) -> Result<&ProviderManifest, ManifestError> {
        self.get(domain).ok_or_else(|| ManifestError::UnknownDomain(domain.to_string()))
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.manifests.contains_key(domain)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderManifest> {
        self.manifests.values()
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Domains of built-in providers
    pub fn builtin_domains(&self) -> HashSet<String> {
        self.iter()
            .filter(|manifest| manifest.builtin)
            .map(|manifest| manifest.domain.clone())
            .collect()
    }

    /// Manifests that declare a dependency on `domain`
    pub fn dependents_of(&self, domain: &str) -> Vec<&ProviderManifest> {
        self.iter()
            .filter(|manifest| manifest.depends_on.as_deref() == Some(domain))
            .collect()
    }
}
