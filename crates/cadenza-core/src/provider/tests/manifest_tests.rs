use std::io::Write;

use crate::provider::{ConfigEntry, ConfigEntryType, ManifestBuilder, ManifestError, ManifestRegistry, ProviderType};

const MANIFESTS: &str = r#"[
    {
        "domain": "filesystem",
        "name": "Local files",
        "type": "music",
        "builtin": true,
        "allow_disable": false,
        "config_entries": [
            {"key": "path", "type": "string", "label": "Music folder"}
        ]
    },
    {"domain": "airplay", "name": "AirPlay", "type": "player"},
    {"domain": "airplay_bridge", "name": "Bridge", "type": "plugin", "depends_on": "airplay", "multi_instance": true}
]"#;

#[test]
fn test_parse_manifest_list() {
    let registry = ManifestRegistry::from_json_str(MANIFESTS).unwrap();
    assert_eq!(registry.len(), 3);

    let filesystem = registry.get("filesystem").unwrap();
    assert_eq!(filesystem.provider_type, ProviderType::Music);
    assert!(filesystem.builtin);
    assert!(!filesystem.allow_disable);
    assert!(filesystem.enabled_by_default);
    assert_eq!(filesystem.config_entries[0].key, "path");
    assert!(filesystem.config_entries[0].required);

    let airplay = registry.get("airplay").unwrap();
    assert!(airplay.allow_disable);
    assert!(!airplay.multi_instance);
    assert_eq!(airplay.depends_on, None);
}

#[test]
fn test_builtin_domains_and_dependents() {
    let registry = ManifestRegistry::from_json_str(MANIFESTS).unwrap();

    let builtin = registry.builtin_domains();
    assert_eq!(builtin.len(), 1);
    assert!(builtin.contains("filesystem"));

    let dependents: Vec<&str> = registry
        .dependents_of("airplay")
        .into_iter()
        .map(|manifest| manifest.domain.as_str())
        .collect();
    assert_eq!(dependents, vec!["airplay_bridge"]);
    assert!(registry.dependents_of("filesystem").is_empty());
}

#[test]
fn test_duplicate_domain_is_rejected() {
    let mut registry = ManifestRegistry::new();
    registry
        .register(ManifestBuilder::new("demo", "Demo", ProviderType::Plugin).build())
        .unwrap();

    let err = registry
        .register(ManifestBuilder::new("demo", "Other", ProviderType::Music).build())
        .unwrap_err();
    assert!(matches!(err, ManifestError::DuplicateDomain(domain) if domain == "demo"));
    assert_eq!(registry.get("demo").unwrap().name, "Demo");
}

#[test]
fn test_invalid_manifests() {
    let self_dependent = ManifestBuilder::new("loop", "Loop", ProviderType::Plugin)
        .depends_on("loop")
        .build();
    assert!(matches!(self_dependent.validate(), Err(ManifestError::Invalid { .. })));

    let nested = ManifestBuilder::new("a/b", "Nested", ProviderType::Plugin).build();
    assert!(nested.validate().is_err());

    let duplicate_keys = ManifestBuilder::new("dup", "Dup", ProviderType::Plugin)
        .config_entry(ConfigEntry::new("url", ConfigEntryType::String, "URL"))
        .config_entry(ConfigEntry::new("url", ConfigEntryType::String, "URL again"))
        .build();
    assert!(ManifestRegistry::from_manifests([duplicate_keys]).is_err());
}

#[test]
fn test_require_unknown_domain() {
    let registry = ManifestRegistry::new();
    assert!(registry.is_empty());
    assert!(matches!(
        registry.require("spotify"),
        Err(ManifestError::UnknownDomain(domain)) if domain == "spotify"
    ));
}

#[test]
fn test_load_manifests_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MANIFESTS.as_bytes()).unwrap();

    let registry = ManifestRegistry::from_file(file.path()).unwrap();
    assert!(registry.contains("airplay_bridge"));

    let missing = ManifestRegistry::from_file(&file.path().with_extension("missing"));
    assert!(matches!(missing, Err(ManifestError::Io { .. })));

    assert!(matches!(
        ManifestRegistry::from_json_str("{not json"),
        Err(ManifestError::Parse(_))
    ));
}
