use std::sync::Arc;

use crate::provider::{
    ConfigEntry, ConfigEntryResolver, ConfigEntryType, EntryRequest, EntryScope, ManifestBuilder, ManifestRegistry,
    ProviderType, StaticEntryResolver,
};

fn resolver() -> StaticEntryResolver {
    let manifests = ManifestRegistry::from_manifests([ManifestBuilder::new("radio", "Radio", ProviderType::Music)
        .config_entry(ConfigEntry::new("url", ConfigEntryType::String, "Stream URL"))
        .build()])
    .unwrap();
    StaticEntryResolver::new(Arc::new(manifests))
        .with_player_entries(vec![ConfigEntry::new("crossfade", ConfigEntryType::Boolean, "Crossfade")])
        .with_provider_player_entries(
            "airplay",
            vec![ConfigEntry::new("airplay_latency", ConfigEntryType::Integer, "Latency")],
        )
        .with_core_entries(
            "webserver",
            vec![ConfigEntry::new("port", ConfigEntryType::Integer, "Port")],
        )
}

fn keys(entries: &[ConfigEntry]) -> Vec<&str> {
    entries.iter().map(|entry| entry.key.as_str()).collect()
}

#[tokio::test]
async fn test_provider_entries_come_from_manifest() {
    let scope = EntryScope::Provider {
        domain: "radio".to_string(),
        instance_id: None,
    };
    let entries = resolver()
        .get_entries(&EntryRequest::new(scope, Default::default()))
        .await
        .unwrap();
    assert_eq!(keys(&entries), vec!["url"]);

    let unknown = EntryScope::Provider {
        domain: "spotify".to_string(),
        instance_id: None,
    };
    let err = resolver()
        .get_entries(&EntryRequest::new(unknown, Default::default()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("spotify"));
}

#[tokio::test]
async fn test_player_entries_include_provider_specific_ones() {
    let scope = |provider: &str| EntryScope::Player {
        provider: provider.to_string(),
        player_id: "kitchen".to_string(),
    };
    let resolver = resolver();

    let airplay = resolver
        .get_entries(&EntryRequest::new(scope("airplay"), Default::default()))
        .await
        .unwrap();
    assert_eq!(keys(&airplay), vec!["crossfade", "airplay_latency"]);

    let other = resolver
        .get_entries(&EntryRequest::new(scope("sonos"), Default::default()))
        .await
        .unwrap();
    assert_eq!(keys(&other), vec!["crossfade"]);
}

#[tokio::test]
async fn test_core_entries_and_actions() {
    let resolver = resolver();
    let core = |domain: &str| EntryScope::Core {
        domain: domain.to_string(),
    };

    let webserver = resolver
        .get_entries(&EntryRequest::new(core("webserver"), Default::default()))
        .await
        .unwrap();
    assert_eq!(keys(&webserver), vec!["port"]);

    let streams = resolver
        .get_entries(&EntryRequest::new(core("streams"), Default::default()))
        .await
        .unwrap();
    assert!(streams.is_empty());

    let request = EntryRequest::new(core("webserver"), Default::default()).with_action(Some("reset".to_string()));
    assert!(resolver.get_entries(&request).await.is_err());
}

#[test]
fn test_scope_display() {
    let scope = EntryScope::Provider {
        domain: "radio".to_string(),
        instance_id: Some("radio--abcd1234".to_string()),
    };
    assert_eq!(scope.to_string(), "provider 'radio--abcd1234' (radio)");
    assert_eq!(
        EntryScope::Core {
            domain: "streams".to_string()
        }
        .to_string(),
        "core module 'streams'"
    );
}
