use serde_json::json;

use crate::config::ProviderConfig;
use crate::crypto::SecretCipher;
use crate::provider::{LoadedProvider, OfflineRuntime, RuntimeHooks};

fn demo_config() -> ProviderConfig {
    let cipher = SecretCipher::from_server_id("0123456789abcdef0123456789abcdef").unwrap();
    let raw = json!({"type": "plugin", "domain": "demo", "instance_id": "demo", "values": {}});
    ProviderConfig::from_raw(&raw, Vec::new(), &cipher).unwrap()
}

#[tokio::test]
async fn test_offline_runtime_tracks_loaded_providers() {
    let hooks = RuntimeHooks::offline();
    assert!(!hooks.providers.is_available("demo"));

    hooks.providers.activate(&demo_config()).await.unwrap();
    assert!(hooks.providers.is_available("demo"));
    assert_eq!(
        hooks.providers.loaded_instances(),
        vec![LoadedProvider {
            instance_id: "demo".to_string(),
            domain: "demo".to_string(),
        }]
    );

    hooks.providers.deactivate("demo", false).await.unwrap();
    assert!(hooks.providers.loaded_instances().is_empty());
}

#[tokio::test]
async fn test_offline_runtime_has_no_players() {
    let runtime = OfflineRuntime::new();
    let hooks = RuntimeHooks::from_runtime(std::sync::Arc::new(runtime));

    assert_eq!(hooks.players.player_state("kitchen"), None);
    assert!(hooks.players.players_for_provider("airplay").is_empty());
    assert!(!hooks.players.supports_player_removal("airplay"));
    assert!(hooks.players.on_player_dsp_change("kitchen").await.is_ok());
    assert!(hooks.library.cleanup_provider("radio").await.is_ok());
}
