use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::tempdir;

use crate::event::EventResult;
use crate::kernel::bootstrap::Application;
use crate::kernel::error::{Error, KernelLifecyclePhase};
use crate::provider::{
    ConfigEntry, ConfigEntryType, ManifestBuilder, ManifestRegistry, ProviderType, RuntimeHooks, StaticEntryResolver,
};
use crate::storage::StoreSettings;

fn manifests() -> ManifestRegistry {
    ManifestRegistry::from_manifests([
        ManifestBuilder::new("filesystem", "Local files", ProviderType::Music)
            .builtin(true)
            .allow_disable(false)
            .build(),
        ManifestBuilder::new("radio", "Radio", ProviderType::Music)
            .multi_instance(true)
            .config_entry(ConfigEntry::new("api_key", ConfigEntryType::SecureString, "API key"))
            .build(),
    ])
    .unwrap()
}

async fn bootstrap(settings: &StoreSettings) -> Application {
    let manifests = manifests();
    let resolver = Arc::new(StaticEntryResolver::new(Arc::new(manifests.clone())));
    Application::bootstrap(settings, manifests, resolver, RuntimeHooks::offline())
        .await
        .unwrap()
}

fn read_settings(settings: &StoreSettings) -> Value {
    let content = std::fs::read_to_string(settings.settings_path()).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[tokio::test]
async fn test_start_creates_builtin_configs_and_shutdown_flushes() {
    let dir = tempdir().unwrap();
    let settings = StoreSettings::new(dir.path());
    let mut app = bootstrap(&settings).await;
    assert!(!app.is_running());
    assert_eq!(app.components().len(), 2);

    app.start().await.unwrap();
    assert!(app.is_running());
    assert!(app.store().contains("providers/filesystem"));
    assert!(!settings.settings_path().exists());

    app.shutdown().await.unwrap();
    assert!(!app.is_running());
    let persisted = read_settings(&settings);
    assert_eq!(persisted["providers"]["filesystem"]["domain"], json!("filesystem"));
    assert_eq!(persisted["server_id"].as_str().unwrap().len(), 32);
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let dir = tempdir().unwrap();
    let mut app = bootstrap(&StoreSettings::new(dir.path())).await;
    app.start().await.unwrap();

    let err = app.start().await.unwrap_err();
    assert!(matches!(
        err,
        Error::KernelLifecycleError {
            phase: KernelLifecyclePhase::Start,
            ..
        }
    ));
    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_events_are_dispatched() {
    let dir = tempdir().unwrap();
    let mut app = bootstrap(&StoreSettings::new(dir.path())).await;
    let seen = Arc::new(AtomicUsize::new(0));
    for name in ["application.start", "application.shutdown"] {
        let seen = seen.clone();
        app.event_manager()
            .register_sync_handler(name, move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                EventResult::Continue
            })
            .await
            .unwrap();
    }

    app.start().await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    app.shutdown().await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_bootstrap_runs_migrations() {
    let dir = tempdir().unwrap();
    let settings = StoreSettings::new(dir.path());
    std::fs::write(
        settings.settings_path(),
        json!({
            "providers": {
                "broken": {"instance_id": "broken", "values": {}},
                "radio--abcd1234": {"type": "music", "domain": "radio", "instance_id": "radio--abcd1234", "values": {}}
            }
        })
        .to_string(),
    )
    .unwrap();

    let app = bootstrap(&settings).await;

    assert!(!app.store().contains("providers/broken"));
    assert!(app.store().contains("providers/radio--abcd1234"));
    // Written right away, without waiting for the debounce
    let persisted = read_settings(&settings);
    assert!(persisted["providers"].get("broken").is_none());
    assert_eq!(persisted["onboard_done"], json!(true));
}

#[tokio::test]
async fn test_secrets_survive_restart() {
    let dir = tempdir().unwrap();
    let settings = StoreSettings::new(dir.path());

    let mut app = bootstrap(&settings).await;
    app.start().await.unwrap();
    let radio = app
        .controller()
        .add_provider_config("radio", serde_json::from_value(json!({"api_key": "s3cret"})).unwrap())
        .await
        .unwrap();
    app.shutdown().await.unwrap();

    let stored = read_settings(&settings)["providers"][&radio.instance_id]["values"]["api_key"].clone();
    assert!(!stored.as_str().unwrap().contains("s3cret"));

    let app = bootstrap(&settings).await;
    let reloaded = app.controller().get_provider_config(&radio.instance_id).await.unwrap();
    assert_eq!(reloaded.values.value("api_key"), Some(&json!("s3cret")));
}
