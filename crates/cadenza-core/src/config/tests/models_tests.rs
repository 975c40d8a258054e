use serde_json::json;

use super::values;
use crate::config::{ConfigError, ConfigValues, CoreConfig, PlayerConfig, ProviderConfig};
use crate::crypto::SecretCipher;
use crate::kernel::constants::{ENCRYPT_MARKER, SECURE_STRING_SUBSTITUTE};
use crate::provider::{ConfigEntry, ConfigEntryType, ProviderType};

fn cipher() -> SecretCipher {
    SecretCipher::from_server_id("0123456789abcdef0123456789abcdef").unwrap()
}

fn radio_entries() -> Vec<ConfigEntry> {
    vec![
        ConfigEntry::new("url", ConfigEntryType::String, "Stream URL"),
        ConfigEntry::new("bitrate", ConfigEntryType::Integer, "Bitrate").with_default(320),
        ConfigEntry::new("api_key", ConfigEntryType::SecureString, "API key").optional(),
        ConfigEntry::new("help", ConfigEntryType::Label, "Enter the stream URL"),
    ]
}

#[test]
fn test_values_fall_back_to_defaults() {
    let parsed = ConfigValues::parse(radio_entries(), &values(json!({"url": "http://a"})), &cipher(), "radio");

    assert_eq!(parsed.value("url"), Some(&json!("http://a")));
    assert_eq!(parsed.value("bitrate"), Some(&json!(320)));
    assert_eq!(parsed.value("api_key"), None);
    assert_eq!(parsed.value("unknown"), None);
    assert!(parsed.validate().is_ok());
}

#[test]
fn test_to_raw_skips_defaults_and_labels() {
    let mut parsed = ConfigValues::parse(radio_entries(), &Default::default(), &cipher(), "radio");
    assert!(parsed.update("url", &json!("http://a")));
    assert!(!parsed.update("bitrate", &json!(320)));
    assert!(!parsed.update("help", &json!("ignored")));
    assert!(!parsed.update("unknown", &json!(1)));

    let raw = parsed.to_raw(&cipher()).unwrap();
    assert_eq!(serde_json::Value::Object(raw), json!({"url": "http://a"}));
}

#[test]
fn test_secrets_round_trip_through_raw_form() {
    let cipher = cipher();
    let mut parsed = ConfigValues::parse(radio_entries(), &Default::default(), &cipher, "radio");
    parsed.update("api_key", &json!("s3cret"));

    let raw = parsed.to_raw(&cipher).unwrap();
    let stored = raw["api_key"].as_str().unwrap();
    assert!(stored.starts_with(ENCRYPT_MARKER));

    let reparsed = ConfigValues::parse(radio_entries(), &raw, &cipher, "radio");
    assert_eq!(reparsed.value("api_key"), Some(&json!("s3cret")));
    assert_eq!(reparsed.masked()["api_key"], json!(SECURE_STRING_SUBSTITUTE));
}

#[test]
fn test_undecryptable_secret_is_left_unset() {
    let raw = values(json!({"api_key": format!("{}garbage", ENCRYPT_MARKER)}));

    let parsed = ConfigValues::parse(radio_entries(), &raw, &cipher(), "radio");
    assert_eq!(parsed.value("api_key"), None);
}

#[test]
fn test_provider_update_reports_changed_keys() {
    let raw = json!({
        "type": "music",
        "domain": "radio",
        "instance_id": "radio--abcd1234",
        "values": {"url": "http://a"}
    });
    let mut config = ProviderConfig::from_raw(&raw, radio_entries(), &cipher()).unwrap();
    assert!(config.enabled);
    assert_eq!(config.provider_type, ProviderType::Music);
    assert_eq!(config.display_name(), "radio--abcd1234");

    let changed = config
        .update(&values(json!({"enabled": false, "name": "Jazz", "url": "http://a", "bitrate": 128})))
        .unwrap();
    let changed: Vec<&str> = changed.iter().map(String::as_str).collect();
    assert_eq!(changed, vec!["enabled", "name", "values/bitrate"]);
    assert_eq!(config.display_name(), "Jazz");

    let err = config.update(&values(json!({"enabled": "yes"}))).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidConfig(_)));
}

#[test]
fn test_provider_raw_form_omits_cleared_error() {
    let raw = json!({
        "type": "plugin",
        "domain": "demo",
        "instance_id": "demo",
        "last_error": "boom",
        "values": {}
    });
    let mut config = ProviderConfig::from_raw(&raw, Vec::new(), &cipher()).unwrap();
    assert_eq!(config.last_error.as_deref(), Some("boom"));

    config.last_error = None;
    let stored = config.to_raw(&cipher()).unwrap();
    assert!(stored.get("last_error").is_none());
}

#[test]
fn test_malformed_provider_config_is_invalid() {
    let err = ProviderConfig::from_raw(&json!({"domain": "demo"}), Vec::new(), &cipher()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidConfig(_)));
}

#[test]
fn test_player_raw_form() {
    let raw = PlayerConfig::new_raw("kitchen", "airplay", "", true, Default::default());
    assert_eq!(raw["default_name"], json!(null));

    let config = PlayerConfig::from_raw(&raw, Vec::new(), &cipher()).unwrap();
    assert_eq!(config.display_name(), "kitchen");
    assert!(config.available);
}

#[test]
fn test_core_update_ignores_unknown_keys() {
    let entries = vec![ConfigEntry::new("port", ConfigEntryType::Integer, "Port").with_default(8095)];
    let mut config = CoreConfig::from_raw(&CoreConfig::empty_raw("webserver"), entries, &cipher()).unwrap();

    assert!(config.update(&values(json!({"enabled": false}))).is_empty());
    let changed = config.update(&values(json!({"port": 8100})));
    assert!(changed.contains("values/port"));
    assert_eq!(config.to_display()["values"]["port"], json!(8100));
}
