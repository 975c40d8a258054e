use serde_json::json;

use crate::provider::{log_level_entry, ConfigEntry, ConfigEntryType, ConfigValueOption};

#[test]
fn test_required_entry_needs_a_value() {
    let mut entry = ConfigEntry::new("url", ConfigEntryType::String, "URL");
    let err = entry.validate().unwrap_err();
    assert_eq!(err.key, "url");

    entry.value = Some(json!("http://a"));
    assert!(entry.validate().is_ok());

    let optional = ConfigEntry::new("url", ConfigEntryType::String, "URL").optional();
    assert!(optional.validate().is_ok());
}

#[test]
fn test_default_satisfies_required_entry() {
    let entry = ConfigEntry::new("port", ConfigEntryType::Integer, "Port").with_default(8095);
    assert_eq!(entry.current_value(), Some(&json!(8095)));
    assert!(entry.validate().is_ok());
}

#[test]
fn test_type_mismatch_is_rejected() {
    let mut entry = ConfigEntry::new("port", ConfigEntryType::Integer, "Port");
    entry.value = Some(json!("8095"));
    assert!(entry.validate().is_err());

    entry.value = Some(json!(80.5));
    assert!(entry.validate().is_err());

    let mut float = ConfigEntry::new("gain", ConfigEntryType::Float, "Gain");
    float.value = Some(json!(3));
    assert!(float.validate().is_ok());
}

#[test]
fn test_options_and_range() {
    let mut quality = ConfigEntry::new("quality", ConfigEntryType::String, "Quality").with_options(vec![
        ConfigValueOption::new("Low", "low"),
        ConfigValueOption::new("High", "high"),
    ]);
    quality.value = Some(json!("medium"));
    assert!(quality.validate().is_err());
    quality.value = Some(json!("high"));
    assert!(quality.validate().is_ok());

    let mut port = ConfigEntry::new("port", ConfigEntryType::Integer, "Port").with_range(1.0, 65535.0);
    port.value = Some(json!(0));
    assert!(port.validate().is_err());
    port.value = Some(json!(65535));
    assert!(port.validate().is_ok());
}

#[test]
fn test_multi_value_entries_validate_each_item() {
    let mut ips = ConfigEntry::new("ips", ConfigEntryType::String, "IP addresses").multi_value();
    ips.value = Some(json!(["10.0.0.1", "10.0.0.2"]));
    assert!(ips.validate().is_ok());

    ips.value = Some(json!(["10.0.0.1", 7]));
    assert!(ips.validate().is_err());

    ips.value = Some(json!("10.0.0.1"));
    assert!(ips.validate().is_err());
}

#[test]
fn test_labels_never_fail_validation() {
    let label = ConfigEntry::new("help", ConfigEntryType::Label, "Read the docs");
    assert!(label.validate().is_ok());
    assert!(!label.is_secure());
}

#[test]
fn test_log_level_entry() {
    let entry = log_level_entry();
    assert_eq!(entry.key, "log_level");
    assert_eq!(entry.current_value(), Some(&json!("GLOBAL")));
    assert!(entry.validate().is_ok());

    let values: Vec<_> = entry.options.iter().map(|option| option.value.clone()).collect();
    assert!(values.contains(&json!("DEBUG")));
}

#[test]
fn test_entry_deserializes_with_defaults() {
    let entry: ConfigEntry = serde_json::from_value(json!({"key": "token", "type": "secure_string"})).unwrap();
    assert!(entry.is_secure());
    assert!(entry.required);
    assert!(!entry.hidden);
    assert_eq!(entry.value, None);
}
