//! Built-in migration steps.
use serde_json::Value;

use crate::kernel::constants::{
    CONF_ONBOARD_DONE, CONF_OUTPUT_LIMITER, CONF_PLAYERS, CONF_PLAYER_DSP, CONF_PROVIDERS,
    MULTI_VALUE_SPLITTER,
};
use crate::migration::error::MigrationError;
use crate::migration::pipeline::{Migration, MigrationContext};
use crate::storage::config::value_kind;
use crate::storage::tree::ConfigMap;

/// The mapping stored under a top-level segment, if any.
fn section_mut<'a>(
    tree: &'a mut ConfigMap,
    segment: &str,
    step: &'static str,
) -> Result<Option<&'a mut ConfigMap>, MigrationError> {
    match tree.get_mut(segment) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(MigrationError::UnexpectedShape {
            step,
            path: segment.to_string(),
            expected: "mapping",
            found: value_kind(other),
        }),
    }
}

/// The `values` mapping of an entity, if it has a non-empty one.
fn values_mut(entity: &mut Value) -> Option<&mut ConfigMap> {
    entity
        .get_mut("values")
        .and_then(Value::as_object_mut)
        .filter(|values| !values.is_empty())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Drop provider entries that lost their `domain`.
#[derive(Debug, Default)]
pub struct DropCorruptProviders;

impl Migration for DropCorruptProviders {
    fn name(&self) -> &'static str {
        "drop_corrupt_providers"
    }

    fn apply(&self, tree: &mut ConfigMap, _ctx: &MigrationContext) -> Result<bool, MigrationError> {
        let Some(providers) = section_mut(tree, CONF_PROVIDERS, self.name())? else {
            return Ok(false);
        };
        let corrupt: Vec<String> = providers
            .iter()
            .filter(|(_, config)| config.get("domain").is_none())
            .map(|(instance_id, _)| instance_id.clone())
            .collect();
        for instance_id in &corrupt {
            providers.remove(instance_id);
            log::warn!("Removed corrupt provider configuration: {}", instance_id);
        }
        Ok(!corrupt.is_empty())
    }
}

/// `values.ips` (comma separated string) becomes the
/// `values.manual_discovery_ip_addresses` list.
#[derive(Debug, Default)]
pub struct ManualIpsToList;

impl Migration for ManualIpsToList {
    fn name(&self) -> &'static str {
        "manual_ips_to_list"
    }

    fn apply(&self, tree: &mut ConfigMap, _ctx: &MigrationContext) -> Result<bool, MigrationError> {
        let Some(providers) = section_mut(tree, CONF_PROVIDERS, self.name())? else {
            return Ok(false);
        };
        let mut changed = false;
        for config in providers.values_mut() {
            let Some(values) = values_mut(config) else {
                continue;
            };
            let Some(ips) = values.get("ips").filter(|ips| is_truthy(ips)).cloned() else {
                continue;
            };
            let addresses = match ips {
                Value::String(ips) => ips.split(',').map(|ip| Value::String(ip.to_string())).collect(),
                Value::Array(items) => items,
                other => vec![other],
            };
            values.insert("manual_discovery_ip_addresses".to_string(), Value::Array(addresses));
            values.remove("ips");
            changed = true;
        }
        Ok(changed)
    }
}

/// `values.sample_rates` stored as `[rate, bits]` pairs become `"rate$$bits"`
/// strings. A non-list value is dropped.
#[derive(Debug, Default)]
pub struct SampleRatesToStrings;

impl Migration for SampleRatesToStrings {
    fn name(&self) -> &'static str {
        "sample_rates_to_strings"
    }

    fn apply(&self, tree: &mut ConfigMap, _ctx: &MigrationContext) -> Result<bool, MigrationError> {
        let Some(players) = section_mut(tree, CONF_PLAYERS, self.name())? else {
            return Ok(false);
        };
        let mut changed = false;
        for config in players.values_mut() {
            let Some(values) = values_mut(config) else {
                continue;
            };
            let Some(sample_rates) = values.get("sample_rates").filter(|rates| is_truthy(rates)).cloned() else {
                continue;
            };
            let Value::Array(rates) = sample_rates else {
                values.remove("sample_rates");
                changed = true;
                continue;
            };
            if !rates.iter().any(Value::is_array) {
                continue;
            }
            let migrated = rates.iter().map(pack_sample_rate).collect();
            values.insert("sample_rates".to_string(), Value::Array(migrated));
            changed = true;
        }
        Ok(changed)
    }
}

fn pack_sample_rate(rate: &Value) -> Value {
    match rate.as_array().map(Vec::as_slice) {
        Some([sample_rate, bit_depth, ..]) => {
            Value::String(format!("{}{}{}", scalar_text(sample_rate), MULTI_VALUE_SPLITTER, scalar_text(bit_depth)))
        }
        _ => rate.clone(),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A disabled `output_limiter` on an enabled DSP config moves into the
/// owning player's values. The old DSP key is deleted either way.
#[derive(Debug, Default)]
pub struct RelocateOutputLimiter;

impl Migration for RelocateOutputLimiter {
    fn name(&self) -> &'static str {
        "relocate_output_limiter"
    }

    fn apply(&self, tree: &mut ConfigMap, _ctx: &MigrationContext) -> Result<bool, MigrationError> {
        let mut changed = false;
        let mut relocate = Vec::new();
        if let Some(dsp_configs) = section_mut(tree, CONF_PLAYER_DSP, self.name())? {
            for (player_id, dsp) in dsp_configs.iter_mut() {
                let Some(dsp) = dsp.as_object_mut() else {
                    continue;
                };
                let (Some(limiter), Some(enabled)) = (dsp.get(CONF_OUTPUT_LIMITER), dsp.get("enabled")) else {
                    continue;
                };
                if limiter.is_null() || enabled.is_null() || is_truthy(limiter) {
                    continue;
                }
                if is_truthy(enabled) {
                    relocate.push(player_id.clone());
                }
                dsp.remove(CONF_OUTPUT_LIMITER);
                changed = true;
            }
        }
        if relocate.is_empty() {
            return Ok(changed);
        }
        if let Some(players) = section_mut(tree, CONF_PLAYERS, self.name())? {
            for player_id in &relocate {
                let Some(player) = players.get_mut(player_id).and_then(Value::as_object_mut) else {
                    continue;
                };
                let values = player
                    .entry("values".to_string())
                    .or_insert_with(|| Value::Object(ConfigMap::new()));
                if let Some(values) = values.as_object_mut() {
                    values.insert(CONF_OUTPUT_LIMITER.to_string(), Value::Bool(false));
                }
            }
        }
        Ok(changed)
    }
}

/// Sets `onboard_done` when it was never set and any non-builtin provider is configured.
#[derive(Debug, Default)]
pub struct BackfillOnboardDone;

impl Migration for BackfillOnboardDone {
    fn name(&self) -> &'static str {
        "backfill_onboard_done"
    }

    fn apply(&self, tree: &mut ConfigMap, ctx: &MigrationContext) -> Result<bool, MigrationError> {
        if tree.get(CONF_ONBOARD_DONE).is_some_and(|flag| !flag.is_null()) {
            return Ok(false);
        }
        let Some(providers) = section_mut(tree, CONF_PROVIDERS, self.name())? else {
            return Ok(false);
        };
        let user_configured = providers.values().any(|config| {
            config
                .get("domain")
                .and_then(Value::as_str)
                .is_some_and(|domain| !ctx.builtin_domains.contains(domain))
        });
        if user_configured {
            tree.insert(CONF_ONBOARD_DONE.to_string(), Value::Bool(true));
        }
        Ok(user_configured)
    }
}

/// Renames a provider domain, re-keying its instances.
#[derive(Debug)]
pub struct RenameProviderDomain {
    from: &'static str,
    to: &'static str,
}

impl RenameProviderDomain {
    pub fn new(from: &'static str, to: &'static str) -> Self {
        Self { from, to }
    }
}

impl Migration for RenameProviderDomain {
    fn name(&self) -> &'static str {
        "rename_provider_domain"
    }

    fn apply(&self, tree: &mut ConfigMap, _ctx: &MigrationContext) -> Result<bool, MigrationError> {
        let Some(providers) = section_mut(tree, CONF_PROVIDERS, self.name())? else {
            return Ok(false);
        };
        let renamed: Vec<String> = providers
            .iter()
            .filter(|(_, config)| config.get("domain").and_then(Value::as_str) == Some(self.from))
            .map(|(instance_id, _)| instance_id.clone())
            .collect();
        for instance_id in &renamed {
            let Some(mut config) = providers.remove(instance_id) else {
                continue;
            };
            let new_instance_id = instance_id.replace(self.from, self.to);
            if let Some(config) = config.as_object_mut() {
                config.insert("instance_id".to_string(), Value::String(new_instance_id.clone()));
                config.insert("domain".to_string(), Value::String(self.to.to_string()));
            }
            log::info!("Renamed provider instance {} to {}", instance_id, new_instance_id);
            providers.insert(new_instance_id, config);
        }
        Ok(!renamed.is_empty())
    }
}

/// `values.hide_player` becomes `values.hide_player_in_ui = ["always"]`.
#[derive(Debug, Default)]
pub struct HidePlayerToUiOption;

impl Migration for HidePlayerToUiOption {
    fn name(&self) -> &'static str {
        "hide_player_to_ui_option"
    }

    fn apply(&self, tree: &mut ConfigMap, _ctx: &MigrationContext) -> Result<bool, MigrationError> {
        let Some(players) = section_mut(tree, CONF_PLAYERS, self.name())? else {
            return Ok(false);
        };
        let mut changed = false;
        for config in players.values_mut() {
            let Some(values) = values_mut(config) else {
                continue;
            };
            let Some(hidden) = values.remove("hide_player") else {
                continue;
            };
            if is_truthy(&hidden) {
                values.insert(
                    "hide_player_in_ui".to_string(),
                    Value::Array(vec![Value::String("always".to_string())]),
                );
            }
            changed = true;
        }
        Ok(changed)
    }
}
