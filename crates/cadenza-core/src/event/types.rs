use std::any::Any;

use serde_json::Value;

use crate::event::{Event, EventPriority};

/// Notifications about stored configuration changes.
///
/// Payloads are display views: secrets are already replaced by the masking
/// placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEvent {
    ProviderConfigSaved { instance_id: String, config: Value },
    ProviderConfigRemoved { instance_id: String },
    PlayerConfigUpdated { player_id: String, config: Value },
    PlayerDspConfigUpdated { player_id: String, config: Value },
}

impl ConfigEvent {
    pub const PROVIDER_SAVED: &'static str = "config.provider.saved";
    pub const PROVIDER_REMOVED: &'static str = "config.provider.removed";
    pub const PLAYER_UPDATED: &'static str = "config.player.updated";
    pub const PLAYER_DSP_UPDATED: &'static str = "config.player_dsp.updated";

    /// Instance or player id the event is about
    pub fn object_id(&self) -> &str {
        match self {
            ConfigEvent::ProviderConfigSaved { instance_id, .. } | ConfigEvent::ProviderConfigRemoved { instance_id } => {
                instance_id
            }
            ConfigEvent::PlayerConfigUpdated { player_id, .. }
            | ConfigEvent::PlayerDspConfigUpdated { player_id, .. } => player_id,
        }
    }
}

impl Event for ConfigEvent {
    fn name(&self) -> &'static str {
        match self {
            ConfigEvent::ProviderConfigSaved { .. } => Self::PROVIDER_SAVED,
            ConfigEvent::ProviderConfigRemoved { .. } => Self::PROVIDER_REMOVED,
            ConfigEvent::PlayerConfigUpdated { .. } => Self::PLAYER_UPDATED,
            ConfigEvent::PlayerDspConfigUpdated { .. } => Self::PLAYER_DSP_UPDATED,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Application lifecycle events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEvent {
    ApplicationStart,
    ApplicationShutdown,
}

impl Event for SystemEvent {
    fn name(&self) -> &'static str {
        match self {
            SystemEvent::ApplicationStart => "application.start",
            SystemEvent::ApplicationShutdown => "application.shutdown",
        }
    }

    fn priority(&self) -> EventPriority {
        EventPriority::Critical
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
