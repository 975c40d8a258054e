//! # Cadenza Core Config Lifecycle
//!
//! Typed views of the entities stored in the settings tree and the
//! [`ConfigController`] that creates, updates and removes them.
//!
//! Every lifecycle operation validates before it persists and persists before
//! it activates. A provider whose activation fails right after being added is
//! removed again, so the settings file never holds a config the runtime
//! refuses to run.
pub mod controller;
pub mod dsp;
pub mod error;
pub mod models;

pub use controller::ConfigController;
pub use dsp::{DspConfig, DspFilter, ParametricEqBand, ParametricEqBandType};
pub use error::{ConfigError, ConfigResult, EntityKind};
pub use models::{ChangedKeys, ConfigValues, CoreConfig, PlayerConfig, ProviderConfig};

#[cfg(test)]
mod tests;
