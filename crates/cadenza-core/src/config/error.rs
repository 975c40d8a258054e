//! # Cadenza Core Config Errors
//!
//! [`ConfigError`] is returned by every lifecycle operation of the
//! [`ConfigController`](crate::config::ConfigController). Validation and
//! policy failures happen before anything is persisted; `ActivationFailed`
//! is raised after the just-persisted entity was rolled back.
use std::fmt;

use thiserror::Error;

use crate::crypto::error::CipherError;
use crate::kernel::error::BoxError;
use crate::provider::error::{EntryValidationError, ManifestError};
use crate::storage::error::StorageSystemError;

/// Kind of configuration entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Provider,
    Player,
    CoreModule,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Provider => "provider",
            EntityKind::Player => "player",
            EntityKind::CoreModule => "core module",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No config found for {kind} '{id}'")]
    NotFound { kind: EntityKind, id: String },

    #[error("Unknown provider domain: {0}")]
    UnknownDomain(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Provider '{domain}' depends on '{depends_on}', which has no active instance")]
    DependencyUnmet { domain: String, depends_on: String },

    #[error("Provider '{0}' does not support multiple instances")]
    MultiInstanceForbidden(String),

    #[error("{0} can not be removed")]
    RemovalForbidden(String),

    #[error("Provider '{0}' can not be disabled")]
    DisableNotAllowed(String),

    #[error("Action unavailable: {0}")]
    ActionUnavailable(String),

    #[error("Activation of '{instance_id}' failed: {source}")]
    ActivationFailed {
        instance_id: String,
        #[source]
        source: BoxError,
    },

    #[error("Config entry resolution for {scope} failed: {source}")]
    Resolver {
        scope: String,
        #[source]
        source: BoxError,
    },

    /// A runtime collaborator refused the change
    #[error("{operation} was rejected: {source}")]
    Rejected {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Secret handling failed: {0}")]
    Cipher(#[from] CipherError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageSystemError),
}

impl ConfigError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        ConfigError::NotFound { kind, id: id.into() }
    }
}

impl From<EntryValidationError> for ConfigError {
    fn from(err: EntryValidationError) -> Self {
        ConfigError::InvalidConfig(err.to_string())
    }
}

impl From<ManifestError> for ConfigError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::UnknownDomain(domain) => ConfigError::UnknownDomain(domain),
            other => ConfigError::InvalidConfig(other.to_string()),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
