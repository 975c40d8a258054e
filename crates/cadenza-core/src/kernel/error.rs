//! # Cadenza Core Kernel Errors
//!
//! Defines the crate-wide error type.
//!
//! Every subsystem owns a typed error enum ([`StorageSystemError`],
//! [`CipherError`], [`MigrationError`], [`ManifestError`], [`ConfigError`],
//! [`EventSystemError`]). [`Error`] wraps each of them so that bootstrap code
//! and binaries can work with a single `Result` alias, while library callers
//! can still match on the subsystem error they care about.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::config::error::ConfigError;
use crate::crypto::error::CipherError;
use crate::event::error::EventSystemError;
use crate::migration::error::MigrationError;
use crate::provider::error::ManifestError;
use crate::storage::error::StorageSystemError;

/// Boxed error returned by external collaborators (runtimes, resolvers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Crate-wide error type
#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed storage system error
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    /// Secret encryption or decryption failure
    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Config lifecycle error (validation, policy, activation)
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Event system error: {0}")]
    EventSystem(#[from] EventSystemError),

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase:?}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        component_name: Option<String>,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Represents a specific phase in the kernel's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Initialize")]
    Initialize,
    #[error("Start")]
    Start,
    #[error("Shutdown")]
    Shutdown,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}
