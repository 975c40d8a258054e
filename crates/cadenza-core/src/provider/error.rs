//! # Cadenza Core Provider Errors
//!
//! [`ManifestError`] covers registering and loading provider manifests.
//! [`EntryValidationError`] reports a config entry whose value does not fit
//! its schema.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Provider domain '{0}' is already registered")]
    DuplicateDomain(String),

    #[error("Unknown provider domain: {0}")]
    UnknownDomain(String),

    #[error("Invalid manifest for '{domain}': {message}")]
    Invalid { domain: String, message: String },

    #[error("Failed to read manifests from '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifests: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid value for '{key}': {reason}")]
pub struct EntryValidationError {
    pub key: String,
    pub reason: String,
}

impl EntryValidationError {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
