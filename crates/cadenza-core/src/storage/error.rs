//! # Cadenza Core Storage System Errors
//!
//! Defines error types specific to the storage system.
//!
//! [`StorageSystemError`] covers file I/O against the storage provider,
//! (de)serialization of the settings tree and of the store's own settings
//! file, and failed durable writes.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageSystemError {
    #[error("I/O error during operation '{operation}' on path '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found at path: {0}")]
    FileNotFound(PathBuf),

    #[error("Serialization to '{format}' failed: {source}")]
    SerializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Deserialization from '{format}' failed: {source}")]
    DeserializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedConfigFormat(String),

    #[error("Settings root must be a mapping, found {found}")]
    InvalidRoot { found: String },

    #[error("Durable write of '{path}' failed: {message}")]
    PersistenceFailed {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<StorageSystemError>>,
    },

    #[error("Invalid store settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid path provided: '{path}': {reason}")]
    InvalidPath { path: PathBuf, reason: String },
}

// Helper for creating Io errors, ensuring path is always included.
impl StorageSystemError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        StorageSystemError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }

    /// Wrap a lower level failure as a failed durable write of `path`.
    pub fn persistence(path: PathBuf, source: StorageSystemError) -> Self {
        StorageSystemError::PersistenceFailed {
            path,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageSystemError>;
