//! # Cadenza Core Cipher Errors
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// The server id is too short to derive a key from
    #[error("Server id is too short to derive an encryption key ({length} bytes, need {required})")]
    InvalidKey { length: usize, required: usize },

    #[error("Encryption failed")]
    EncryptionFailed,

    /// Invalid, tampered or foreign ciphertext
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}
