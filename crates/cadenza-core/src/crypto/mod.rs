//! # Cadenza Core Secrets
//!
//! Encryption of individual secret values at rest.
//!
//! The key is derived from the server id, a random identifier generated on
//! first run and stored unencrypted in the settings tree. Encrypted values
//! carry the `_encrypted_` marker so any consumer can recognise them and show
//! a placeholder instead of the plaintext.
pub mod cipher;
pub mod error;

pub use cipher::{ensure_server_id, SecretCipher};
pub use error::CipherError;
