use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde_json::Value;
use uuid::Uuid;

use crate::crypto::error::CipherError;
use crate::kernel::constants::{CONF_SERVER_ID, ENCRYPT_MARKER};
use crate::storage::ConfigStore;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Return the persisted server id, generating and storing one on first run.
pub fn ensure_server_id(store: &ConfigStore) -> String {
    if let Some(server_id) = store.get_as::<String>(CONF_SERVER_ID).filter(|id| id.len() >= KEY_LEN) {
        return server_id;
    }
    if store.contains(CONF_SERVER_ID) {
        log::warn!("Replacing unusable server id; previously encrypted values can no longer be read");
    }
    let server_id = Uuid::new_v4().simple().to_string();
    store.set(CONF_SERVER_ID, Value::String(server_id.clone()));
    log::info!("Generated new server id");
    server_id
}

/// AES-256-GCM encryption of single string values.
///
/// Ciphertext is `_encrypted_` followed by the URL-safe base64 of
/// `nonce || ciphertext`. A fresh random nonce is used for every value.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Derive the key from the first 32 bytes of `server_id`.
    pub fn from_server_id(server_id: &str) -> Result<Self, CipherError> {
        let bytes = server_id.as_bytes();
        if bytes.len() < KEY_LEN {
            return Err(CipherError::InvalidKey {
                length: bytes.len(),
                required: KEY_LEN,
            });
        }
        let key = Key::<Aes256Gcm>::from_slice(&bytes[..KEY_LEN]);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Build the cipher from the store's server id, creating the id if needed.
    pub fn from_store(store: &ConfigStore) -> Result<Self, CipherError> {
        Self::from_server_id(&ensure_server_id(store))
    }

    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(ENCRYPT_MARKER)
    }

    /// Encrypt `plain`; already marked input is returned unchanged.
    pub fn encrypt(&self, plain: &str) -> Result<String, CipherError> {
        if Self::is_encrypted(plain) {
            return Ok(plain.to_string());
        }
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plain.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;
        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(format!("{}{}", ENCRYPT_MARKER, URL_SAFE_NO_PAD.encode(payload)))
    }

    /// Decrypt a marked value; empty or unmarked input is returned unchanged.
    pub fn decrypt(&self, value: &str) -> Result<String, CipherError> {
        let Some(encoded) = value.strip_prefix(ENCRYPT_MARKER) else {
            return Ok(value.to_string());
        };
        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| CipherError::DecryptionFailed(format!("invalid encoding: {e}")))?;
        if payload.len() <= NONCE_LEN {
            return Err(CipherError::DecryptionFailed("ciphertext too short".to_string()));
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::DecryptionFailed("authentication failed".to_string()))?;
        String::from_utf8(plain).map_err(|_| CipherError::DecryptionFailed("plaintext is not UTF-8".to_string()))
    }
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}
