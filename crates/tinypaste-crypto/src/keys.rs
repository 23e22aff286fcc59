use std::fmt;

use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use base64::{
    Engine as _,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};

use crate::error::CryptoError;

pub const SECRET_LEN: usize = 32;

/// Server-held AES-256 key for private paste bodies.
#[derive(Clone, PartialEq, Eq)]
pub struct PasteSecret([u8; SECRET_LEN]);

impl PasteSecret {
    pub fn new(bytes: [u8; SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a random 256-bit secret.
    pub fn generate() -> Self {
        let mut key = [0u8; SECRET_LEN];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Decode a URL-safe base64 secret, padded or not.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let encoded = encoded.trim();
        let bytes = URL_SAFE
            .decode(encoded)
            .or_else(|_| URL_SAFE_NO_PAD.decode(encoded))
            .map_err(|e| CryptoError::InvalidSecret(format!("not url-safe base64: {}", e)))?;

        let len = bytes.len();
        let key: [u8; SECRET_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidSecret(format!("expected {} bytes, got {}", SECRET_LEN, len))
        })?;
        Ok(Self(key))
    }

    /// Encode for `.env` files. Padded, like the secrets the service was
    /// originally deployed with.
    pub fn to_base64(&self) -> String {
        URL_SAFE.encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }
}

impl fmt::Debug for PasteSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasteSecret(..)")
    }
}
