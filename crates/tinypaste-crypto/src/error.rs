use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encryption failed")]
    Encryption,

    /// The envelope is truncated or its tag does not verify under the given
    /// secret. Either the secret changed or the stored bytes were altered.
    #[error("decryption failed: envelope does not authenticate")]
    Decryption,

    #[error("invalid secret: {0}")]
    InvalidSecret(String),
}

/// Every generated key collided with an existing paste.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no free paste key after {attempts} attempts")]
pub struct KeyExhaustionError {
    pub attempts: u32,
}
