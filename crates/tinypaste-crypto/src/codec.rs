//! Envelope layout: `nonce (12) || ciphertext || tag (16)`.
//!
//! This is the byte layout already persisted for private pastes, so rows
//! written by earlier deployments stay readable with the same secret.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};

use crate::error::CryptoError;
use crate::keys::PasteSecret;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Encrypt a paste body with AES-256-GCM under a fresh random nonce.
pub fn encrypt(plaintext: &[u8], secret: &PasteSecret) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(secret.as_bytes()));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    // aes-gcm appends the tag to the ciphertext
    let sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::Encryption)?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + sealed.len());
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&sealed);
    Ok(envelope)
}

/// Open an envelope produced by [`encrypt`].
pub fn decrypt(envelope: &[u8], secret: &PasteSecret) -> Result<Vec<u8>, CryptoError> {
    if envelope.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Decryption);
    }

    let (nonce_bytes, sealed) = envelope.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(secret.as_bytes()));

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), sealed)
        .map_err(|_| CryptoError::Decryption)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> PasteSecret {
        let mut key = [0u8; 32];
        for (i, b) in key.iter_mut().enumerate() {
            *b = i as u8;
        }
        PasteSecret::new(key)
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let secret = PasteSecret::generate();
        let body = "fn main() {\n    println!(\"привет\");\n}\n".as_bytes();

        let envelope = encrypt(body, &secret).unwrap();
        assert!(!envelope.windows(body.len()).any(|w| w == body));

        assert_eq!(decrypt(&envelope, &secret).unwrap(), body);
    }

    #[test]
    fn hello_envelope_has_expected_length() {
        let secret = test_secret();
        let envelope = encrypt(b"hello", &secret).unwrap();
        assert_eq!(envelope.len(), NONCE_LEN + 5 + TAG_LEN);
        assert_eq!(decrypt(&envelope, &secret).unwrap(), b"hello");
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let secret = test_secret();
        let envelope = encrypt(b"", &secret).unwrap();
        assert_eq!(envelope.len(), NONCE_LEN + TAG_LEN);
        assert!(decrypt(&envelope, &secret).unwrap().is_empty());
    }

    #[test]
    fn wrong_key_fails() {
        let secret1 = PasteSecret::generate();
        let secret2 = PasteSecret::generate();

        let envelope = encrypt(b"Secret paste", &secret1).unwrap();
        assert_eq!(decrypt(&envelope, &secret2), Err(CryptoError::Decryption));
    }

    #[test]
    fn same_plaintext_gets_fresh_nonce() {
        let secret = test_secret();
        let a = encrypt(b"same body", &secret).unwrap();
        let b = encrypt(b"same body", &secret).unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn any_flipped_byte_is_rejected() {
        let secret = test_secret();
        let envelope = encrypt(b"do not touch", &secret).unwrap();

        for i in 0..envelope.len() {
            let mut tampered = envelope.clone();
            tampered[i] ^= 0x01;
            assert_eq!(
                decrypt(&tampered, &secret),
                Err(CryptoError::Decryption),
                "byte {} was flipped",
                i
            );
        }
    }

    #[test]
    fn truncated_envelope_is_rejected() {
        let secret = test_secret();
        let envelope = encrypt(b"hello", &secret).unwrap();

        assert_eq!(decrypt(&envelope[..NONCE_LEN], &secret), Err(CryptoError::Decryption));
        assert_eq!(
            decrypt(&envelope[..envelope.len() - 1], &secret),
            Err(CryptoError::Decryption)
        );
        assert_eq!(decrypt(&[], &secret), Err(CryptoError::Decryption));
    }
}
