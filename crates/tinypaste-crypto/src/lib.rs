/// tinypaste crypto library
///
/// Two independent, stateless pieces:
/// - `keygen`: short URL-safe paste keys
/// - `codec`: AES-256-GCM envelopes for private paste bodies
///
/// The server secret (`keys::PasteSecret`) is always passed in by the caller.

pub mod codec;
pub mod error;
pub mod keygen;
pub mod keys;

pub use codec::{decrypt, encrypt};
pub use error::{CryptoError, KeyExhaustionError};
pub use keygen::{MAX_KEY_ATTEMPTS, generate_key, is_valid_key};
pub use keys::PasteSecret;
