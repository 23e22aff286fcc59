use rand::Rng;

/// URL-safe alphabet without look-alike characters (`0 1 I O l`).
pub const KEY_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// 57^8 ≈ 1.1e14 possible keys.
pub const KEY_LEN: usize = 8;

/// How many fresh keys a caller tries before giving up with
/// [`KeyExhaustionError`](crate::KeyExhaustionError).
pub const MAX_KEY_ATTEMPTS: u32 = 5;

/// Generate a random paste key.
///
/// Uniqueness is not checked here. The caller inserts under the key and
/// retries with a new one on a collision, at most [`MAX_KEY_ATTEMPTS`] times.
pub fn generate_key() -> String {
    let mut rng = rand::rng();
    (0..KEY_LEN)
        .map(|_| KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

/// Whether `key` could have come from [`generate_key`].
pub fn is_valid_key(key: &str) -> bool {
    key.len() == KEY_LEN && key.bytes().all(|b| KEY_ALPHABET.contains(&b))
}
