//! Paste lifecycle: validation, encryption of private bodies, key
//! allocation, ownership checks.
//!
//! Everything here is synchronous and talks to SQLite directly, so handlers
//! call it from `spawn_blocking`. Owners and viewers are passed in
//! explicitly; nothing here knows how the request was authenticated.

use std::borrow::Cow;

use axum::http::StatusCode;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tinypaste_crypto::{CryptoError, KeyExhaustionError, MAX_KEY_ATTEMPTS, PasteSecret};
use tinypaste_db::Database;
use tinypaste_db::models::{NewPasteRow, PasteRow};
use tinypaste_types::models::{Paste, PasteSummary};

/// 1 MB per paste, measured in UTF-8 bytes.
pub const MAX_PASTE_BYTES: usize = 1024 * 1024;
pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 200;
pub const PREVIEW_CHARS: usize = 150;

const DECRYPTION_FAILED_PREVIEW: &str = "[decryption failed]";
const ENCRYPTED_PREVIEW: &str = "[encrypted]";

#[derive(Debug, Error)]
pub enum PasteError {
    #[error("paste content is empty")]
    Empty,

    #[error("paste is larger than 1 MB")]
    TooLarge,

    #[error("anonymous pastes must be public")]
    AnonymousPrivate,

    #[error("no encryption secret is configured; private pastes are disabled")]
    SecretUnavailable,

    #[error("paste not found")]
    NotFound,

    #[error("paste belongs to another user")]
    Forbidden,

    #[error(transparent)]
    KeyExhaustion(#[from] KeyExhaustionError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("stored paste '{0}' is not valid UTF-8")]
    Corrupt(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl PasteError {
    pub fn status(&self) -> StatusCode {
        match self {
            PasteError::Empty => StatusCode::BAD_REQUEST,
            PasteError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            PasteError::AnonymousPrivate => StatusCode::UNAUTHORIZED,
            PasteError::SecretUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            PasteError::NotFound => StatusCode::NOT_FOUND,
            PasteError::Forbidden => StatusCode::FORBIDDEN,
            PasteError::KeyExhaustion(_)
            | PasteError::Crypto(_)
            | PasteError::Corrupt(_)
            | PasteError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub struct NewPaste<'a> {
    pub content: &'a str,
    pub language: Option<&'a str>,
    pub is_public: bool,
    pub owner: Option<Uuid>,
}

/// Store a paste and return its key.
pub fn create_paste(
    db: &Database,
    secret: Option<&PasteSecret>,
    paste: &NewPaste<'_>,
) -> Result<String, PasteError> {
    create_paste_with(db, secret, paste, tinypaste_crypto::generate_key)
}

/// [`create_paste`] with the key source supplied by the caller.
///
/// Each candidate key is tried with one insert; a primary-key collision
/// moves on to the next candidate. After [`MAX_KEY_ATTEMPTS`] collisions the
/// paste is rejected with [`KeyExhaustionError`].
pub fn create_paste_with<F>(
    db: &Database,
    secret: Option<&PasteSecret>,
    paste: &NewPaste<'_>,
    mut next_key: F,
) -> Result<String, PasteError>
where
    F: FnMut() -> String,
{
    if paste.content.trim().is_empty() {
        return Err(PasteError::Empty);
    }
    if paste.content.len() > MAX_PASTE_BYTES {
        return Err(PasteError::TooLarge);
    }

    let stored: Cow<'_, [u8]> = if paste.is_public {
        Cow::Borrowed(paste.content.as_bytes())
    } else {
        if paste.owner.is_none() {
            return Err(PasteError::AnonymousPrivate);
        }
        let secret = secret.ok_or(PasteError::SecretUnavailable)?;
        Cow::Owned(tinypaste_crypto::encrypt(paste.content.as_bytes(), secret)?)
    };

    let owner = paste.owner.map(|id| id.to_string());
    let language = paste.language.map(str::trim).filter(|l| !l.is_empty());
    let row = NewPasteRow {
        content: &stored,
        language,
        is_public: paste.is_public,
        user_id: owner.as_deref(),
    };

    for attempt in 1..=MAX_KEY_ATTEMPTS {
        let key = next_key();
        if db.insert_paste(&key, &row)? {
            info!(
                "Paste {} stored (owner={:?}, public={}, {} bytes)",
                key,
                owner,
                paste.is_public,
                stored.len()
            );
            return Ok(key);
        }
        warn!("Key attempt {}/{} collided", attempt, MAX_KEY_ATTEMPTS);
    }

    error!(
        "Every one of {} generated keys was taken; the paste table may be corrupt",
        MAX_KEY_ATTEMPTS
    );
    Err(KeyExhaustionError {
        attempts: MAX_KEY_ATTEMPTS,
    }
    .into())
}

/// Load a paste for `viewer`, decrypting it if private.
pub fn load_paste(
    db: &Database,
    secret: Option<&PasteSecret>,
    key: &str,
    viewer: Option<Uuid>,
) -> Result<Paste, PasteError> {
    let row = db.get_paste(key)?.ok_or(PasteError::NotFound)?;
    let owner = owner_of(&row);

    if !row.is_public && (viewer.is_none() || viewer != owner) {
        warn!(
            "Denied private paste '{}' to {:?} (owner {:?})",
            key, viewer, owner
        );
        return Err(PasteError::Forbidden);
    }

    let content = match open_content(&row, secret) {
        Ok(bytes) => {
            String::from_utf8(bytes).map_err(|_| PasteError::Corrupt(row.key.clone()))?
        }
        Err(PasteError::Crypto(e)) => {
            error!(
                "Private paste '{}' failed to decrypt ({}): wrong secret or altered row",
                key, e
            );
            return Err(e.into());
        }
        Err(e) => return Err(e),
    };

    debug!("Loaded paste '{}' (public={})", key, row.is_public);
    Ok(Paste {
        created_at: created_at_of(&row),
        key: row.key,
        content,
        language: row.language,
        is_public: row.is_public,
        owner_id: owner,
        author: row.author,
    })
}

/// A user's pastes, newest first, with previews.
///
/// A private paste that cannot be decrypted still shows up, with a marker
/// preview, so one bad row does not hide the whole list.
pub fn list_user_pastes(
    db: &Database,
    secret: Option<&PasteSecret>,
    owner: Uuid,
    limit: u32,
) -> Result<Vec<PasteSummary>, PasteError> {
    let limit = limit.clamp(1, MAX_LIST_LIMIT);
    let rows = db.get_user_pastes(&owner.to_string(), limit)?;

    let summaries = rows
        .into_iter()
        .map(|row| {
            let preview = match open_content(&row, secret) {
                Ok(bytes) => preview_of(&String::from_utf8_lossy(&bytes)),
                Err(PasteError::SecretUnavailable) => ENCRYPTED_PREVIEW.to_string(),
                Err(e) => {
                    error!("Preview of paste '{}' failed: {}", row.key, e);
                    DECRYPTION_FAILED_PREVIEW.to_string()
                }
            };
            PasteSummary {
                created_at: created_at_of(&row),
                key: row.key,
                preview,
                language: row.language,
                is_public: row.is_public,
            }
        })
        .collect();

    Ok(summaries)
}

/// Delete one paste owned by `owner`.
pub fn delete_paste(db: &Database, key: &str, owner: Uuid) -> Result<(), PasteError> {
    let row = db.get_paste(key)?.ok_or(PasteError::NotFound)?;
    if owner_of(&row) != Some(owner) {
        warn!("User {} tried to delete paste '{}' they do not own", owner, key);
        return Err(PasteError::Forbidden);
    }

    if !db.delete_paste(key, &owner.to_string())? {
        return Err(PasteError::NotFound);
    }
    info!("Paste '{}' deleted by {}", key, owner);
    Ok(())
}

/// Delete the listed pastes that `owner` owns; others are skipped.
/// Returns `(deleted, requested)`.
pub fn delete_pastes(
    db: &Database,
    keys: &[String],
    owner: Uuid,
) -> Result<(usize, usize), PasteError> {
    let deleted = db.delete_pastes(keys, &owner.to_string())?;
    info!(
        "Batch delete by {}: {} of {} pastes removed",
        owner,
        deleted,
        keys.len()
    );
    Ok((deleted, keys.len()))
}

fn open_content(row: &PasteRow, secret: Option<&PasteSecret>) -> Result<Vec<u8>, PasteError> {
    if row.is_public {
        return Ok(row.content.clone());
    }
    let secret = secret.ok_or(PasteError::SecretUnavailable)?;
    Ok(tinypaste_crypto::decrypt(&row.content, secret)?)
}

fn owner_of(row: &PasteRow) -> Option<Uuid> {
    row.user_id.as_deref().and_then(|id| {
        id.parse()
            .map_err(|e| warn!("Corrupt user_id '{}' on paste '{}': {}", id, row.key, e))
            .ok()
    })
}

fn created_at_of(row: &PasteRow) -> chrono::DateTime<chrono::Utc> {
    tinypaste_db::parse_timestamp(&row.created_at).unwrap_or_else(|e| {
        warn!("Corrupt created_at on paste '{}': {}", row.key, e);
        chrono::DateTime::default()
    })
}

fn preview_of(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, PasteSecret, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        assert!(db.create_user(&owner.to_string(), "alice", None, "hash").unwrap());
        (db, PasteSecret::generate(), owner)
    }

    fn new_paste(content: &str, is_public: bool, owner: Option<Uuid>) -> NewPaste<'_> {
        NewPaste {
            content,
            language: Some("python"),
            is_public,
            owner,
        }
    }

    #[test]
    fn public_paste_roundtrip() {
        let (db, secret, owner) = setup();
        let key = create_paste(&db, Some(&secret), &new_paste("print(1)", true, Some(owner))).unwrap();
        assert!(tinypaste_crypto::is_valid_key(&key));

        let paste = load_paste(&db, Some(&secret), &key, None).unwrap();
        assert_eq!(paste.content, "print(1)");
        assert_eq!(paste.language.as_deref(), Some("python"));
        assert_eq!(paste.owner_id, Some(owner));
        assert_eq!(paste.author.as_deref(), Some("alice"));
    }

    #[test]
    fn private_paste_is_encrypted_at_rest() {
        let (db, secret, owner) = setup();
        let body = "secret token = hunter2";
        let key = create_paste(&db, Some(&secret), &new_paste(body, false, Some(owner))).unwrap();

        let row = db.get_paste(&key).unwrap().unwrap();
        assert!(!row.is_public);
        assert_ne!(row.content, body.as_bytes());
        assert_eq!(row.content.len(), 12 + body.len() + 16);

        let paste = load_paste(&db, Some(&secret), &key, Some(owner)).unwrap();
        assert_eq!(paste.content, body);
    }

    #[test]
    fn private_paste_hidden_from_others() {
        let (db, secret, owner) = setup();
        let key = create_paste(&db, Some(&secret), &new_paste("mine", false, Some(owner))).unwrap();

        assert!(matches!(
            load_paste(&db, Some(&secret), &key, None),
            Err(PasteError::Forbidden)
        ));
        assert!(matches!(
            load_paste(&db, Some(&secret), &key, Some(Uuid::new_v4())),
            Err(PasteError::Forbidden)
        ));
    }

    #[test]
    fn tampered_private_paste_is_a_crypto_error_not_missing() {
        let (db, secret, owner) = setup();
        let key = create_paste(&db, Some(&secret), &new_paste("intact", false, Some(owner))).unwrap();

        db.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE pastes SET content = CAST(zeroblob(40) AS BLOB) WHERE key = ?1",
                [&key],
            )?;
            Ok(())
        })
        .unwrap();

        let err = load_paste(&db, Some(&secret), &key, Some(owner)).unwrap_err();
        assert!(matches!(err, PasteError::Crypto(CryptoError::Decryption)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rotated_secret_fails_decryption() {
        let (db, secret, owner) = setup();
        let key = create_paste(&db, Some(&secret), &new_paste("old key", false, Some(owner))).unwrap();

        let other = PasteSecret::generate();
        assert!(matches!(
            load_paste(&db, Some(&other), &key, Some(owner)),
            Err(PasteError::Crypto(CryptoError::Decryption))
        ));
    }

    #[test]
    fn missing_paste_is_not_found() {
        let (db, secret, _) = setup();
        let err = load_paste(&db, Some(&secret), "Zzzz2345", None).unwrap_err();
        assert!(matches!(err, PasteError::NotFound));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rejects_blank_and_oversized_content() {
        let (db, secret, _) = setup();
        assert!(matches!(
            create_paste(&db, Some(&secret), &new_paste("  \n\t", true, None)),
            Err(PasteError::Empty)
        ));

        let big = "x".repeat(MAX_PASTE_BYTES + 1);
        assert!(matches!(
            create_paste(&db, Some(&secret), &new_paste(&big, true, None)),
            Err(PasteError::TooLarge)
        ));

        let exact = "x".repeat(MAX_PASTE_BYTES);
        assert!(create_paste(&db, Some(&secret), &new_paste(&exact, true, None)).is_ok());
    }

    #[test]
    fn private_requires_owner_and_secret() {
        let (db, secret, owner) = setup();
        assert!(matches!(
            create_paste(&db, Some(&secret), &new_paste("x", false, None)),
            Err(PasteError::AnonymousPrivate)
        ));
        assert!(matches!(
            create_paste(&db, None, &new_paste("x", false, Some(owner))),
            Err(PasteError::SecretUnavailable)
        ));
        // public pastes work without a secret
        assert!(create_paste(&db, None, &new_paste("x", true, None)).is_ok());
    }

    #[test]
    fn collision_retries_with_a_new_key() {
        let (db, secret, _) = setup();
        let first = create_paste_with(&db, Some(&secret), &new_paste("a", true, None), || {
            "Taken234".to_string()
        })
        .unwrap();
        assert_eq!(first, "Taken234");

        let mut candidates = vec!["Fresh234", "Taken234", "Taken234"];
        let second = create_paste_with(&db, Some(&secret), &new_paste("b", true, None), || {
            candidates.pop().unwrap().to_string()
        })
        .unwrap();
        assert_eq!(second, "Fresh234");
        assert_eq!(load_paste(&db, None, "Taken234", None).unwrap().content, "a");
    }

    #[test]
    fn exhaustion_after_bounded_attempts() {
        let (db, secret, _) = setup();
        create_paste_with(&db, Some(&secret), &new_paste("a", true, None), || {
            "Taken234".to_string()
        })
        .unwrap();

        let mut calls = 0;
        let err = create_paste_with(&db, Some(&secret), &new_paste("b", true, None), || {
            calls += 1;
            "Taken234".to_string()
        })
        .unwrap_err();

        assert_eq!(calls, MAX_KEY_ATTEMPTS);
        assert!(matches!(
            err,
            PasteError::KeyExhaustion(KeyExhaustionError { attempts }) if attempts == MAX_KEY_ATTEMPTS
        ));
    }

    #[test]
    fn blank_language_is_dropped() {
        let (db, secret, _) = setup();
        let paste = NewPaste {
            content: "x",
            language: Some("   "),
            is_public: true,
            owner: None,
        };
        let key = create_paste(&db, Some(&secret), &paste).unwrap();
        assert!(load_paste(&db, None, &key, None).unwrap().language.is_none());
    }

    #[test]
    fn list_decrypts_previews_and_survives_bad_rows() {
        let (db, secret, owner) = setup();
        let long = "y".repeat(PREVIEW_CHARS + 50);
        create_paste(&db, Some(&secret), &new_paste(&long, true, Some(owner))).unwrap();
        let private = create_paste(&db, Some(&secret), &new_paste("hidden", false, Some(owner))).unwrap();
        let broken = create_paste(&db, Some(&secret), &new_paste("broken", false, Some(owner))).unwrap();
        db.with_conn_mut(|conn| {
            conn.execute("UPDATE pastes SET content = x'00' WHERE key = ?1", [&broken])?;
            Ok(())
        })
        .unwrap();

        let list = list_user_pastes(&db, Some(&secret), owner, DEFAULT_LIST_LIMIT).unwrap();
        assert_eq!(list.len(), 3);

        let by_key = |k: &str| list.iter().find(|s| s.key == k).unwrap();
        assert_eq!(by_key(&private).preview, "hidden");
        assert_eq!(by_key(&broken).preview, DECRYPTION_FAILED_PREVIEW);
        let long_preview = list.iter().find(|s| s.is_public).unwrap();
        assert_eq!(long_preview.preview.chars().count(), PREVIEW_CHARS);

        let without_secret = list_user_pastes(&db, None, owner, DEFAULT_LIST_LIMIT).unwrap();
        assert!(without_secret.iter().any(|s| s.preview == ENCRYPTED_PREVIEW));
    }

    #[test]
    fn delete_checks_ownership() {
        let (db, secret, owner) = setup();
        let key = create_paste(&db, Some(&secret), &new_paste("bye", true, Some(owner))).unwrap();

        assert!(matches!(
            delete_paste(&db, &key, Uuid::new_v4()),
            Err(PasteError::Forbidden)
        ));
        delete_paste(&db, &key, owner).unwrap();
        assert!(matches!(delete_paste(&db, &key, owner), Err(PasteError::NotFound)));
    }

    #[test]
    fn anonymous_paste_cannot_be_deleted() {
        let (db, secret, owner) = setup();
        let key = create_paste(&db, Some(&secret), &new_paste("anon", true, None)).unwrap();
        assert!(matches!(delete_paste(&db, &key, owner), Err(PasteError::Forbidden)));
    }

    #[test]
    fn batch_delete_counts() {
        let (db, secret, owner) = setup();
        let a = create_paste(&db, Some(&secret), &new_paste("a", true, Some(owner))).unwrap();
        let b = create_paste(&db, Some(&secret), &new_paste("b", false, Some(owner))).unwrap();
        let anon = create_paste(&db, Some(&secret), &new_paste("c", true, None)).unwrap();

        let (deleted, requested) = delete_pastes(&db, &[a, b, anon.clone()], owner).unwrap();
        assert_eq!((deleted, requested), (2, 3));
        assert!(load_paste(&db, None, &anon, None).is_ok());
    }
}
