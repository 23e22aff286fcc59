use crate::Database;
use crate::models::{NewPasteRow, PasteRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row, ffi};
use std::ffi::c_int;
use tracing::{debug, warn};

const PASTE_COLUMNS: &str = "p.key, p.content, p.language, p.is_public, p.user_id,
     COALESCE(u.display_name, u.subject), p.created_at";

impl Database {
    // -- Users --

    /// Returns `false` if the subject is already taken.
    pub fn create_user(
        &self,
        id: &str,
        subject: &str,
        display_name: Option<&str>,
        password_hash: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let res = conn.execute(
                "INSERT INTO users (id, subject, display_name, password) VALUES (?1, ?2, ?3, ?4)",
                (id, subject, display_name, password_hash),
            );
            match res {
                Ok(_) => Ok(true),
                Err(e) if is_constraint(&e, ffi::SQLITE_CONSTRAINT_UNIQUE) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_subject(&self, subject: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_subject(conn, subject))
    }

    pub fn touch_last_login(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_login = datetime('now') WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }

    // -- Pastes --

    /// Insert a paste under `key`.
    ///
    /// Returns `false` when the key already exists; the existing row is left
    /// untouched. The primary-key constraint makes this an atomic
    /// check-then-insert.
    pub fn insert_paste(&self, key: &str, paste: &NewPasteRow<'_>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let res = conn.execute(
                "INSERT INTO pastes (key, content, language, is_public, user_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![key, paste.content, paste.language, paste.is_public, paste.user_id],
            );
            match res {
                Ok(_) => Ok(true),
                Err(e) if is_constraint(&e, ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => {
                    warn!("Paste key collision on '{}'", key);
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_paste(&self, key: &str) -> Result<Option<PasteRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PASTE_COLUMNS}
                 FROM pastes p
                 LEFT JOIN users u ON p.user_id = u.id
                 WHERE p.key = ?1"
            );
            let row = conn.query_row(&sql, [key], paste_from_row).optional()?;
            Ok(row)
        })
    }

    /// Newest first.
    pub fn get_user_pastes(&self, user_id: &str, limit: u32) -> Result<Vec<PasteRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PASTE_COLUMNS}
                 FROM pastes p
                 LEFT JOIN users u ON p.user_id = u.id
                 WHERE p.user_id = ?1
                 ORDER BY p.created_at DESC, p.rowid DESC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], paste_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            debug!("Fetched {} pastes for user {}", rows.len(), user_id);
            Ok(rows)
        })
    }

    /// Delete one paste if `user_id` owns it. Returns whether a row went away.
    pub fn delete_paste(&self, key: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM pastes WHERE key = ?1 AND user_id = ?2",
                [key, user_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Batch delete, restricted to pastes owned by `user_id`.
    /// Returns the number of rows deleted.
    pub fn delete_pastes(&self, keys: &[String], user_id: &str) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        self.with_conn_mut(|conn| {
            let placeholders: Vec<String> = (2..=keys.len() + 1).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "DELETE FROM pastes WHERE user_id = ?1 AND key IN ({})",
                placeholders.join(", ")
            );

            let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::with_capacity(keys.len() + 1);
            params.push(&user_id);
            params.extend(keys.iter().map(|k| k as &dyn rusqlite::types::ToSql));

            let n = conn.execute(&sql, params.as_slice())?;
            Ok(n)
        })
    }
}

fn query_user_by_subject(conn: &Connection, subject: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, subject, display_name, password, created_at, last_login
         FROM users WHERE subject = ?1",
    )?;

    let row = stmt
        .query_row([subject], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                subject: row.get(1)?,
                display_name: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
                last_login: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn paste_from_row(row: &Row<'_>) -> rusqlite::Result<PasteRow> {
    Ok(PasteRow {
        key: row.get(0)?,
        content: row.get(1)?,
        language: row.get(2)?,
        is_public: row.get(3)?,
        user_id: row.get(4)?,
        author: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn is_constraint(err: &rusqlite::Error, extended_code: c_int) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.extended_code == extended_code)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
