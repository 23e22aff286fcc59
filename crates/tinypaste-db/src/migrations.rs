use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, pastes)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id            TEXT PRIMARY KEY,
                subject       TEXT NOT NULL UNIQUE,
                display_name  TEXT,
                password      TEXT NOT NULL,
                created_at    TEXT NOT NULL DEFAULT (datetime('now')),
                last_login    TEXT
            );

            -- content holds UTF-8 text for public pastes and an
            -- AES-GCM envelope for private ones
            CREATE TABLE pastes (
                key         TEXT PRIMARY KEY,
                content     BLOB NOT NULL,
                language    TEXT,
                is_public   INTEGER NOT NULL DEFAULT 1 CHECK (is_public IN (0, 1)),
                user_id     TEXT REFERENCES users(id) ON DELETE SET NULL,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX idx_pastes_user
                ON pastes(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
