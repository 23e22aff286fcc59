/// Database row types — these map directly to SQLite rows.
/// Distinct from tinypaste-types models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub subject: String,
    pub display_name: Option<String>,
    pub password: String,
    pub created_at: String,
    pub last_login: Option<String>,
}

pub struct PasteRow {
    pub key: String,
    /// Raw bytes as stored: plaintext or envelope, depending on `is_public`.
    pub content: Vec<u8>,
    pub language: Option<String>,
    pub is_public: bool,
    pub user_id: Option<String>,
    /// Owner's display name, falling back to the subject. Filled by a join.
    pub author: Option<String>,
    pub created_at: String,
}

pub struct NewPasteRow<'a> {
    pub content: &'a [u8],
    pub language: Option<&'a str>,
    pub is_public: bool,
    pub user_id: Option<&'a str>,
}
