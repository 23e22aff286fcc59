use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A paste as seen by its reader. `content` is always plaintext here;
/// private bodies have already been decrypted by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paste {
    pub key: String,
    pub content: String,
    pub language: Option<String>,
    pub is_public: bool,
    pub owner_id: Option<Uuid>,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of a user's paste list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasteSummary {
    pub key: String,
    pub preview: String,
    pub language: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}
