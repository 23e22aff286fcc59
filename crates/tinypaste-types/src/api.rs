use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Paste;

// -- Token claims --

/// Bearer token claims. Also synthesized for requests that authenticate
/// with Basic credentials, so handlers see one shape either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub token: String,
}

// -- Pastes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePasteRequest {
    pub content: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePasteResponse {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasteResponse {
    pub key: String,
    pub content: String,
    pub language: Option<String>,
    pub is_public: bool,
    pub author: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Paste> for PasteResponse {
    fn from(paste: Paste) -> Self {
        Self {
            key: paste.key,
            content: paste.content,
            language: paste.language,
            is_public: paste.is_public,
            author: paste.author,
            created_at: paste.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeletePastesRequest {
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletePastesResponse {
    pub deleted: usize,
    pub requested: usize,
}
