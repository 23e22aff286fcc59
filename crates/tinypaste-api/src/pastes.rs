use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{debug, error, warn};

use tinypaste_crypto::is_valid_key;
use tinypaste_types::api::{
    CreatePasteRequest, CreatePasteResponse, DeletePastesRequest, DeletePastesResponse, PasteResponse,
};
use tinypaste_types::models::Paste;

use crate::auth::AppState;
use crate::middleware::{AuthUser, CurrentUser};
use crate::service::{self, DEFAULT_LIST_LIMIT, NewPaste, PasteError};

/// Keeps one batch inside a single SQLite statement.
const MAX_BATCH_DELETE: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

/// Run a service call off the async runtime and map its error to a status.
async fn blocking<T, F>(f: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> Result<T, PasteError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .map_err(|e| {
            let status = e.status();
            if status.is_server_error() {
                error!("Paste request failed: {}", e);
            } else {
                debug!("Paste request rejected ({}): {}", status, e);
            }
            status
        })
}

/// POST /pastes — anonymous callers may only create public pastes.
pub async fn create_paste(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreatePasteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let owner = user.map(|c| c.sub);
    let st = state.clone();
    let key = blocking(move || {
        let paste = NewPaste {
            content: &req.content,
            language: req.language.as_deref(),
            is_public: req.is_public,
            owner,
        };
        service::create_paste(&st.db, st.paste_secret.as_ref(), &paste)
    })
    .await?;

    let url = format!("{}/pastes/{}", state.public_url, key);
    Ok((StatusCode::CREATED, Json(CreatePasteResponse { key, url })))
}

/// GET /pastes/{key}
pub async fn view_paste(
    State(state): State<AppState>,
    Path(key): Path<String>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, StatusCode> {
    let paste = fetch(state, key, user.map(|c| c.sub)).await?;
    Ok(Json(PasteResponse::from(paste)))
}

/// GET /pastes/{key}/raw — same access rules, body as plain text.
pub async fn raw_paste(
    State(state): State<AppState>,
    Path(key): Path<String>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, StatusCode> {
    let paste = fetch(state, key, user.map(|c| c.sub)).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], paste.content))
}

async fn fetch(state: AppState, key: String, viewer: Option<uuid::Uuid>) -> Result<Paste, StatusCode> {
    // Malformed keys can never exist, so they read as missing
    if !is_valid_key(&key) {
        warn!("Malformed paste key requested: {:?}", key);
        return Err(StatusCode::NOT_FOUND);
    }
    blocking(move || service::load_paste(&state.db, state.paste_secret.as_ref(), &key, viewer)).await
}

/// GET /me/pastes?limit=N
pub async fn list_my_pastes(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let pastes = blocking(move || {
        service::list_user_pastes(&state.db, state.paste_secret.as_ref(), claims.sub, query.limit)
    })
    .await?;
    Ok(Json(pastes))
}

/// DELETE /pastes/{key}
pub async fn delete_paste(
    State(state): State<AppState>,
    Path(key): Path<String>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, StatusCode> {
    if !is_valid_key(&key) {
        return Err(StatusCode::NOT_FOUND);
    }
    blocking(move || service::delete_paste(&state.db, &key, claims.sub)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /pastes/delete — batch delete; pastes owned by others are skipped.
pub async fn delete_selected(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<DeletePastesRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.keys.is_empty() || req.keys.len() > MAX_BATCH_DELETE {
        return Err(StatusCode::BAD_REQUEST);
    }
    let (deleted, requested) =
        blocking(move || service::delete_pastes(&state.db, &req.keys, claims.sub)).await?;
    Ok(Json(DeletePastesResponse { deleted, requested }))
}
