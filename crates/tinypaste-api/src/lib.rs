pub mod auth;
pub mod middleware;
pub mod pastes;
pub mod service;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use crate::auth::AppState;

/// Request bodies are capped above the paste limit so JSON escaping of a
/// 1 MB paste still fits; the service enforces the exact paste size.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// All HTTP routes. CORS and request tracing are layered on by the binary.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let paste_routes = Router::new()
        .route("/pastes", post(pastes::create_paste))
        .route("/pastes/delete", post(pastes::delete_selected))
        .route("/pastes/{key}", get(pastes::view_paste).delete(pastes::delete_paste))
        .route("/pastes/{key}/raw", get(pastes::raw_paste))
        .route("/me/pastes", get(pastes::list_my_pastes))
        .layer(from_fn_with_state(state.clone(), middleware::authenticate));

    Router::new()
        .route("/health", get(health))
        .merge(auth_routes)
        .merge(paste_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
