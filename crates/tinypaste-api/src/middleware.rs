use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{
    Authorization, HeaderMapExt,
    authorization::{Basic, Bearer},
};
use tracing::{debug, error};

use tinypaste_types::api::Claims;

use crate::auth::{self, AppState};

/// Resolve the caller from the Authorization header, if any.
///
/// Accepts a bearer JWT or Basic credentials. Anonymous requests pass
/// through without claims; a header that is present but invalid is a 401.
/// Handlers read the outcome with [`CurrentUser`] or [`AuthUser`].
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let bearer = req.headers().typed_get::<Authorization<Bearer>>();
    let basic = req.headers().typed_get::<Authorization<Basic>>();
    let has_header = req.headers().contains_key(header::AUTHORIZATION);

    let claims = if let Some(bearer) = bearer {
        Some(auth::decode_token(&state.jwt_secret, bearer.token()).map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            StatusCode::UNAUTHORIZED
        })?)
    } else if let Some(basic) = basic {
        let username = basic.username().to_string();
        let password = basic.password().to_string();
        let db = state.clone();
        let user = tokio::task::spawn_blocking(move || {
            auth::verify_credentials(&db.db, &username, &password)
        })
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .map_err(|e| { error!("Basic auth lookup failed: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

        Some(Claims {
            sub: user.id.parse().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
            username: user.subject,
            exp: chrono::Utc::now().timestamp() as usize,
        })
    } else if has_header {
        return Err(StatusCode::UNAUTHORIZED);
    } else {
        None
    };

    if let Some(claims) = claims {
        req.extensions_mut().insert(claims);
    }
    Ok(next.run(req).await)
}

/// The caller's claims, or `None` for anonymous requests.
pub struct CurrentUser(pub Option<Claims>);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(parts.extensions.get::<Claims>().cloned()))
    }
}

/// The caller's claims; anonymous requests are rejected with 401.
pub struct AuthUser(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
