//! Bearer-token authentication extractor.
//!
//! Extracts the opaque token from:
//! - `Authorization: Bearer <token>` header
//! - `?token=<token>` query parameter
//! - `token` cookie
//!
//! The query/cookie fallbacks exist for WebSocket upgrades: browsers cannot
//! set headers on a WebSocket request. The token is SHA-256 hashed and
//! compared against the `users` table by [`SqliteUserStore::authenticate`].
//!
//! [`SqliteUserStore::authenticate`]: parlance_infra::sqlite::SqliteUserStore::authenticate

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::state::AppState;

/// The authenticated caller's user id. Extracting this validates the token.
pub struct AuthedUser(pub Uuid);

impl FromRequestParts<AppState> for AuthedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts).ok_or_else(|| {
            AppError::Unauthorized(
                "Missing token. Provide via 'Authorization: Bearer <token>' header, \
                 '?token=' query parameter, or 'token' cookie."
                    .to_string(),
            )
        })?;

        match state.user_store.authenticate(&token).await {
            Ok(Some(user_id)) => Ok(AuthedUser(user_id)),
            Ok(None) => Err(AppError::Unauthorized("Invalid token".to_string())),
            Err(e) => Err(AppError::Internal(format!("Token lookup failed: {e}"))),
        }
    }
}

/// Pull the bearer token out of the request, header first.
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(auth) = parts.headers.get("authorization")
        && let Ok(value) = auth.to_str()
        && let Some(token) = value.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    if let Some(query) = parts.uri.query() {
        for pair in query.split('&') {
            if let Some(token) = pair.strip_prefix("token=")
                && !token.is_empty()
            {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie) = parts.headers.get("cookie")
        && let Ok(value) = cookie.to_str()
    {
        for part in value.split(';') {
            if let Some(token) = part.trim().strip_prefix("token=")
                && !token.is_empty()
            {
                return Some(token.to_string());
            }
        }
    }

    None
}
