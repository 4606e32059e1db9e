//! JWT-based authentication extractor for Axum handlers.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use polychat_core::error::CoreError;
use polychat_core::types::DbId;
use serde::Deserialize;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT access token.
///
/// The token is read from `Authorization: Bearer <token>`, or, when that
/// header is absent, from a `token` query parameter. Browsers cannot set
/// headers on a WebSocket upgrade, so the socket route relies on the
/// query form.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    pub username: String,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.get("authorization") {
            Some(value) => {
                let header = value
                    .to_str()
                    .map_err(|_| unauthorized("Invalid Authorization header"))?;
                header
                    .strip_prefix("Bearer ")
                    .ok_or_else(|| {
                        unauthorized("Invalid Authorization format. Expected: Bearer <token>")
                    })?
                    .to_string()
            }
            None => Query::<TokenQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|q| q.0.token)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| unauthorized("Missing access token"))?,
        };

        let claims = validate_token(&token, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        Ok(AuthUser {
            user_id: claims.sub,
            username: claims.username,
        })
    }
}
