//! Request authentication.
//!
//! [`CurrentUser`] runs the full ladder on every protected route: header
//! present and `Bearer`-shaped, signature and expiry valid, user row
//! present, account active. The user row is loaded fresh on each request,
//! so role and active status always come from the database, never from the
//! token.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use atelier_core::{User, UserId};
use atelier_store::repositories::UserRepo;

use crate::errors::ApiError;
use crate::state::AppState;

/// The authenticated caller.
///
/// Extraction establishes who is calling; role checks live in
/// [`crate::guard`] and run inside the handlers.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.to_owned();
        let claims = atelier_auth::verify_token(&token, &state.settings.secret_key)
            .map_err(|err| {
                tracing::warn!(error = %err, "rejected bearer token");
                ApiError::from(err)
            })?;

        let user_id = UserId::from_string(claims.sub);
        let user = state
            .with_conn(move |conn| {
                UserRepo::get_by_id(conn, &user_id)?
                    .ok_or_else(|| ApiError::NotFound("User not found".into()))
            })
            .await?;

        if !user.is_active {
            return Err(ApiError::Forbidden("User account is disabled".into()));
        }
        Ok(Self(user))
    }
}

/// Pull the token out of a `Bearer` authorization header.
fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
