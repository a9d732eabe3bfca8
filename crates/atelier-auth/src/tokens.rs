//! HS256 bearer tokens.
//!
//! Tokens carry only the subject (user id), issue time, and expiry. Role and
//! activation state are deliberately absent: callers must re-read the user
//! row on every request, so a role change or deactivation takes effect
//! immediately rather than at token expiry.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, Result};

/// Claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id the token was minted for.
    pub sub: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Mint a signed access token for `user_id`, valid for `ttl_minutes`.
pub fn mint_token(user_id: &str, secret: &str, ttl_minutes: i64) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_owned(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| AuthError::Signing(err.to_string()))
}

/// Verify a token's signature and expiry, returning its claims.
///
/// Expiry is checked with zero leeway so a token is rejected the second it
/// lapses. An empty `sub` is reported separately from a bad signature.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    if data.claims.sub.is_empty() {
        return Err(AuthError::MissingSubject);
    }
    Ok(data.claims)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
