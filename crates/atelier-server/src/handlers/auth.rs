//! Session routes: login, logout, identity, and registration.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use atelier_auth::{hash_password, mint_token, verify_password};
use atelier_core::{Role, User};
use atelier_store::repositories::{CreateUserOptions, UserRepo};

use crate::auth::CurrentUser;
use crate::errors::{ApiError, ApiJson, ApiResult};
use crate::guard;
use crate::state::AppState;

/// Body of `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email, matched case-insensitively.
    pub email: String,
    /// Plaintext password, verified against the stored hash.
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Login email; must be unused.
    pub email: String,
    /// Short handle; must be unused.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// Plaintext password, at least 8 characters.
    pub password: String,
    /// Role for the new account.
    pub role: Role,
}

/// `POST /auth/login`
///
/// Unknown email and wrong password answer identically, so the response
/// never confirms whether an address is registered.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let email = body.email.trim().to_lowercase();
    let password = body.password;

    let user = state
        .with_conn(move |conn| {
            let Some((user, stored_hash)) = UserRepo::find_by_email(conn, &email)? else {
                tracing::warn!("login rejected: unknown email");
                return Err(ApiError::Unauthorized("Incorrect email or password".into()));
            };
            if !verify_password(&password, &stored_hash) {
                tracing::warn!(user_id = %user.id, "login rejected: bad password");
                return Err(ApiError::Unauthorized("Incorrect email or password".into()));
            }
            if !user.is_active {
                tracing::warn!(user_id = %user.id, "login rejected: inactive account");
                return Err(ApiError::Forbidden("Inactive user".into()));
            }
            Ok(user)
        })
        .await?;

    let token = mint_token(
        user.id.as_str(),
        &state.settings.secret_key,
        state.settings.token_ttl_minutes,
    )?;
    tracing::info!(user_id = %user.id, role = %user.role, "login");
    Ok(Json(json!({
        "message": "Login successful",
        "access_token": token,
        "token_type": "bearer",
        "user": user,
    })))
}

/// `POST /auth/logout`
///
/// Tokens are stateless, so there is nothing to revoke server-side; the
/// client discards its copy. The route exists so every session action has
/// a uniform endpoint.
pub async fn logout(CurrentUser(user): CurrentUser) -> Json<Value> {
    tracing::info!(user_id = %user.id, "logout");
    Json(json!({ "message": "Successfully logged out" }))
}

/// `GET /auth/me`
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// `POST /auth/register` (admin only).
pub async fn register(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    guard::require_admin(&caller)?;

    let email = body.email.trim().to_lowercase();
    let username = body.username.trim().to_owned();
    let full_name = body.full_name.trim().to_owned();
    if email.is_empty() || username.is_empty() || full_name.is_empty() {
        return Err(ApiError::Validation(
            "email, username, and full_name are required".into(),
        ));
    }
    if body.password.chars().count() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let role = body.role;
    let password = body.password;
    let user = state
        .with_conn(move |conn| {
            let password_hash = hash_password(&password);
            UserRepo::create(
                conn,
                &CreateUserOptions {
                    email: &email,
                    username: &username,
                    full_name: &full_name,
                    role,
                    password_hash: &password_hash,
                },
            )
            .map_err(Into::into)
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully", "user": user })),
    ))
}
