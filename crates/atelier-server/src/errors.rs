//! The API error type and its HTTP envelope.
//!
//! Every non-2xx response is `{"detail": <text>, "status_code": <int>}`.
//! Variant payloads are the caller-facing `detail` strings, with one
//! exception: [`ApiError::Internal`] logs its payload and sends a generic
//! message, so storage and serialization failures never leak internals.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use atelier_auth::AuthError;
use atelier_store::StoreError;

/// Convenience alias for handler results.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors returned to API callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, or expired credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),

    /// The resource does not exist, or is outside the caller's scope.
    #[error("{0}")]
    NotFound(String),

    /// The request parsed but is semantically wrong.
    #[error("{0}")]
    Validation(String),

    /// The body could not be deserialized into the expected shape.
    #[error("{0}")]
    Unprocessable(String),

    /// The request collides with current state.
    #[error("{0}")]
    Conflict(String),

    /// Unexpected failure. The payload is logged, never returned.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            Self::Internal(cause) => {
                tracing::error!(%cause, "internal error");
                "Internal server error".to_owned()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "detail": detail,
            "status_code": status.as_u16(),
        }));
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            let _ = response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(detail) => Self::Conflict(detail),
            StoreError::Validation(detail) => Self::Validation(detail),
            other if other.is_not_found() => Self::NotFound(other.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(detail) => Self::Internal(detail),
            other => Self::Unauthorized(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// JSON body extractor that rejects through [`ApiError`].
///
/// Axum's stock `Json` rejection replies in plain text; routing it through
/// the error type keeps undeserializable bodies (bad JSON, missing fields,
/// values outside a closed enum) on the same envelope as every other error.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::Unprocessable(rejection.body_text())),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Unprocessable(rejection.body_text())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
