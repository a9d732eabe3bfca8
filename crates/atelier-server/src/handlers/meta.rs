//! Service metadata routes: root, liveness, readiness, and debug.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use atelier_store::repositories::DashboardRepo;

use crate::auth::CurrentUser;
use crate::errors::ApiResult;
use crate::guard;
use crate::state::AppState;

/// `GET /`
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Atelier Collab Manager API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "environment": state.settings.environment,
    }))
}

/// `GET /health`
///
/// Liveness only; never touches the database.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "atelier-api" }))
}

/// `GET /health/db`
///
/// Readiness: counts every table. Failure answers 503 so a balancer can
/// pull the instance while it keeps running.
pub async fn health_db(State(state): State<AppState>) -> Response {
    let counts = state
        .with_conn(|conn| DashboardRepo::table_counts(conn).map_err(Into::into))
        .await;
    match counts {
        Ok(tables) => Json(json!({ "status": "connected", "tables": tables })).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "database readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "detail": "database unavailable" })),
            )
                .into_response()
        }
    }
}

/// `GET /debug/config` (development router only).
pub async fn debug_config(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    guard::require_admin(&caller)?;
    Ok(Json(state.settings.sanitized()))
}

/// `GET /debug/db` (development router only).
pub async fn debug_db(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    guard::require_admin(&caller)?;
    let tables = state
        .with_conn(|conn| DashboardRepo::table_counts(conn).map_err(Into::into))
        .await?;
    Ok(Json(json!({
        "database_path": state.settings.database_path,
        "tables": tables,
    })))
}
