//! Shared application state.

use std::sync::Arc;

use atelier_store::{ConnectionPool, StoreError};
use rusqlite::Connection;

use crate::config::Settings;
use crate::errors::ApiError;

/// State shared by every handler: the connection pool and resolved settings.
#[derive(Clone)]
pub struct AppState {
    /// `SQLite` connection pool.
    pub pool: ConnectionPool,
    /// Resolved server settings.
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create state from a pool and settings.
    #[must_use]
    pub fn new(pool: ConnectionPool, settings: Arc<Settings>) -> Self {
        Self { pool, settings }
    }

    /// Run a closure against a pooled connection on the blocking pool.
    ///
    /// `SQLite` calls are synchronous, so they run under
    /// [`tokio::task::spawn_blocking`] to stay off the async workers. The
    /// closure returns [`ApiError`] directly: handlers make HTTP-level
    /// decisions (ownership 403s, visibility 404s) without leaving the
    /// connection scope, and `?` lifts [`StoreError`] along the way.
    pub async fn with_conn<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(StoreError::from)?;
            f(&conn)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("blocking task failed: {err}")))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
