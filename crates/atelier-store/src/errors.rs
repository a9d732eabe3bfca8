//! Error types for the persistence layer.
//!
//! [`StoreError`] is returned by every repository operation. Variants split
//! along the lines the HTTP layer cares about: missing rows, state-machine
//! conflicts, input validation, and infrastructure failures. Display strings
//! for the domain variants are the caller-facing `detail` text, so handlers
//! can surface them verbatim.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// Requested user was not found.
    #[error("User not found")]
    UserNotFound,

    /// The user named as a project owner was not found.
    #[error("Client not found")]
    ClientNotFound,

    /// The user named as a task assignee was not found.
    #[error("Assigned user not found: {0}")]
    AssignedUserNotFound(String),

    /// Requested project was not found.
    #[error("Project not found")]
    ProjectNotFound,

    /// Requested ticket was not found.
    #[error("Ticket not found")]
    TicketNotFound,

    /// Requested task was not found.
    #[error("Task not found")]
    TaskNotFound,

    /// The caller has no open time session on the task.
    #[error("No active timer found")]
    NoActiveTimer,

    /// The operation collides with existing state (duplicate key,
    /// already-processed ticket, already-running timer).
    #[error("{0}")]
    Conflict(String),

    /// The input is structurally valid but semantically wrong.
    #[error("{0}")]
    Validation(String),
}

impl StoreError {
    /// Whether this variant means "the row you asked for does not exist".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound
                | Self::ClientNotFound
                | Self::AssignedUserNotFound(_)
                | Self::ProjectNotFound
                | Self::TicketNotFound
                | Self::TaskNotFound
                | Self::NoActiveTimer
        )
    }
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
