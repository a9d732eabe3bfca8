//! # atelier-store
//!
//! `SQLite` persistence for the Atelier collab-manager API:
//!
//! - **Connection pool**: `r2d2` over `rusqlite` with WAL, foreign keys, and
//!   a busy timeout applied to every connection
//! - **Migrations**: version-tracked schema evolution, applied at startup
//! - **Repositories**: stateless structs over `&Connection` for users,
//!   projects, tickets, tasks, time sessions, and dashboard counts
//!
//! Multi-step state transitions (accepting a ticket with its tasks, stopping
//! a timer and refreshing the task's aggregates) run inside a single
//! transaction here, so callers above never see half-applied writes.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;

#[cfg(test)]
mod test_fixtures;

pub use connection::{
    ConnectionConfig, ConnectionPool, PooledConnection, PragmaState, new_file, new_in_memory,
    verify_pragmas,
};
pub use errors::{Result, StoreError};
pub use migrations::{current_version, latest_version, run_migrations};
pub use repositories::{
    ActiveTimerRow, CreateProjectOptions, CreateUserOptions, CreatedTask, DashboardRepo,
    DashboardStats, NewTaskSpec, ProjectRepo, StoppedTimer, TableCounts, TaskCounts, TaskRepo,
    TicketCounts, TicketRepo, TimerRepo, UserRepo, session_duration_minutes,
};
