//! Stateless repository structs for all database operations.
//!
//! Each repository is a unit struct whose methods take `&Connection` and
//! execute SQL directly; no shared mutable state, no caching. Callers own
//! the connection (usually a pooled one) and decide transaction boundaries,
//! except for the multi-statement state transitions
//! ([`TicketRepo::accept_with_tasks`], [`TaskRepo::create`],
//! [`TimerRepo::stop`]) which open their own transaction because their
//! invariants span several writes.
//!
//! Rows map straight into the `atelier-core` models; there is no separate
//! row-struct layer because the models are already row-shaped.

pub mod dashboard;
pub mod projects;
pub mod tasks;
pub mod tickets;
pub mod timers;
pub mod users;

pub use dashboard::{DashboardRepo, DashboardStats, TableCounts};
pub use projects::{CreateProjectOptions, ProjectRepo, TicketCounts};
pub use tasks::{CreatedTask, NewTaskSpec, TaskRepo};
pub use tickets::TicketRepo;
pub use timers::{ActiveTimerRow, StoppedTimer, TimerRepo, session_duration_minutes};
pub use users::{CreateUserOptions, TaskCounts, UserRepo};

use atelier_core::{ProjectStatus, Role, TaskPriority, TaskStatus, TicketStatus};

/// Current UTC time as an RFC 3339 string (millisecond precision, `Z` suffix).
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// Column decoding. CHECK constraints keep these columns inside the enum
// vocabulary; the fallbacks only matter for rows written before a
// vocabulary change, and they always pick the least-surprising value.

pub(crate) fn role_from_sql(value: &str) -> Role {
    value.parse().unwrap_or(Role::Client)
}

pub(crate) fn project_status_from_sql(value: &str) -> ProjectStatus {
    match value {
        "completed" => ProjectStatus::Completed,
        "on_hold" => ProjectStatus::OnHold,
        "cancelled" => ProjectStatus::Cancelled,
        _ => ProjectStatus::InDevelopment,
    }
}

pub(crate) fn ticket_status_from_sql(value: &str) -> TicketStatus {
    match value {
        "accepted" => TicketStatus::Accepted,
        "rejected" => TicketStatus::Rejected,
        _ => TicketStatus::ToRead,
    }
}

pub(crate) fn task_status_from_sql(value: &str) -> TaskStatus {
    match value {
        "completed" => TaskStatus::Completed,
        _ => TaskStatus::InProgress,
    }
}

pub(crate) fn task_priority_from_sql(value: &str) -> TaskPriority {
    value.parse().unwrap_or(TaskPriority::Medium)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
