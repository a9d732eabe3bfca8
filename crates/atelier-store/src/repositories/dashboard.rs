//! Aggregate counts for the admin dashboard and operational endpoints.

use rusqlite::Connection;
use serde::Serialize;

use crate::errors::Result;

/// Repository for cross-table counts. Every query here is a `COUNT(*)`;
/// none of them lock anything for long.
pub struct DashboardRepo;

/// The admin dashboard snapshot.
///
/// `projects.completed` is derived as `total - active`: anything not in
/// development (completed, on hold, cancelled) counts as done with for
/// dashboard purposes.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    /// Project counts.
    pub projects: ProjectCounts,
    /// Client head count.
    pub clients: RoleCount,
    /// Staff head count.
    pub staff: RoleCount,
    /// Ticket counts.
    pub tickets: TicketOpenCount,
    /// Task counts.
    pub tasks: TaskActiveCount,
}

/// Project slice of the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectCounts {
    /// All projects.
    pub total: i64,
    /// Projects currently in development.
    pub active: i64,
    /// Everything else.
    pub completed: i64,
}

/// A head count for one role.
#[derive(Debug, Clone, Serialize)]
pub struct RoleCount {
    /// Users holding the role.
    pub total: i64,
}

/// Ticket slice of the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct TicketOpenCount {
    /// Tickets still awaiting review.
    pub open: i64,
}

/// Task slice of the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct TaskActiveCount {
    /// Tasks in progress.
    pub active: i64,
}

/// Row counts per table, for health and debug endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct TableCounts {
    /// Rows in `users`.
    pub users: i64,
    /// Rows in `projects`.
    pub projects: i64,
    /// Rows in `tickets`.
    pub tickets: i64,
    /// Rows in `tasks`.
    pub tasks: i64,
    /// Rows in `time_sessions`.
    pub time_sessions: i64,
}

impl DashboardRepo {
    /// Assemble the dashboard snapshot.
    pub fn stats(conn: &Connection) -> Result<DashboardStats> {
        let total_projects = Self::count(conn, "SELECT COUNT(*) FROM projects")?;
        let active_projects = Self::count(
            conn,
            "SELECT COUNT(*) FROM projects WHERE status = 'in_development'",
        )?;
        let clients = Self::count(conn, "SELECT COUNT(*) FROM users WHERE role = 'client'")?;
        let staff = Self::count(
            conn,
            "SELECT COUNT(*) FROM users WHERE role = 'internal_staff'",
        )?;
        let open_tickets =
            Self::count(conn, "SELECT COUNT(*) FROM tickets WHERE status = 'to_read'")?;
        let active_tasks =
            Self::count(conn, "SELECT COUNT(*) FROM tasks WHERE status = 'in_progress'")?;

        Ok(DashboardStats {
            projects: ProjectCounts {
                total: total_projects,
                active: active_projects,
                completed: total_projects - active_projects,
            },
            clients: RoleCount { total: clients },
            staff: RoleCount { total: staff },
            tickets: TicketOpenCount { open: open_tickets },
            tasks: TaskActiveCount {
                active: active_tasks,
            },
        })
    }

    /// Row counts for every table the schema owns.
    pub fn table_counts(conn: &Connection) -> Result<TableCounts> {
        Ok(TableCounts {
            users: Self::count(conn, "SELECT COUNT(*) FROM users")?,
            projects: Self::count(conn, "SELECT COUNT(*) FROM projects")?,
            tickets: Self::count(conn, "SELECT COUNT(*) FROM tickets")?,
            tasks: Self::count(conn, "SELECT COUNT(*) FROM tasks")?,
            time_sessions: Self::count(conn, "SELECT COUNT(*) FROM time_sessions")?,
        })
    }

    fn count(conn: &Connection, sql: &str) -> Result<i64> {
        conn.query_row(sql, [], |row| row.get(0)).map_err(Into::into)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
