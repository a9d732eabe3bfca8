//! Time-session repository: the timer subsystem's storage half.
//!
//! Sessions are real rows, not a JSON blob on the task. A session is open
//! while `end_time` is null, and each user holds at most one open session
//! per task (enforced here and by a partial unique index). Stopping a
//! session closes it and refreshes the task's denormalized aggregates in
//! the same transaction, so `total_time_minutes` / `time_sessions_count`
//! can never drift from the session rows.

use atelier_core::{ProjectId, SessionId, TaskId, TicketId, TimeSession, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::now_rfc3339;
use super::tasks::TaskRepo;
use crate::errors::{Result, StoreError};

/// Repository for time-session rows.
pub struct TimerRepo;

/// Result of stopping a timer: the closed session plus the task's
/// refreshed aggregates.
#[derive(Debug, Clone)]
pub struct StoppedTimer {
    /// The session that was just closed.
    pub session: TimeSession,
    /// Sum of `duration_minutes` over the task's closed sessions.
    pub total_time_minutes: i64,
    /// Number of the task's closed sessions.
    pub sessions_count: i64,
}

/// One row of the client "active timers" view: an open session joined to
/// its task, user, ticket, and project.
#[derive(Debug, Clone)]
pub struct ActiveTimerRow {
    /// The open session.
    pub session_id: SessionId,
    /// Session start time.
    pub start_time: String,
    /// Task being timed.
    pub task_id: TaskId,
    /// The task's action text.
    pub task_action: String,
    /// User running the timer.
    pub user_id: UserId,
    /// That user's display name.
    pub user_name: String,
    /// That user's handle.
    pub user_username: String,
    /// Project the work rolls up to.
    pub project_id: ProjectId,
    /// Project name.
    pub project_name: String,
    /// Ticket the task was carved from.
    pub ticket_id: TicketId,
    /// The client's original request text.
    pub ticket_message: String,
}

impl TimerRepo {
    /// Start a timer for `user_id` on a task.
    ///
    /// Conflicts if the caller already has an open session on the task.
    /// Starting also flips the task to `in_progress`, so timing a completed
    /// task re-opens it.
    pub fn start(conn: &Connection, task_id: &TaskId, user_id: &UserId) -> Result<TimeSession> {
        let tx = conn.unchecked_transaction()?;

        let _task = TaskRepo::get_by_id(&tx, task_id)?.ok_or(StoreError::TaskNotFound)?;
        if Self::open_session(&tx, task_id, user_id)?.is_some() {
            return Err(StoreError::Conflict("Task timer is already running".into()));
        }

        let session = TimeSession {
            id: SessionId::new(),
            task_id: task_id.clone(),
            user_id: user_id.clone(),
            start_time: now_rfc3339(),
            end_time: None,
            duration_minutes: None,
        };
        let _ = tx.execute(
            "INSERT INTO time_sessions (id, task_id, user_id, start_time)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.as_str(),
                session.task_id.as_str(),
                session.user_id.as_str(),
                session.start_time,
            ],
        )?;
        let _ = tx.execute(
            "UPDATE tasks SET status = 'in_progress', updated_at = ?1 WHERE id = ?2",
            params![now_rfc3339(), task_id.as_str()],
        )?;
        tx.commit()?;

        Ok(session)
    }

    /// Stop the caller's open session on a task.
    ///
    /// Closes the session with a whole-minute duration, then recomputes the
    /// task's aggregates from its closed rows, one transaction end to end.
    pub fn stop(conn: &Connection, task_id: &TaskId, user_id: &UserId) -> Result<StoppedTimer> {
        let tx = conn.unchecked_transaction()?;

        let _task = TaskRepo::get_by_id(&tx, task_id)?.ok_or(StoreError::TaskNotFound)?;
        let open = Self::open_session(&tx, task_id, user_id)?.ok_or(StoreError::NoActiveTimer)?;

        let end_time = now_rfc3339();
        let duration = session_duration_minutes(&open.start_time, &end_time).unwrap_or(0);
        let _ = tx.execute(
            "UPDATE time_sessions SET end_time = ?1, duration_minutes = ?2 WHERE id = ?3",
            params![end_time, duration, open.id.as_str()],
        )?;

        // Aggregates are recomputed from the closed rows, not incremented.
        let (total_time_minutes, sessions_count) = Self::closed_totals(&tx, task_id)?;
        let _ = tx.execute(
            "UPDATE tasks SET total_time_minutes = ?1, time_sessions_count = ?2, updated_at = ?3
             WHERE id = ?4",
            params![total_time_minutes, sessions_count, end_time, task_id.as_str()],
        )?;
        tx.commit()?;

        let session = TimeSession {
            end_time: Some(end_time),
            duration_minutes: Some(duration),
            ..open
        };
        Ok(StoppedTimer {
            session,
            total_time_minutes,
            sessions_count,
        })
    }

    /// The caller's open session on a task, if any.
    pub fn open_session(
        conn: &Connection,
        task_id: &TaskId,
        user_id: &UserId,
    ) -> Result<Option<TimeSession>> {
        conn.query_row(
            "SELECT id, task_id, user_id, start_time, end_time, duration_minutes
             FROM time_sessions
             WHERE task_id = ?1 AND user_id = ?2 AND end_time IS NULL",
            params![task_id.as_str(), user_id.as_str()],
            Self::map_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Whether anyone's timer is running on the task.
    pub fn has_open_session(conn: &Connection, task_id: &TaskId) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM time_sessions WHERE task_id = ?1 AND end_time IS NULL",
            params![task_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// A task's sessions in start order, optionally narrowed to one user's.
    pub fn list_for_task(
        conn: &Connection,
        task_id: &TaskId,
        only_user: Option<&UserId>,
    ) -> Result<Vec<TimeSession>> {
        let base = "SELECT id, task_id, user_id, start_time, end_time, duration_minutes
                    FROM time_sessions WHERE task_id = ?1";
        match only_user {
            Some(user) => {
                let sql = format!("{base} AND user_id = ?2 ORDER BY start_time, id");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![task_id.as_str(), user.as_str()], Self::map_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
            }
            None => {
                let sql = format!("{base} ORDER BY start_time, id");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![task_id.as_str()], Self::map_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
            }
        }
    }

    /// All open sessions across one client's projects, joined to the task,
    /// user, ticket, and project rows the active-timers view reports.
    pub fn active_for_client(conn: &Connection, client_id: &UserId) -> Result<Vec<ActiveTimerRow>> {
        let mut stmt = conn.prepare(
            "SELECT s.id AS session_id, s.start_time,
                    t.id AS task_id, t.action AS task_action,
                    u.id AS user_id, u.full_name AS user_name, u.username AS user_username,
                    p.id AS project_id, p.name AS project_name,
                    k.id AS ticket_id, k.message AS ticket_message
             FROM time_sessions s
             JOIN tasks t    ON t.id = s.task_id
             JOIN tickets k  ON k.id = t.ticket_id
             JOIN projects p ON p.id = k.project_id
             JOIN users u    ON u.id = s.user_id
             WHERE p.client_id = ?1 AND s.end_time IS NULL
             ORDER BY s.start_time, s.id",
        )?;
        let rows = stmt.query_map(params![client_id.as_str()], |row| {
            Ok(ActiveTimerRow {
                session_id: SessionId::from_string(row.get("session_id")?),
                start_time: row.get("start_time")?,
                task_id: TaskId::from_string(row.get("task_id")?),
                task_action: row.get("task_action")?,
                user_id: UserId::from_string(row.get("user_id")?),
                user_name: row.get("user_name")?,
                user_username: row.get("user_username")?,
                project_id: ProjectId::from_string(row.get("project_id")?),
                project_name: row.get("project_name")?,
                ticket_id: TicketId::from_string(row.get("ticket_id")?),
                ticket_message: row.get("ticket_message")?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn closed_totals(conn: &Connection, task_id: &TaskId) -> Result<(i64, i64)> {
        conn.query_row(
            "SELECT COALESCE(SUM(duration_minutes), 0), COUNT(*)
             FROM time_sessions WHERE task_id = ?1 AND end_time IS NOT NULL",
            params![task_id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(Into::into)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<TimeSession> {
        Ok(TimeSession {
            id: SessionId::from_string(row.get("id")?),
            task_id: TaskId::from_string(row.get("task_id")?),
            user_id: UserId::from_string(row.get("user_id")?),
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            duration_minutes: row.get("duration_minutes")?,
        })
    }
}

/// Whole minutes between two RFC 3339 timestamps, rounded to nearest
/// (30 s rounds up). `None` if either timestamp fails to parse or the end
/// precedes the start.
pub fn session_duration_minutes(start_time: &str, end_time: &str) -> Option<i64> {
    let start = chrono::DateTime::parse_from_rfc3339(start_time).ok()?;
    let end = chrono::DateTime::parse_from_rfc3339(end_time).ok()?;
    let seconds = (end - start).num_seconds();
    if seconds < 0 {
        return None;
    }
    Some((seconds + 30) / 60)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
