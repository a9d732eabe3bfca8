//! Task repository.
//!
//! Single-task creation doubles as a ticket transition: creating a task
//! against a `to_read` ticket accepts it in the same transaction, and a
//! `rejected` ticket refuses new tasks outright.

use atelier_core::{Role, Task, TaskId, TaskPriority, TaskStatus, TicketId, TicketStatus, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::tickets::TicketRepo;
use super::users::UserRepo;
use super::{now_rfc3339, task_priority_from_sql, task_status_from_sql};
use crate::errors::{Result, StoreError};

/// Repository for task rows.
pub struct TaskRepo;

/// One task to create, as named in requests.
#[derive(Debug, Clone)]
pub struct NewTaskSpec {
    /// What needs doing. Must be non-blank.
    pub action: String,
    /// Assignee. Must exist and be admin or internal staff.
    pub assigned_to: UserId,
    /// Urgency.
    pub priority: TaskPriority,
}

/// Result of a single-task create: the task plus the ticket status after
/// any `to_read → accepted` side effect.
#[derive(Debug, Clone)]
pub struct CreatedTask {
    /// The freshly inserted task.
    pub task: Task,
    /// Ticket status after the create.
    pub ticket_status: TicketStatus,
}

impl TaskRepo {
    /// Create one task against a ticket.
    ///
    /// A `to_read` ticket is accepted as a side effect; a `rejected` ticket
    /// conflicts. Both the insert and the ticket flip happen in a single
    /// transaction.
    pub fn create(conn: &Connection, ticket_id: &TicketId, spec: &NewTaskSpec) -> Result<CreatedTask> {
        let tx = conn.unchecked_transaction()?;

        let ticket = TicketRepo::get_by_id(&tx, ticket_id)?.ok_or(StoreError::TicketNotFound)?;
        if ticket.status == TicketStatus::Rejected {
            return Err(StoreError::Conflict(
                "Cannot create tasks for a rejected ticket".into(),
            ));
        }
        Self::validate_spec(&tx, spec)?;

        let task = Self::insert_row(&tx, ticket_id, spec)?;

        let ticket_status = if ticket.status == TicketStatus::ToRead {
            let _ = tx.execute(
                "UPDATE tickets SET status = 'accepted', updated_at = ?1 WHERE id = ?2",
                params![now_rfc3339(), ticket_id.as_str()],
            )?;
            TicketStatus::Accepted
        } else {
            ticket.status
        };
        tx.commit()?;

        Ok(CreatedTask {
            task,
            ticket_status,
        })
    }

    /// Fetch a task by id.
    pub fn get_by_id(conn: &Connection, id: &TaskId) -> Result<Option<Task>> {
        conn.query_row(
            "SELECT id, ticket_id, assigned_to, action, priority, status,
                    total_time_minutes, time_sessions_count, created_at, updated_at
             FROM tasks WHERE id = ?1",
            params![id.as_str()],
            Self::map_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// List one user's assigned tasks, optionally narrowed by status,
    /// newest first.
    pub fn list_by_assignee(
        conn: &Connection,
        user_id: &UserId,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>> {
        let base = "SELECT id, ticket_id, assigned_to, action, priority, status,
                           total_time_minutes, time_sessions_count, created_at, updated_at
                    FROM tasks WHERE assigned_to = ?1";
        match status {
            Some(status) => {
                let sql = format!("{base} AND status = ?2 ORDER BY created_at DESC, id DESC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![user_id.as_str(), status.as_str()], Self::map_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
            }
            None => {
                let sql = format!("{base} ORDER BY created_at DESC, id DESC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![user_id.as_str()], Self::map_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
            }
        }
    }

    /// List a ticket's tasks, newest first.
    pub fn list_by_ticket(conn: &Connection, ticket_id: &TicketId) -> Result<Vec<Task>> {
        let mut stmt = conn.prepare(
            "SELECT id, ticket_id, assigned_to, action, priority, status,
                    total_time_minutes, time_sessions_count, created_at, updated_at
             FROM tasks WHERE ticket_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![ticket_id.as_str()], Self::map_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Set a task's work status, returning the updated row.
    pub fn update_status(conn: &Connection, id: &TaskId, status: TaskStatus) -> Result<Task> {
        let changed = conn.execute(
            "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now_rfc3339(), id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::TaskNotFound);
        }
        Self::get_by_id(conn, id)?.ok_or(StoreError::TaskNotFound)
    }

    /// Check a [`NewTaskSpec`] against the database without writing.
    pub(crate) fn validate_spec(conn: &Connection, spec: &NewTaskSpec) -> Result<()> {
        if spec.action.trim().is_empty() {
            return Err(StoreError::Validation(
                "Each task must include a non-empty action".into(),
            ));
        }
        let assignee = UserRepo::get_by_id(conn, &spec.assigned_to)?
            .ok_or_else(|| StoreError::AssignedUserNotFound(spec.assigned_to.to_string()))?;
        if assignee.role == Role::Client {
            return Err(StoreError::Validation(
                "Tasks can only be assigned to admin or internal staff users".into(),
            ));
        }
        Ok(())
    }

    /// Insert a task row with fresh id and timestamps. No ticket-state
    /// logic; callers handle that inside their own transaction.
    pub(crate) fn insert_row(
        conn: &Connection,
        ticket_id: &TicketId,
        spec: &NewTaskSpec,
    ) -> Result<Task> {
        let now = now_rfc3339();
        let task = Task {
            id: TaskId::new(),
            ticket_id: ticket_id.clone(),
            assigned_to: spec.assigned_to.clone(),
            action: spec.action.trim().to_owned(),
            priority: spec.priority,
            status: TaskStatus::InProgress,
            total_time_minutes: 0,
            time_sessions_count: 0,
            created_at: now.clone(),
            updated_at: now,
        };

        let _ = conn.execute(
            "INSERT INTO tasks (id, ticket_id, assigned_to, action, priority, status,
                                total_time_minutes, time_sessions_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                task.id.as_str(),
                task.ticket_id.as_str(),
                task.assigned_to.as_str(),
                task.action,
                task.priority.as_str(),
                task.status.as_str(),
                task.total_time_minutes,
                task.time_sessions_count,
                task.created_at,
                task.updated_at,
            ],
        )?;

        Ok(task)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Task> {
        Ok(Task {
            id: TaskId::from_string(row.get("id")?),
            ticket_id: TicketId::from_string(row.get("ticket_id")?),
            assigned_to: UserId::from_string(row.get("assigned_to")?),
            action: row.get("action")?,
            priority: task_priority_from_sql(&row.get::<_, String>("priority")?),
            status: task_status_from_sql(&row.get::<_, String>("status")?),
            total_time_minutes: row.get("total_time_minutes")?,
            time_sessions_count: row.get("time_sessions_count")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::test_fixtures::{seed_client, seed_project, seed_staff, seed_ticket, setup_conn};
    use assert_matches::assert_matches;

    fn spec(assignee: &UserId, action: &str) -> NewTaskSpec {
        NewTaskSpec {
            action: action.to_owned(),
            assigned_to: assignee.clone(),
            priority: TaskPriority::High,
        }
    }

    #[test]
    fn create_accepts_a_to_read_ticket() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let staff = seed_staff(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket = seed_ticket(&conn, &project);

        let created = TaskRepo::create(&conn, &ticket.id, &spec(&staff.id, "Sketch it")).unwrap();
        assert_eq!(created.ticket_status, TicketStatus::Accepted);
        assert_eq!(created.task.status, TaskStatus::InProgress);
        assert_eq!(created.task.priority, TaskPriority::High);
        assert_eq!(created.task.total_time_minutes, 0);

        let stored = TicketRepo::get_by_id(&conn, &ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::Accepted);
    }

    #[test]
    fn create_leaves_accepted_ticket_alone() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let staff = seed_staff(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket = seed_ticket(&conn, &project);

        let first = TaskRepo::create(&conn, &ticket.id, &spec(&staff.id, "First")).unwrap();
        let second = TaskRepo::create(&conn, &ticket.id, &spec(&staff.id, "Second")).unwrap();
        assert_eq!(first.ticket_status, TicketStatus::Accepted);
        assert_eq!(second.ticket_status, TicketStatus::Accepted);

        let tasks = TaskRepo::list_by_ticket(&conn, &ticket.id).unwrap();
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn create_conflicts_on_rejected_ticket() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let staff = seed_staff(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket = seed_ticket(&conn, &project);
        let _ = TicketRepo::reject(&conn, &ticket.id).unwrap();

        let err = TaskRepo::create(&conn, &ticket.id, &spec(&staff.id, "Too late")).unwrap_err();
        assert_matches!(err, StoreError::Conflict(msg)
            if msg == "Cannot create tasks for a rejected ticket");

        let tasks = TaskRepo::list_by_ticket(&conn, &ticket.id).unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn create_rejects_blank_action() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let staff = seed_staff(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket = seed_ticket(&conn, &project);

        let err = TaskRepo::create(&conn, &ticket.id, &spec(&staff.id, "   ")).unwrap_err();
        assert_matches!(err, StoreError::Validation(_));

        // Validation failure must not accept the ticket.
        let stored = TicketRepo::get_by_id(&conn, &ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::ToRead);
    }

    #[test]
    fn create_for_missing_ticket_is_not_found() {
        let conn = setup_conn();
        let staff = seed_staff(&conn);
        let err = TaskRepo::create(&conn, &TicketId::new(), &spec(&staff.id, "Ghost")).unwrap_err();
        assert_matches!(err, StoreError::TicketNotFound);
    }

    #[test]
    fn list_by_assignee_filters_by_status() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let staff = seed_staff(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket = seed_ticket(&conn, &project);

        let a = TaskRepo::create(&conn, &ticket.id, &spec(&staff.id, "A")).unwrap().task;
        let b = TaskRepo::create(&conn, &ticket.id, &spec(&staff.id, "B")).unwrap().task;
        let _done = TaskRepo::update_status(&conn, &a.id, TaskStatus::Completed).unwrap();

        let all = TaskRepo::list_by_assignee(&conn, &staff.id, None).unwrap();
        assert_eq!(all.len(), 2);
        // Newest first.
        assert_eq!(all[0].id, b.id);

        let active = TaskRepo::list_by_assignee(&conn, &staff.id, Some(TaskStatus::InProgress))
            .unwrap();
        let ids: Vec<_> = active.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![b.id]);
    }

    #[test]
    fn update_status_touches_updated_at() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let staff = seed_staff(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket = seed_ticket(&conn, &project);
        let task = TaskRepo::create(&conn, &ticket.id, &spec(&staff.id, "Work")).unwrap().task;

        // Force an older updated_at so the touch is observable even within
        // the same millisecond.
        conn.execute(
            "UPDATE tasks SET updated_at = '2020-01-01T00:00:00.000Z' WHERE id = ?1",
            params![task.id.as_str()],
        )
        .unwrap();

        let updated = TaskRepo::update_status(&conn, &task.id, TaskStatus::Completed).unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert!(updated.updated_at.as_str() > "2020-01-01T00:00:00.000Z");
    }

    #[test]
    fn update_status_missing_task_is_not_found() {
        let conn = setup_conn();
        let err = TaskRepo::update_status(&conn, &TaskId::new(), TaskStatus::Completed).unwrap_err();
        assert_matches!(err, StoreError::TaskNotFound);
    }
}
