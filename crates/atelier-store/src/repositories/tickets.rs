//! Ticket repository, including the accept-with-tasks transition.
//!
//! Tickets move along a one-way machine: `to_read → accepted` (by creating
//! tasks) or `to_read → rejected` (by the status route). Both terminal
//! states are final; every transition here re-checks the current status
//! inside its own transaction.

use atelier_core::{ProjectId, Task, Ticket, TicketId, TicketStatus, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::tasks::{NewTaskSpec, TaskRepo};
use super::{now_rfc3339, ticket_status_from_sql};
use crate::errors::{Result, StoreError};

/// Repository for ticket rows.
pub struct TicketRepo;

impl TicketRepo {
    /// Create a ticket in `to_read` state.
    ///
    /// Project existence and ownership are the caller's concern; the
    /// handler has the project row in hand before it gets here.
    pub fn create(
        conn: &Connection,
        project_id: &ProjectId,
        client_id: &UserId,
        message: &str,
    ) -> Result<Ticket> {
        let now = now_rfc3339();
        let ticket = Ticket {
            id: TicketId::new(),
            project_id: project_id.clone(),
            client_id: client_id.clone(),
            message: message.trim().to_owned(),
            status: TicketStatus::ToRead,
            created_at: now.clone(),
            updated_at: now,
        };

        let _ = conn.execute(
            "INSERT INTO tickets (id, project_id, client_id, message, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                ticket.id.as_str(),
                ticket.project_id.as_str(),
                ticket.client_id.as_str(),
                ticket.message,
                ticket.status.as_str(),
                ticket.created_at,
                ticket.updated_at,
            ],
        )?;

        Ok(ticket)
    }

    /// Fetch a ticket by id.
    pub fn get_by_id(conn: &Connection, id: &TicketId) -> Result<Option<Ticket>> {
        conn.query_row(
            "SELECT id, project_id, client_id, message, status, created_at, updated_at
             FROM tickets WHERE id = ?1",
            params![id.as_str()],
            Self::map_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// List one client's tickets, optionally narrowed to a project,
    /// newest first.
    pub fn list_by_client(
        conn: &Connection,
        client_id: &UserId,
        project_id: Option<&ProjectId>,
    ) -> Result<Vec<Ticket>> {
        let base = "SELECT id, project_id, client_id, message, status, created_at, updated_at
                    FROM tickets WHERE client_id = ?1";
        match project_id {
            Some(project) => {
                let sql = format!("{base} AND project_id = ?2 ORDER BY created_at DESC, id DESC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![client_id.as_str(), project.as_str()], Self::map_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
            }
            None => {
                let sql = format!("{base} ORDER BY created_at DESC, id DESC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![client_id.as_str()], Self::map_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
            }
        }
    }

    /// List a project's tickets, newest first.
    pub fn list_by_project(conn: &Connection, project_id: &ProjectId) -> Result<Vec<Ticket>> {
        let mut stmt = conn.prepare(
            "SELECT id, project_id, client_id, message, status, created_at, updated_at
             FROM tickets WHERE project_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![project_id.as_str()], Self::map_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Accept a `to_read` ticket by carving it into tasks. No other path
    /// flips a ticket to `accepted`.
    ///
    /// Every entry is validated before anything is written: one bad entry
    /// means no tasks and no status change. Runs in a single transaction.
    pub fn accept_with_tasks(
        conn: &Connection,
        ticket_id: &TicketId,
        specs: &[NewTaskSpec],
    ) -> Result<(Ticket, Vec<Task>)> {
        let tx = conn.unchecked_transaction()?;

        let ticket = Self::get_by_id(&tx, ticket_id)?.ok_or(StoreError::TicketNotFound)?;
        if ticket.status != TicketStatus::ToRead {
            return Err(StoreError::Conflict(format!(
                "Ticket is already {}",
                ticket.status
            )));
        }
        if specs.is_empty() {
            return Err(StoreError::Validation(
                "At least one task is required to accept a ticket".into(),
            ));
        }
        for spec in specs {
            TaskRepo::validate_spec(&tx, spec)?;
        }

        let mut tasks = Vec::with_capacity(specs.len());
        for spec in specs {
            tasks.push(TaskRepo::insert_row(&tx, ticket_id, spec)?);
        }

        let now = now_rfc3339();
        let _ = tx.execute(
            "UPDATE tickets SET status = 'accepted', updated_at = ?1 WHERE id = ?2",
            params![now, ticket_id.as_str()],
        )?;
        tx.commit()?;

        let ticket = Ticket {
            status: TicketStatus::Accepted,
            updated_at: now,
            ..ticket
        };
        Ok((ticket, tasks))
    }

    /// Reject a `to_read` ticket, the only status change the PATCH route
    /// may make.
    pub fn reject(conn: &Connection, ticket_id: &TicketId) -> Result<Ticket> {
        let tx = conn.unchecked_transaction()?;

        let ticket = Self::get_by_id(&tx, ticket_id)?.ok_or(StoreError::TicketNotFound)?;
        if ticket.status != TicketStatus::ToRead {
            return Err(StoreError::Conflict(format!(
                "Ticket is already {}",
                ticket.status
            )));
        }

        let now = now_rfc3339();
        let _ = tx.execute(
            "UPDATE tickets SET status = 'rejected', updated_at = ?1 WHERE id = ?2",
            params![now, ticket_id.as_str()],
        )?;
        tx.commit()?;

        Ok(Ticket {
            status: TicketStatus::Rejected,
            updated_at: now,
            ..ticket
        })
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
        Ok(Ticket {
            id: TicketId::from_string(row.get("id")?),
            project_id: ProjectId::from_string(row.get("project_id")?),
            client_id: UserId::from_string(row.get("client_id")?),
            message: row.get("message")?,
            status: ticket_status_from_sql(&row.get::<_, String>("status")?),
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
    use atelier_core::TaskPriority;

    fn spec(assignee: &UserId, action: &str) -> NewTaskSpec {
        NewTaskSpec {
            action: action.to_owned(),
            assigned_to: assignee.clone(),
            priority: TaskPriority::Medium,
        }
    }

    #[test]
    fn create_starts_in_to_read() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket =
            TicketRepo::create(&conn, &project.id, &client.id, "  Please fix the logo  ").unwrap();
        assert_eq!(ticket.status, TicketStatus::ToRead);
        assert_eq!(ticket.message, "Please fix the logo");

        let fetched = TicketRepo::get_by_id(&conn, &ticket.id).unwrap().unwrap();
        assert_eq!(fetched, ticket);
    }

    #[test]
    fn accept_with_tasks_creates_all_and_flips_status() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let staff = seed_staff(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket = seed_ticket(&conn, &project);

        let (accepted, tasks) = TicketRepo::accept_with_tasks(
            &conn,
            &ticket.id,
            &[spec(&staff.id, "Design mockups"), spec(&staff.id, "Build page")],
        )
        .unwrap();

        assert_eq!(accepted.status, TicketStatus::Accepted);
        assert_eq!(tasks.len(), 2);
        for task in &tasks {
            assert_eq!(task.ticket_id, ticket.id);
        }

        let stored = TicketRepo::get_by_id(&conn, &ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::Accepted);
        let task_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM tasks WHERE ticket_id = ?1",
                params![ticket.id.as_str()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(task_count, 2);
    }

    #[test]
    fn accept_with_tasks_is_atomic_on_bad_entry() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let staff = seed_staff(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket = seed_ticket(&conn, &project);

        // Second entry names a nonexistent assignee.
        let ghost = UserId::new();
        let err = TicketRepo::accept_with_tasks(
            &conn,
            &ticket.id,
            &[spec(&staff.id, "Fine"), spec(&ghost, "Doomed")],
        )
        .unwrap_err();
        assert_matches!(err, StoreError::AssignedUserNotFound(id) if id == ghost.as_str());

        // Nothing was written and the ticket is still to_read.
        let stored = TicketRepo::get_by_id(&conn, &ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::ToRead);
        let task_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(task_count, 0);
    }

    #[test]
    fn accept_with_tasks_rejects_empty_list() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket = seed_ticket(&conn, &project);

        let err = TicketRepo::accept_with_tasks(&conn, &ticket.id, &[]).unwrap_err();
        assert_matches!(err, StoreError::Validation(_));

        let stored = TicketRepo::get_by_id(&conn, &ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::ToRead);
    }

    #[test]
    fn accept_with_tasks_conflicts_on_processed_ticket() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let staff = seed_staff(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket = seed_ticket(&conn, &project);

        let _ = TicketRepo::accept_with_tasks(&conn, &ticket.id, &[spec(&staff.id, "One")])
            .unwrap();

        let err = TicketRepo::accept_with_tasks(&conn, &ticket.id, &[spec(&staff.id, "Two")])
            .unwrap_err();
        assert_matches!(err, StoreError::Conflict(msg) if msg == "Ticket is already accepted");
    }

    #[test]
    fn accept_with_tasks_rejects_client_assignee() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket = seed_ticket(&conn, &project);

        let err = TicketRepo::accept_with_tasks(&conn, &ticket.id, &[spec(&client.id, "Nope")])
            .unwrap_err();
        assert_matches!(err, StoreError::Validation(msg)
            if msg == "Tasks can only be assigned to admin or internal staff users");
    }

    #[test]
    fn reject_flips_to_read_only() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let project = seed_project(&conn, &client.id);
        let ticket = seed_ticket(&conn, &project);

        let rejected = TicketRepo::reject(&conn, &ticket.id).unwrap();
        assert_eq!(rejected.status, TicketStatus::Rejected);

        // Terminal; a second reject conflicts.
        let err = TicketRepo::reject(&conn, &ticket.id).unwrap_err();
        assert_matches!(err, StoreError::Conflict(msg) if msg == "Ticket is already rejected");
    }

    #[test]
    fn reject_missing_ticket_is_not_found() {
        let conn = setup_conn();
        let err = TicketRepo::reject(&conn, &TicketId::new()).unwrap_err();
        assert_matches!(err, StoreError::TicketNotFound);
    }

    #[test]
    fn list_by_client_narrows_by_project() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let project_a = seed_project(&conn, &client.id);
        let project_b = seed_project(&conn, &client.id);
        let t1 = seed_ticket(&conn, &project_a);
        let t2 = seed_ticket(&conn, &project_b);
        let t3 = seed_ticket(&conn, &project_a);

        let all = TicketRepo::list_by_client(&conn, &client.id, None).unwrap();
        assert_eq!(all.len(), 3);
        // Newest first.
        assert_eq!(all[0].id, t3.id);

        let only_a = TicketRepo::list_by_client(&conn, &client.id, Some(&project_a.id)).unwrap();
        let ids: Vec<_> = only_a.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![t3.id, t1.id]);
        let _ = t2;
    }
}
