//! Project repository.

use atelier_core::{Project, ProjectId, ProjectStatus, Role, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use serde_json::Value;

use super::users::UserRepo;
use super::{now_rfc3339, project_status_from_sql};
use crate::errors::{Result, StoreError};

/// Repository for project rows.
pub struct ProjectRepo;

/// Options for creating a project.
#[derive(Debug, Clone)]
pub struct CreateProjectOptions<'a> {
    /// Project name.
    pub name: &'a str,
    /// Owning client account. Must exist and hold the `client` role.
    pub client_id: &'a UserId,
    /// Public website, if any.
    pub website_url: Option<&'a str>,
    /// Free-form social media links (opaque JSON).
    pub social_links: Option<&'a Value>,
}

/// Ticket counters reported on the client project listing.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TicketCounts {
    /// All tickets ever raised on the project.
    pub tickets_count: i64,
    /// Tickets still awaiting triage (`to_read`).
    pub open_tickets_count: i64,
}

impl ProjectRepo {
    /// Create a project owned by a client.
    ///
    /// Rejects owners that don't exist or aren't clients; projects for
    /// staff or admin accounts would be invisible to every client surface.
    pub fn create(conn: &Connection, opts: &CreateProjectOptions<'_>) -> Result<Project> {
        let owner = UserRepo::get_by_id(conn, opts.client_id)?.ok_or(StoreError::ClientNotFound)?;
        if owner.role != Role::Client {
            return Err(StoreError::Validation(
                "Specified user is not a client".into(),
            ));
        }

        let now = now_rfc3339();
        let project = Project {
            id: ProjectId::new(),
            name: opts.name.trim().to_owned(),
            client_id: opts.client_id.clone(),
            status: ProjectStatus::InDevelopment,
            website_url: opts.website_url.map(str::to_owned),
            social_links: opts.social_links.cloned(),
            created_at: now.clone(),
            updated_at: now,
        };

        let _ = conn.execute(
            "INSERT INTO projects (id, name, client_id, status, website_url, social_links, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                project.id.as_str(),
                project.name,
                project.client_id.as_str(),
                project.status.as_str(),
                project.website_url,
                project.social_links.as_ref().map(Value::to_string),
                project.created_at,
                project.updated_at,
            ],
        )?;

        Ok(project)
    }

    /// Fetch a project by id.
    pub fn get_by_id(conn: &Connection, id: &ProjectId) -> Result<Option<Project>> {
        conn.query_row(
            "SELECT id, name, client_id, status, website_url, social_links, created_at, updated_at
             FROM projects WHERE id = ?1",
            params![id.as_str()],
            Self::map_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// List every project, newest first.
    pub fn list_all(conn: &Connection) -> Result<Vec<Project>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, client_id, status, website_url, social_links, created_at, updated_at
             FROM projects ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::map_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// List one client's projects, newest first.
    pub fn list_by_client(conn: &Connection, client_id: &UserId) -> Result<Vec<Project>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, client_id, status, website_url, social_links, created_at, updated_at
             FROM projects WHERE client_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![client_id.as_str()], Self::map_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Ticket counters for one project.
    pub fn ticket_counts(conn: &Connection, id: &ProjectId) -> Result<TicketCounts> {
        let tickets_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tickets WHERE project_id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        let open_tickets_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tickets WHERE project_id = ?1 AND status = 'to_read'",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(TicketCounts {
            tickets_count,
            open_tickets_count,
        })
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Project> {
        let social_links: Option<String> = row.get("social_links")?;
        Ok(Project {
            id: ProjectId::from_string(row.get("id")?),
            name: row.get("name")?,
            client_id: UserId::from_string(row.get("client_id")?),
            status: project_status_from_sql(&row.get::<_, String>("status")?),
            website_url: row.get("website_url")?,
            // Unparseable stored JSON degrades to null rather than failing
            // the whole row.
            social_links: social_links.and_then(|s| serde_json::from_str(&s).ok()),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
