//! Client surface: own projects, tickets, and the active-timers view.
//!
//! Everything here is scoped to the caller's `client_id`. A resource owned
//! by someone else is answered as if it did not exist (404); the one
//! explicit ownership check (ticket creation) answers 403 so the client
//! learns why the write was refused.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use atelier_core::{ProjectId, Task, TaskStatus, Ticket, TicketId, UserId};
use atelier_store::StoreError;
use atelier_store::repositories::{
    ActiveTimerRow, ProjectRepo, TaskRepo, TicketRepo, TimerRepo, UserRepo,
};

use crate::auth::CurrentUser;
use crate::errors::{ApiError, ApiJson, ApiResult};
use crate::guard;
use crate::handlers::object_with;
use crate::state::AppState;

/// Query string of `GET /client/tickets`.
#[derive(Debug, Deserialize)]
pub struct TicketListQuery {
    /// Narrow the listing to one project.
    #[serde(default)]
    pub project_id: Option<ProjectId>,
}

/// Body of `POST /client/projects/{id}/tickets`.
#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    /// What the client is asking for. Must be non-blank.
    pub message: String,
}

/// `GET /client/projects`
pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    guard::require_client(&caller)?;
    let caller_id = caller.id;
    let projects = state
        .with_conn(move |conn| {
            ProjectRepo::list_by_client(conn, &caller_id)?
                .iter()
                .map(|project| project_with_counts(conn, project))
                .collect::<Result<Vec<_>, _>>()
        })
        .await?;
    Ok(Json(json!({ "count": projects.len(), "projects": projects })))
}

/// `GET /client/projects/{id}`
pub async fn get_project(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<Json<Value>> {
    guard::require_client(&caller)?;
    let caller_id = caller.id;
    let project = state
        .with_conn(move |conn| {
            let project = owned_project(conn, &project_id, &caller_id)?;
            project_with_counts(conn, &project)
        })
        .await?;
    Ok(Json(json!({ "project": project })))
}

/// `POST /client/projects/{id}/tickets`
pub async fn create_ticket(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(project_id): Path<ProjectId>,
    ApiJson(body): ApiJson<CreateTicketRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    guard::require_client(&caller)?;
    if body.message.trim().is_empty() {
        return Err(ApiError::Validation("Ticket message cannot be empty".into()));
    }

    let caller_id = caller.id;
    let ticket = state
        .with_conn(move |conn| {
            let project = ProjectRepo::get_by_id(conn, &project_id)?
                .ok_or(StoreError::ProjectNotFound)?;
            if project.client_id != caller_id {
                return Err(ApiError::Forbidden(
                    "You can only create tickets for your own projects".into(),
                ));
            }
            TicketRepo::create(conn, &project.id, &caller_id, &body.message).map_err(Into::into)
        })
        .await?;

    tracing::info!(ticket_id = %ticket.id, project_id = %ticket.project_id, "ticket created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Ticket created successfully", "ticket": ticket })),
    ))
}

/// `GET /client/tickets`
///
/// The caller's tickets, optionally narrowed to one project, each with its
/// project summary, client-safe task list, and task stats.
pub async fn list_tickets(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(query): Query<TicketListQuery>,
) -> ApiResult<Json<Value>> {
    guard::require_client(&caller)?;
    let caller_id = caller.id;
    let tickets = state
        .with_conn(move |conn| {
            TicketRepo::list_by_client(conn, &caller_id, query.project_id.as_ref())?
                .iter()
                .map(|ticket| shaped_ticket(conn, ticket))
                .collect::<Result<Vec<_>, _>>()
        })
        .await?;
    Ok(Json(json!({ "count": tickets.len(), "tickets": tickets })))
}

/// `GET /client/tickets/{id}`
pub async fn get_ticket(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(ticket_id): Path<TicketId>,
) -> ApiResult<Json<Value>> {
    guard::require_client(&caller)?;
    let caller_id = caller.id;
    let ticket = state
        .with_conn(move |conn| {
            let ticket = owned_ticket(conn, &ticket_id, &caller_id)?;
            shaped_ticket(conn, &ticket)
        })
        .await?;
    Ok(Json(json!({ "ticket": ticket })))
}

/// `GET /client/projects/{project_id}/tickets/{ticket_id}/tasks`
///
/// The client-safe task list for one ticket, after walking the ownership
/// chain: project is the caller's, ticket belongs to that project.
pub async fn list_ticket_tasks(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path((project_id, ticket_id)): Path<(ProjectId, TicketId)>,
) -> ApiResult<Json<Value>> {
    guard::require_client(&caller)?;
    let caller_id = caller.id;
    let (ticket_id, tasks) = state
        .with_conn(move |conn| {
            let _ = owned_project(conn, &project_id, &caller_id)?;
            let ticket = owned_ticket(conn, &ticket_id, &caller_id)?;
            if ticket.project_id != project_id {
                return Err(StoreError::TicketNotFound.into());
            }
            let tasks = TaskRepo::list_by_ticket(conn, &ticket.id)?;
            let shaped = tasks
                .iter()
                .map(|task| client_safe_task(conn, task))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((ticket.id, shaped))
        })
        .await?;
    Ok(Json(json!({
        "ticket_id": ticket_id,
        "count": tasks.len(),
        "tasks": tasks,
    })))
}

/// `GET /client/active-timers`
///
/// Live view of every open session on tasks under the caller's projects,
/// with enough joined context to render "who is working on what".
pub async fn active_timers(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    guard::require_client(&caller)?;
    let caller_id = caller.id.clone();
    let (rows, projects_checked) = state
        .with_conn(move |conn| {
            let rows = TimerRepo::active_for_client(conn, &caller_id)?;
            let projects_checked = UserRepo::projects_count(conn, &caller_id)?;
            Ok((rows, projects_checked))
        })
        .await?;

    let timers: Vec<Value> = rows.iter().map(active_timer_json).collect();
    Ok(Json(json!({
        "client_id": caller.id,
        "active_timers": timers,
        "total_active_timers": timers.len(),
        "projects_checked": projects_checked,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })))
}

/// Fetch a project the caller owns; anything else reads as absent.
fn owned_project(
    conn: &Connection,
    project_id: &ProjectId,
    caller_id: &UserId,
) -> Result<atelier_core::Project, ApiError> {
    let project =
        ProjectRepo::get_by_id(conn, project_id)?.ok_or(StoreError::ProjectNotFound)?;
    if project.client_id != *caller_id {
        return Err(StoreError::ProjectNotFound.into());
    }
    Ok(project)
}

/// Fetch a ticket the caller raised; anything else reads as absent.
fn owned_ticket(
    conn: &Connection,
    ticket_id: &TicketId,
    caller_id: &UserId,
) -> Result<Ticket, ApiError> {
    let ticket = TicketRepo::get_by_id(conn, ticket_id)?.ok_or(StoreError::TicketNotFound)?;
    if ticket.client_id != *caller_id {
        return Err(StoreError::TicketNotFound.into());
    }
    Ok(ticket)
}

/// One project with its ticket counters attached.
fn project_with_counts(
    conn: &Connection,
    project: &atelier_core::Project,
) -> Result<Value, ApiError> {
    let counts = ProjectRepo::ticket_counts(conn, &project.id)?;
    object_with(
        project,
        vec![
            ("tickets_count", json!(counts.tickets_count)),
            ("open_tickets_count", json!(counts.open_tickets_count)),
        ],
    )
}

/// One ticket with its project summary, client-safe tasks, and stats.
fn shaped_ticket(conn: &Connection, ticket: &Ticket) -> Result<Value, ApiError> {
    let project = ProjectRepo::get_by_id(conn, &ticket.project_id)?
        .map(|p| json!({ "id": p.id, "name": p.name, "status": p.status }));

    let tasks = TaskRepo::list_by_ticket(conn, &ticket.id)?;
    let shaped_tasks = tasks
        .iter()
        .map(|task| client_safe_task(conn, task))
        .collect::<Result<Vec<_>, _>>()?;
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let active = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .count();

    object_with(
        ticket,
        vec![
            ("project", project.unwrap_or(Value::Null)),
            ("tasks", Value::Array(shaped_tasks)),
            ("tasks_count", json!(tasks.len())),
            ("completed_tasks", json!(completed)),
            ("active_tasks", json!(active)),
        ],
    )
}

/// The task shape clients see: no assignee id, no email, no internal ids
/// beyond the task's own.
fn client_safe_task(conn: &Connection, task: &Task) -> Result<Value, ApiError> {
    let assigned_to = match UserRepo::get_by_id(conn, &task.assigned_to)? {
        Some(user) => json!({ "name": user.full_name, "username": user.username }),
        None => json!({ "name": "Staff Member", "username": "staff" }),
    };
    Ok(json!({
        "id": task.id,
        "action": task.action,
        "priority": task.priority,
        "status": task.status,
        "assigned_to": assigned_to,
        "created_at": task.created_at,
        "updated_at": task.updated_at,
    }))
}

/// One active-timers row as the client sees it.
fn active_timer_json(row: &ActiveTimerRow) -> Value {
    // Display name falls back to the handle when the profile has none.
    let user_name = if row.user_name.is_empty() {
        row.user_username.clone()
    } else {
        row.user_name.clone()
    };
    json!({
        "task_id": row.task_id,
        "task_action": row.task_action,
        "start_time": row.start_time,
        "session_id": row.session_id,
        "user_id": row.user_id,
        "user_name": user_name,
        "user_username": row.user_username,
        "project": { "id": row.project_id, "name": row.project_name },
        "ticket": { "id": row.ticket_id, "message": row.ticket_message },
    })
}
