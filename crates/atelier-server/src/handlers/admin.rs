//! Admin surface: user listings, projects, dashboard, and ticket triage.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use atelier_core::{Project, ProjectId, Role, TaskPriority, TicketId, TicketStatus, UserId};
use atelier_store::StoreError;
use atelier_store::repositories::{
    CreateProjectOptions, DashboardRepo, DashboardStats, NewTaskSpec, ProjectRepo, TaskRepo,
    TicketRepo, UserRepo,
};

use crate::auth::CurrentUser;
use crate::errors::{ApiError, ApiJson, ApiResult};
use crate::guard;
use crate::handlers::object_with;
use crate::state::AppState;

/// Body of `POST /admin/projects`.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    /// Project name.
    pub name: String,
    /// Owning client account.
    pub client_id: UserId,
    /// Public website, if any.
    #[serde(default)]
    pub website_url: Option<String>,
    /// Free-form social media links.
    #[serde(default)]
    pub social_links: Option<Value>,
}

/// Body of `POST /admin/tasks`.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    /// Ticket the task is carved from.
    pub ticket_id: TicketId,
    /// Assignee; must be admin or internal staff.
    pub assigned_to: UserId,
    /// What needs doing.
    pub action: String,
    /// Urgency; defaults to `medium`.
    #[serde(default)]
    pub priority: Option<TaskPriority>,
}

/// One entry in the bulk-accept body.
#[derive(Debug, Deserialize)]
pub struct BulkTaskEntry {
    /// What needs doing.
    pub action: String,
    /// Assignee; must be admin or internal staff.
    pub assigned_to: UserId,
    /// Urgency; defaults to `medium`.
    #[serde(default)]
    pub priority: Option<TaskPriority>,
}

/// Body of `POST /admin/tickets/{id}/tasks`.
#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    /// Tasks to carve the ticket into. Must be non-empty.
    pub tasks: Vec<BulkTaskEntry>,
}

/// Body of `PATCH /admin/tickets/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct TicketStatusRequest {
    /// Target status. Only `rejected` is accepted here.
    pub status: TicketStatus,
}

/// `GET /admin/users`
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    guard::require_admin(&caller)?;
    let users = state
        .with_conn(|conn| UserRepo::list_all(conn).map_err(Into::into))
        .await?;
    Ok(Json(json!({ "count": users.len(), "users": users })))
}

/// `GET /admin/users/staff`
///
/// Staff accounts with their assigned-task counters.
pub async fn list_staff(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    guard::require_admin(&caller)?;
    let staff = state
        .with_conn(|conn| {
            let users = UserRepo::list_by_role(conn, Role::InternalStaff)?;
            let mut rows = Vec::with_capacity(users.len());
            for user in users {
                let counts = UserRepo::task_counts(conn, &user.id)?;
                rows.push(object_with(
                    &user,
                    vec![("task_counts", serde_json::to_value(counts)?)],
                )?);
            }
            Ok(rows)
        })
        .await?;
    Ok(Json(json!({ "count": staff.len(), "staff": staff })))
}

/// `GET /admin/users/clients`
///
/// Open to staff as well: assignees need the client roster when working
/// tickets.
pub async fn list_clients(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    guard::require_admin_or_staff(&caller)?;
    let clients = state
        .with_conn(|conn| {
            let users = UserRepo::list_by_role(conn, Role::Client)?;
            let mut rows = Vec::with_capacity(users.len());
            for user in users {
                let count = UserRepo::projects_count(conn, &user.id)?;
                rows.push(object_with(&user, vec![("projects_count", json!(count))])?);
            }
            Ok(rows)
        })
        .await?;
    Ok(Json(json!({ "count": clients.len(), "clients": clients })))
}

/// `POST /admin/projects`
pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiJson(body): ApiJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    guard::require_admin(&caller)?;
    if body.name.trim().is_empty() {
        return Err(ApiError::Validation("Project name is required".into()));
    }

    let project = state
        .with_conn(move |conn| {
            ProjectRepo::create(
                conn,
                &CreateProjectOptions {
                    name: &body.name,
                    client_id: &body.client_id,
                    website_url: body.website_url.as_deref(),
                    social_links: body.social_links.as_ref(),
                },
            )
            .map_err(Into::into)
        })
        .await?;

    tracing::info!(project_id = %project.id, client_id = %project.client_id, "project created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Project created successfully", "project": project })),
    ))
}

/// `GET /admin/projects`
///
/// Every project with its client summary and ticket → task expansion.
/// Individual time sessions stay behind the time-logs route.
pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    guard::require_admin(&caller)?;
    let projects = state
        .with_conn(|conn| {
            ProjectRepo::list_all(conn)?
                .iter()
                .map(|project| project_tree(conn, project))
                .collect::<Result<Vec<_>, _>>()
        })
        .await?;
    Ok(Json(json!({ "count": projects.len(), "projects": projects })))
}

/// `GET /admin/projects/{id}`
pub async fn get_project(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<Json<Value>> {
    guard::require_admin(&caller)?;
    let project = state
        .with_conn(move |conn| {
            let project =
                ProjectRepo::get_by_id(conn, &project_id)?.ok_or(StoreError::ProjectNotFound)?;
            project_tree(conn, &project)
        })
        .await?;
    Ok(Json(json!({ "project": project })))
}

/// `GET /admin/dashboard`
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<DashboardStats>> {
    guard::require_admin(&caller)?;
    let stats = state
        .with_conn(|conn| DashboardRepo::stats(conn).map_err(Into::into))
        .await?;
    Ok(Json(stats))
}

/// `POST /admin/tasks`
///
/// Creating the first task under a `to_read` ticket accepts the ticket in
/// the same transaction; the response reports the resulting status.
pub async fn create_task(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiJson(body): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    guard::require_admin(&caller)?;

    let CreateTaskRequest {
        ticket_id,
        assigned_to,
        action,
        priority,
    } = body;
    let spec = NewTaskSpec {
        action,
        assigned_to,
        priority: priority.unwrap_or(TaskPriority::Medium),
    };

    let created = state
        .with_conn(move |conn| TaskRepo::create(conn, &ticket_id, &spec).map_err(Into::into))
        .await?;

    tracing::info!(
        task_id = %created.task.id,
        ticket_id = %created.task.ticket_id,
        ticket_status = %created.ticket_status,
        "task created"
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Task created successfully",
            "task": created.task,
            "ticket_status": created.ticket_status,
        })),
    ))
}

/// `POST /admin/tickets/{id}/tasks`
///
/// Bulk accept: every entry is validated before anything is written, then
/// all tasks land and the ticket flips to `accepted` in one transaction.
pub async fn create_tasks_bulk(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(ticket_id): Path<TicketId>,
    ApiJson(body): ApiJson<BulkCreateRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    guard::require_admin(&caller)?;

    let specs: Vec<NewTaskSpec> = body
        .tasks
        .into_iter()
        .map(|entry| NewTaskSpec {
            action: entry.action,
            assigned_to: entry.assigned_to,
            priority: entry.priority.unwrap_or(TaskPriority::Medium),
        })
        .collect();

    let (ticket, tasks) = state
        .with_conn(move |conn| {
            TicketRepo::accept_with_tasks(conn, &ticket_id, &specs).map_err(Into::into)
        })
        .await?;

    tracing::info!(ticket_id = %ticket.id, count = tasks.len(), "ticket accepted with tasks");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Tasks created successfully",
            "count": tasks.len(),
            "tasks": tasks,
            "ticket_id": ticket.id,
            "ticket_status": ticket.status,
        })),
    ))
}

/// `PATCH /admin/tickets/{id}/status`
///
/// The only direct status change is `to_read → rejected`; acceptance
/// happens as a side effect of task creation.
pub async fn update_ticket_status(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(ticket_id): Path<TicketId>,
    ApiJson(body): ApiJson<TicketStatusRequest>,
) -> ApiResult<Json<Value>> {
    guard::require_admin(&caller)?;
    if body.status != TicketStatus::Rejected {
        return Err(ApiError::Validation(
            "Tickets can only be rejected; acceptance happens through task creation".into(),
        ));
    }

    let ticket = state
        .with_conn(move |conn| TicketRepo::reject(conn, &ticket_id).map_err(Into::into))
        .await?;

    tracing::info!(ticket_id = %ticket.id, "ticket rejected");
    Ok(Json(json!({
        "message": "Ticket status updated successfully",
        "ticket": ticket,
    })))
}

/// One project with its client summary and ticket → task tree attached.
fn project_tree(conn: &Connection, project: &Project) -> Result<Value, ApiError> {
    let client = UserRepo::get_by_id(conn, &project.client_id)?.map(|client| {
        json!({
            "id": client.id,
            "email": client.email,
            "username": client.username,
            "full_name": client.full_name,
        })
    });

    let tickets = TicketRepo::list_by_project(conn, &project.id)?;
    let mut ticket_rows = Vec::with_capacity(tickets.len());
    for ticket in tickets {
        let tasks = TaskRepo::list_by_ticket(conn, &ticket.id)?;
        ticket_rows.push(object_with(
            &ticket,
            vec![("tasks", serde_json::to_value(tasks)?)],
        )?);
    }

    object_with(
        project,
        vec![
            ("client", client.unwrap_or(Value::Null)),
            ("tickets", Value::Array(ticket_rows)),
        ],
    )
}
