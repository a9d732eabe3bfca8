//! Assigned-work routes: my tasks, status updates, timers, and time logs.

use axum::Json;
use axum::extract::{Path, State};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use atelier_core::{Task, TaskId, TaskStatus, UserId};
use atelier_store::StoreError;
use atelier_store::repositories::{ProjectRepo, TaskRepo, TicketRepo, TimerRepo, UserRepo};

use crate::auth::CurrentUser;
use crate::errors::{ApiError, ApiJson, ApiResult};
use crate::guard;
use crate::handlers::object_with;
use crate::state::AppState;

/// Body of `PATCH /tasks/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct TaskStatusRequest {
    /// Target work state.
    pub status: TaskStatus,
}

/// `GET /tasks/my`
pub async fn my_tasks(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    guard::require_admin_or_staff(&caller)?;
    list_assigned(state, caller.id, None).await
}

/// `GET /tasks/my/active`
pub async fn my_active_tasks(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    guard::require_admin_or_staff(&caller)?;
    list_assigned(state, caller.id, Some(TaskStatus::InProgress)).await
}

/// `GET /tasks/my/time-summary`
///
/// Per-task time aggregates for the caller's assignments, plus totals
/// across all of them.
pub async fn my_time_summary(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    guard::require_admin_or_staff(&caller)?;
    let caller_id = caller.id;
    let payload = state
        .with_conn(move |conn| {
            let tasks = TaskRepo::list_by_assignee(conn, &caller_id, None)?;
            let mut rows = Vec::with_capacity(tasks.len());
            let mut total_minutes = 0_i64;
            let mut total_sessions = 0_i64;
            let mut running = 0_i64;
            for task in &tasks {
                let timer_open = TimerRepo::open_session(conn, &task.id, &caller_id)?.is_some();
                if timer_open {
                    running += 1;
                }
                total_minutes += task.total_time_minutes;
                total_sessions += task.time_sessions_count;
                rows.push(json!({
                    "task_id": task.id,
                    "action": task.action,
                    "status": task.status,
                    "total_time_minutes": task.total_time_minutes,
                    "time_sessions_count": task.time_sessions_count,
                    "is_timer_running": timer_open,
                }));
            }
            Ok(json!({
                "count": rows.len(),
                "tasks": rows,
                "totals": {
                    "total_time_minutes": total_minutes,
                    "total_time_hours": hours_rounded(total_minutes),
                    "sessions_count": total_sessions,
                    "running_timers": running,
                },
            }))
        })
        .await?;
    Ok(Json(payload))
}

/// `PATCH /tasks/{id}/status`
pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(task_id): Path<TaskId>,
    ApiJson(body): ApiJson<TaskStatusRequest>,
) -> ApiResult<Json<Value>> {
    guard::require_admin_or_staff(&caller)?;
    let task = state
        .with_conn(move |conn| {
            let task = TaskRepo::get_by_id(conn, &task_id)?.ok_or(StoreError::TaskNotFound)?;
            guard::require_assignee_or_admin(&caller, &task.assigned_to)?;
            TaskRepo::update_status(conn, &task.id, body.status).map_err(Into::into)
        })
        .await?;
    tracing::info!(task_id = %task.id, status = %task.status, "task status updated");
    Ok(Json(json!({
        "message": "Task status updated successfully",
        "task": task,
    })))
}

/// `POST /tasks/{id}/timer/start`
///
/// Assignee or admin. Starting also flips the task to `in_progress`.
pub async fn start_timer(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(task_id): Path<TaskId>,
) -> ApiResult<Json<Value>> {
    guard::require_admin_or_staff(&caller)?;
    let session = state
        .with_conn(move |conn| {
            let task = TaskRepo::get_by_id(conn, &task_id)?.ok_or(StoreError::TaskNotFound)?;
            guard::require_assignee_or_admin(&caller, &task.assigned_to)?;
            TimerRepo::start(conn, &task.id, &caller.id).map_err(Into::into)
        })
        .await?;
    tracing::info!(task_id = %session.task_id, user_id = %session.user_id, "timer started");
    Ok(Json(json!({
        "message": "Timer started successfully",
        "task_id": session.task_id.clone(),
        "session": session,
    })))
}

/// `POST /tasks/{id}/timer/stop`
///
/// Closes the caller's open session and reports the task's refreshed
/// aggregates.
pub async fn stop_timer(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(task_id): Path<TaskId>,
) -> ApiResult<Json<Value>> {
    guard::require_admin_or_staff(&caller)?;
    let stopped = state
        .with_conn(move |conn| {
            let task = TaskRepo::get_by_id(conn, &task_id)?.ok_or(StoreError::TaskNotFound)?;
            guard::require_assignee_or_admin(&caller, &task.assigned_to)?;
            TimerRepo::stop(conn, &task.id, &caller.id).map_err(Into::into)
        })
        .await?;
    tracing::info!(
        task_id = %stopped.session.task_id,
        duration_minutes = stopped.session.duration_minutes.unwrap_or(0),
        "timer stopped"
    );
    Ok(Json(json!({
        "message": "Timer stopped successfully",
        "task_id": stopped.session.task_id.clone(),
        "session": stopped.session,
        "total_time_minutes": stopped.total_time_minutes,
        "sessions_count": stopped.sessions_count,
    })))
}

/// `GET /tasks/{id}/time-logs`
///
/// Admins see every session on the task; internal staff see only their
/// own. The summary block always reflects the whole task.
pub async fn time_logs(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(task_id): Path<TaskId>,
) -> ApiResult<Json<Value>> {
    guard::require_admin_or_staff(&caller)?;
    let payload = state
        .with_conn(move |conn| {
            let task = TaskRepo::get_by_id(conn, &task_id)?.ok_or(StoreError::TaskNotFound)?;
            let only_user = if caller.role.is_admin() {
                None
            } else {
                Some(&caller.id)
            };
            let sessions = TimerRepo::list_for_task(conn, &task.id, only_user)?;
            let active = sessions.iter().find(|session| session.is_open()).cloned();

            let assigned_to = match UserRepo::get_by_id(conn, &task.assigned_to)? {
                Some(user) => json!({ "full_name": user.full_name, "username": user.username }),
                None => json!({ "full_name": "Staff Member", "username": "staff" }),
            };

            Ok(json!({
                "task_id": task.id,
                "task_action": task.action,
                "assigned_to": assigned_to,
                "time_logs": sessions,
                "active_session": active,
                "summary": {
                    "total_time_minutes": task.total_time_minutes,
                    "total_time_hours": hours_rounded(task.total_time_minutes),
                    "sessions_count": task.time_sessions_count,
                    "is_timer_running": TimerRepo::has_open_session(conn, &task.id)?,
                },
            }))
        })
        .await?;
    Ok(Json(payload))
}

async fn list_assigned(
    state: AppState,
    caller_id: UserId,
    status: Option<TaskStatus>,
) -> ApiResult<Json<Value>> {
    let tasks = state
        .with_conn(move |conn| {
            TaskRepo::list_by_assignee(conn, &caller_id, status)?
                .iter()
                .map(|task| task_with_context(conn, task))
                .collect::<Result<Vec<_>, _>>()
        })
        .await?;
    Ok(Json(json!({ "count": tasks.len(), "tasks": tasks })))
}

/// One assigned task with its ticket → project → client context.
fn task_with_context(conn: &Connection, task: &Task) -> Result<Value, ApiError> {
    let context = match TicketRepo::get_by_id(conn, &task.ticket_id)? {
        Some(ticket) => {
            let project = match ProjectRepo::get_by_id(conn, &ticket.project_id)? {
                Some(project) => {
                    let client = UserRepo::get_by_id(conn, &project.client_id)?.map_or(
                        Value::Null,
                        |client| {
                            json!({ "full_name": client.full_name, "email": client.email })
                        },
                    );
                    json!({ "id": project.id, "name": project.name, "client": client })
                }
                None => Value::Null,
            };
            json!({
                "id": ticket.id,
                "message": ticket.message,
                "status": ticket.status,
                "project": project,
            })
        }
        None => Value::Null,
    };
    object_with(task, vec![("ticket", context)])
}

/// Whole minutes as hours, rounded to two decimals.
#[allow(clippy::cast_precision_loss)]
fn hours_rounded(minutes: i64) -> f64 {
    (minutes as f64 / 60.0 * 100.0).round() / 100.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
