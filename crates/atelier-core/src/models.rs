//! Domain models as they cross the API boundary.
//!
//! These structs are row-shaped: the store layer builds them straight from
//! SQL rows and handlers serialize them into response envelopes, so field
//! names here are the wire format. Timestamps are RFC 3339 UTC strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ProjectId, SessionId, TaskId, TicketId, UserId};
use crate::roles::Role;
use crate::status::{ProjectStatus, TaskPriority, TaskStatus, TicketStatus};

/// A user account.
///
/// The password hash never leaves the store layer; this struct is safe to
/// serialize into any response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID (UUID v7).
    pub id: UserId,
    /// Login email, unique case-insensitively.
    pub email: String,
    /// Short handle, unique case-insensitively.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// Account role, fixed at registration.
    pub role: Role,
    /// Disabled accounts keep their data but cannot authenticate.
    pub is_active: bool,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-modification timestamp.
    pub updated_at: String,
}

/// A client's project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project ID (UUID v7).
    pub id: ProjectId,
    /// Project name.
    pub name: String,
    /// Owning client account.
    pub client_id: UserId,
    /// Lifecycle status. New projects start `in_development`.
    pub status: ProjectStatus,
    /// Public website, if any.
    pub website_url: Option<String>,
    /// Free-form social media links (opaque JSON).
    pub social_links: Option<Value>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-modification timestamp.
    pub updated_at: String,
}

/// A request raised by a client against one of their projects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket ID (UUID v7).
    pub id: TicketId,
    /// Project the ticket belongs to.
    pub project_id: ProjectId,
    /// Client who raised it. Always the project owner.
    pub client_id: UserId,
    /// What the client is asking for.
    pub message: String,
    /// Triage state. New tickets start `to_read`.
    pub status: TicketStatus,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-modification timestamp.
    pub updated_at: String,
}

/// A unit of work carved out of a ticket and assigned to one user.
///
/// `total_time_minutes` and `time_sessions_count` are aggregates over the
/// task's closed time sessions, maintained transactionally when a timer
/// stops. The sessions themselves live in their own table and are served
/// by the time-log routes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID (UUID v7).
    pub id: TaskId,
    /// Ticket this task was carved from.
    pub ticket_id: TicketId,
    /// User responsible for the work.
    pub assigned_to: UserId,
    /// What needs doing.
    pub action: String,
    /// Urgency, set at creation.
    pub priority: TaskPriority,
    /// Work state. New tasks start `in_progress`.
    pub status: TaskStatus,
    /// Sum of `duration_minutes` over closed sessions.
    pub total_time_minutes: i64,
    /// Number of closed sessions.
    pub time_sessions_count: i64,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-modification timestamp.
    pub updated_at: String,
}

/// One time-tracking session on a task.
///
/// A session is open while `end_time` is null. Each user holds at most one
/// open session per task; `duration_minutes` is filled in when the session
/// closes (elapsed seconds divided by 60, rounded to nearest).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSession {
    /// Unique session ID (UUID v7).
    pub id: SessionId,
    /// Task being timed.
    pub task_id: TaskId,
    /// User running the timer.
    pub user_id: UserId,
    /// RFC 3339 start timestamp.
    pub start_time: String,
    /// RFC 3339 end timestamp, null while the session is open.
    pub end_time: Option<String>,
    /// Whole minutes covered by this session, null while open.
    pub duration_minutes: Option<i64>,
}

impl TimeSession {
    /// Whether the session is still running.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: UserId::from("user-1"),
            email: "dev@atelier.test".to_owned(),
            username: "dev".to_owned(),
            full_name: "Dev Eloper".to_owned(),
            role: Role::InternalStaff,
            is_active: true,
            created_at: "2025-01-01T00:00:00Z".to_owned(),
            updated_at: "2025-01-01T00:00:00Z".to_owned(),
        }
    }

    #[test]
    fn user_serializes_without_secrets() {
        let json = serde_json::to_value(sample_user()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("email"));
        assert!(obj.contains_key("role"));
        assert!(!obj.contains_key("password"));
        assert!(!obj.contains_key("password_hash"));
        assert_eq!(obj["role"], "internal_staff");
    }

    #[test]
    fn user_roundtrip() {
        let user = sample_user();
        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(user, back);
    }

    #[test]
    fn project_optional_fields_serialize_as_null() {
        let project = Project {
            id: ProjectId::from("proj-1"),
            name: "Site redesign".to_owned(),
            client_id: UserId::from("user-2"),
            status: ProjectStatus::InDevelopment,
            website_url: None,
            social_links: None,
            created_at: "2025-01-01T00:00:00Z".to_owned(),
            updated_at: "2025-01-01T00:00:00Z".to_owned(),
        };
        let json = serde_json::to_value(&project).unwrap();
        assert!(json["website_url"].is_null());
        assert!(json["social_links"].is_null());
        assert_eq!(json["status"], "in_development");
    }

    #[test]
    fn task_serializes_aggregates() {
        let task = Task {
            id: TaskId::from("task-1"),
            ticket_id: TicketId::from("ticket-1"),
            assigned_to: UserId::from("user-1"),
            action: "Wire up login".to_owned(),
            priority: TaskPriority::High,
            status: TaskStatus::InProgress,
            total_time_minutes: 90,
            time_sessions_count: 2,
            created_at: "2025-01-01T00:00:00Z".to_owned(),
            updated_at: "2025-01-01T00:00:00Z".to_owned(),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["total_time_minutes"], 90);
        assert_eq!(json["time_sessions_count"], 2);
        assert_eq!(json["priority"], "high");
    }

    #[test]
    fn open_session_is_open() {
        let session = TimeSession {
            id: SessionId::from("sess-1"),
            task_id: TaskId::from("task-1"),
            user_id: UserId::from("user-1"),
            start_time: "2025-01-01T09:00:00Z".to_owned(),
            end_time: None,
            duration_minutes: None,
        };
        assert!(session.is_open());

        let closed = TimeSession {
            end_time: Some("2025-01-01T10:30:00Z".to_owned()),
            duration_minutes: Some(90),
            ..session
        };
        assert!(!closed.is_open());
    }
}
