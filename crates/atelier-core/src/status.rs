//! Status and priority vocabularies for projects, tickets, and tasks.
//!
//! Every enum here maps to a `CHECK`-constrained TEXT column. Serialized
//! names are the snake_case strings stored in the database and sent over
//! the wire, so `as_str` and serde must always agree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Actively being worked on. Counted as "active" on the dashboard.
    InDevelopment,
    /// Delivered.
    Completed,
    /// Paused by agreement with the client.
    OnHold,
    /// Abandoned.
    Cancelled,
}

impl ProjectStatus {
    /// Canonical string form (e.g. `"in_development"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InDevelopment => "in_development",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Triage state of a client ticket.
///
/// The machine is `to_read → accepted | rejected`. Acceptance happens
/// atomically with creating the ticket's first tasks; rejection is an
/// explicit admin action. Both are terminal. A ticket counts as "open"
/// while it is still `to_read`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Awaiting admin triage.
    ToRead,
    /// Converted into one or more tasks.
    Accepted,
    /// Declined by an admin.
    Rejected,
}

impl TicketStatus {
    /// Canonical string form (e.g. `"to_read"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToRead => "to_read",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

/// Work state of a task. Tasks are born `in_progress` and may be toggled
/// to `completed` and back by the assignee or an admin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Being worked.
    InProgress,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// Canonical string form (e.g. `"in_progress"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

/// Priority assigned to a task at creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Low urgency.
    Low,
    /// Normal urgency. The default when none is given.
    #[default]
    Medium,
    /// Elevated urgency.
    High,
    /// Drop everything.
    Urgent,
}

/// All priorities in escalation order. Used for validation messages.
pub const ALL_PRIORITIES: [TaskPriority; 4] = [
    TaskPriority::Low,
    TaskPriority::Medium,
    TaskPriority::High,
    TaskPriority::Urgent,
];

impl TaskPriority {
    /// Canonical string form (e.g. `"medium"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Serde owns the canonical names; route through it so they can't drift.
        serde_json::from_value(serde_json::Value::String(s.to_owned()))
            .map_err(|_| format!("unknown priority: {s}"))
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

display_as_str!(ProjectStatus, TicketStatus, TaskStatus, TaskPriority);

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
