//! # atelier-core
//!
//! Shared vocabulary for the Atelier collab-manager API.
//!
//! This crate provides the types every other Atelier crate depends on:
//!
//! - **Branded IDs**: `UserId`, `ProjectId`, `TicketId`, `TaskId`, `SessionId` as newtypes for type safety
//! - **Roles**: closed `Role` enum (`admin`, `internal_staff`, `client`) with the static permission sets
//! - **Statuses**: `ProjectStatus`, `TicketStatus`, `TaskStatus`, `TaskPriority` state vocabularies
//! - **Models**: `User`, `Project`, `Ticket`, `Task`, `TimeSession` rows as they cross the API boundary

#![deny(unsafe_code)]

pub mod ids;
pub mod models;
pub mod roles;
pub mod status;

pub use ids::{ProjectId, SessionId, TaskId, TicketId, UserId};
pub use models::{Project, Task, Ticket, TimeSession, User};
pub use roles::{ADMIN_ONLY, ADMIN_OR_STAFF, Role};
pub use status::{ProjectStatus, TaskPriority, TaskStatus, TicketStatus};
