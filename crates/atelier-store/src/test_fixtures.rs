//! Shared fixtures for repository tests: an in-memory migrated connection
//! and seed helpers that go through the public repository APIs.

use std::sync::atomic::{AtomicU32, Ordering};

use atelier_core::{Project, Role, Task, TaskPriority, Ticket, TicketId, User, UserId};
use rusqlite::Connection;

use crate::migrations::run_migrations;
use crate::repositories::{
    CreateProjectOptions, CreateUserOptions, NewTaskSpec, ProjectRepo, TaskRepo, TicketRepo,
    UserRepo,
};

/// Monotonic counter so seeded emails and usernames never collide, even
/// across tests in one process (the unique indexes are case-insensitive).
static SEED_SEQ: AtomicU32 = AtomicU32::new(0);

fn next_seq() -> u32 {
    SEED_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// A fresh private in-memory database with migrations applied.
pub fn setup_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory database");
    conn.pragma_update(None, "foreign_keys", true)
        .expect("enable foreign keys");
    run_migrations(&conn).expect("run migrations");
    conn
}

/// Insert a user with a unique email/username for the given role.
pub fn seed_user(conn: &Connection, role: Role) -> User {
    let n = next_seq();
    UserRepo::create(
        conn,
        &CreateUserOptions {
            email: &format!("{}{n}@example.com", role.as_str()),
            username: &format!("{}_{n}", role.as_str()),
            full_name: &format!("Seed {} {n}", role.as_str()),
            role,
            password_hash: "seed-hash",
        },
    )
    .expect("seed user")
}

/// Insert a client user.
pub fn seed_client(conn: &Connection) -> User {
    seed_user(conn, Role::Client)
}

/// Insert an internal-staff user.
pub fn seed_staff(conn: &Connection) -> User {
    seed_user(conn, Role::InternalStaff)
}

/// Insert a project owned by `client_id`.
pub fn seed_project(conn: &Connection, client_id: &UserId) -> Project {
    let n = next_seq();
    ProjectRepo::create(
        conn,
        &CreateProjectOptions {
            name: &format!("Project {n}"),
            client_id,
            website_url: None,
            social_links: None,
        },
    )
    .expect("seed project")
}

/// Insert an unread ticket on the project, authored by its owner.
pub fn seed_ticket(conn: &Connection, project: &Project) -> Ticket {
    let n = next_seq();
    TicketRepo::create(
        conn,
        &project.id,
        &project.client_id,
        &format!("Please look at request {n}"),
    )
    .expect("seed ticket")
}

/// Insert a task on the ticket assigned to `assignee` (flips the ticket
/// to accepted if it was unread).
pub fn seed_task(conn: &Connection, ticket_id: &TicketId, assignee: &UserId) -> Task {
    let n = next_seq();
    TaskRepo::create(
        conn,
        ticket_id,
        &NewTaskSpec {
            action: format!("Seeded task {n}"),
            assigned_to: assignee.clone(),
            priority: TaskPriority::Medium,
        },
    )
    .expect("seed task")
    .task
}
