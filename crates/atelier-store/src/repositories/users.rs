//! User account repository.

use atelier_core::{Role, User, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use super::{now_rfc3339, role_from_sql};
use crate::errors::{Result, StoreError};

/// Repository for user account rows.
pub struct UserRepo;

/// Options for creating a user account.
#[derive(Debug, Clone)]
pub struct CreateUserOptions<'a> {
    /// Login email; stored lowercased, unique case-insensitively.
    pub email: &'a str,
    /// Short handle, unique case-insensitively.
    pub username: &'a str,
    /// Display name.
    pub full_name: &'a str,
    /// Account role, fixed for the account's lifetime.
    pub role: Role,
    /// Pre-hashed password. The store never sees plaintext.
    pub password_hash: &'a str,
}

/// Assigned-task counters reported on the admin staff listing.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TaskCounts {
    /// All tasks ever assigned to the user.
    pub total_assigned: i64,
    /// Assigned tasks still `in_progress`.
    pub active_tasks: i64,
}

impl UserRepo {
    /// Create a user account.
    ///
    /// Email and username are checked up front so the caller gets a precise
    /// conflict message; the UNIQUE indexes remain the backstop under
    /// concurrent writers.
    pub fn create(conn: &Connection, opts: &CreateUserOptions<'_>) -> Result<User> {
        let email = opts.email.trim().to_lowercase();
        let username = opts.username.trim().to_owned();

        if Self::email_exists(conn, &email)? {
            return Err(StoreError::Conflict("Email already registered".into()));
        }
        if Self::username_exists(conn, &username)? {
            return Err(StoreError::Conflict("Username already taken".into()));
        }

        let now = now_rfc3339();
        let user = User {
            id: UserId::new(),
            email,
            username,
            full_name: opts.full_name.trim().to_owned(),
            role: opts.role,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        };

        let _ = conn.execute(
            "INSERT INTO users (id, email, username, full_name, role, is_active, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.id.as_str(),
                user.email,
                user.username,
                user.full_name,
                user.role.as_str(),
                user.is_active,
                opts.password_hash,
                user.created_at,
                user.updated_at,
            ],
        )?;

        Ok(user)
    }

    /// Fetch a user by id.
    pub fn get_by_id(conn: &Connection, id: &UserId) -> Result<Option<User>> {
        conn.query_row(
            "SELECT id, email, username, full_name, role, is_active, created_at, updated_at
             FROM users WHERE id = ?1",
            params![id.as_str()],
            Self::map_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Fetch a user plus their stored password hash by login email.
    ///
    /// Lookup is case-insensitive. This is the only query that surfaces the
    /// hash; it exists solely for the login path.
    pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<(User, String)>> {
        conn.query_row(
            "SELECT id, email, username, full_name, role, is_active, created_at, updated_at, password_hash
             FROM users WHERE email = ?1",
            params![email.trim()],
            |row| Ok((Self::map_row(row)?, row.get("password_hash")?)),
        )
        .optional()
        .map_err(Into::into)
    }

    /// List every account, oldest first.
    ///
    /// `id` is a UUID v7 and therefore time-ordered, so it acts as the
    /// tiebreak when two rows share a timestamp. Same trick in every
    /// other listing query.
    pub fn list_all(conn: &Connection) -> Result<Vec<User>> {
        let mut stmt = conn.prepare(
            "SELECT id, email, username, full_name, role, is_active, created_at, updated_at
             FROM users ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map([], Self::map_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// List accounts holding `role`, oldest first.
    pub fn list_by_role(conn: &Connection, role: Role) -> Result<Vec<User>> {
        let mut stmt = conn.prepare(
            "SELECT id, email, username, full_name, role, is_active, created_at, updated_at
             FROM users WHERE role = ?1 ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map(params![role.as_str()], Self::map_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Assigned-task counters for one user.
    pub fn task_counts(conn: &Connection, id: &UserId) -> Result<TaskCounts> {
        let total_assigned: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE assigned_to = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        let active_tasks: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE assigned_to = ?1 AND status = 'in_progress'",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(TaskCounts {
            total_assigned,
            active_tasks,
        })
    }

    /// Number of projects owned by one client.
    pub fn projects_count(conn: &Connection, id: &UserId) -> Result<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM projects WHERE client_id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )
        .map_err(Into::into)
    }

    fn email_exists(conn: &Connection, email: &str) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub(crate) fn map_row(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: UserId::from_string(row.get("id")?),
            email: row.get("email")?,
            username: row.get("username")?,
            full_name: row.get("full_name")?,
            role: role_from_sql(&row.get::<_, String>("role")?),
            is_active: row.get("is_active")?,
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
    use crate::test_fixtures::{seed_client, seed_staff, seed_user, setup_conn};
    use assert_matches::assert_matches;

    #[test]
    fn create_and_get_round_trip() {
        let conn = setup_conn();
        let user = UserRepo::create(
            &conn,
            &CreateUserOptions {
                email: "Ada@Example.COM",
                username: "ada",
                full_name: "Ada Lovelace",
                role: Role::InternalStaff,
                password_hash: "salt$digest",
            },
        )
        .unwrap();

        // Email is normalized on write.
        assert_eq!(user.email, "ada@example.com");
        assert!(user.is_active);

        let fetched = UserRepo::get_by_id(&conn, &user.id).unwrap().unwrap();
        assert_eq!(fetched, user);
    }

    #[test]
    fn get_by_id_returns_none_for_unknown() {
        let conn = setup_conn();
        let missing = UserRepo::get_by_id(&conn, &UserId::new()).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn find_by_email_is_case_insensitive_and_returns_hash() {
        let conn = setup_conn();
        let user = UserRepo::create(
            &conn,
            &CreateUserOptions {
                email: "grace@example.com",
                username: "grace",
                full_name: "Grace Hopper",
                role: Role::Admin,
                password_hash: "salt$digest",
            },
        )
        .unwrap();

        let (found, hash) = UserRepo::find_by_email(&conn, "GRACE@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(hash, "salt$digest");

        assert!(UserRepo::find_by_email(&conn, "nobody@example.com")
            .unwrap()
            .is_none());
    }

    #[test]
    fn duplicate_email_conflicts() {
        let conn = setup_conn();
        let user = seed_client(&conn);
        let err = UserRepo::create(
            &conn,
            &CreateUserOptions {
                email: &user.email.to_uppercase(),
                username: "someone-else",
                full_name: "Someone Else",
                role: Role::Client,
                password_hash: "x",
            },
        )
        .unwrap_err();
        assert_matches!(err, StoreError::Conflict(msg) if msg == "Email already registered");
    }

    #[test]
    fn duplicate_username_conflicts() {
        let conn = setup_conn();
        let user = seed_client(&conn);
        let err = UserRepo::create(
            &conn,
            &CreateUserOptions {
                email: "fresh@example.com",
                username: &user.username,
                full_name: "Someone Else",
                role: Role::Client,
                password_hash: "x",
            },
        )
        .unwrap_err();
        assert_matches!(err, StoreError::Conflict(msg) if msg == "Username already taken");
    }

    #[test]
    fn list_by_role_filters_and_orders_oldest_first() {
        let conn = setup_conn();
        let staff_a = seed_staff(&conn);
        let _client = seed_client(&conn);
        let staff_b = seed_staff(&conn);

        let staff = UserRepo::list_by_role(&conn, Role::InternalStaff).unwrap();
        let ids: Vec<_> = staff.iter().map(|u| u.id.clone()).collect();
        assert_eq!(ids, vec![staff_a.id, staff_b.id]);

        assert_eq!(UserRepo::list_all(&conn).unwrap().len(), 3);
    }

    #[test]
    fn task_counts_split_total_and_active() {
        let conn = setup_conn();
        let staff = seed_staff(&conn);

        // No tasks yet.
        let counts = UserRepo::task_counts(&conn, &staff.id).unwrap();
        assert_eq!(counts.total_assigned, 0);
        assert_eq!(counts.active_tasks, 0);

        let client = seed_client(&conn);
        let project = crate::test_fixtures::seed_project(&conn, &client.id);
        let ticket = crate::test_fixtures::seed_ticket(&conn, &project);
        let task = crate::test_fixtures::seed_task(&conn, &ticket.id, &staff.id);
        let _ = crate::test_fixtures::seed_task(&conn, &ticket.id, &staff.id);

        conn.execute(
            "UPDATE tasks SET status = 'completed' WHERE id = ?1",
            params![task.id.as_str()],
        )
        .unwrap();

        let counts = UserRepo::task_counts(&conn, &staff.id).unwrap();
        assert_eq!(counts.total_assigned, 2);
        assert_eq!(counts.active_tasks, 1);
    }

    #[test]
    fn projects_count_counts_owned_projects() {
        let conn = setup_conn();
        let client = seed_client(&conn);
        let other = seed_user(&conn, Role::Client);
        let _ = crate::test_fixtures::seed_project(&conn, &client.id);
        let _ = crate::test_fixtures::seed_project(&conn, &client.id);

        assert_eq!(UserRepo::projects_count(&conn, &client.id).unwrap(), 2);
        assert_eq!(UserRepo::projects_count(&conn, &other.id).unwrap(), 0);
    }
}
