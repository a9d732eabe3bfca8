//! Schema migration runner for the collab-manager database.
//!
//! Migrations are embedded at compile time via [`include_str!`] and executed
//! in version order. Each migration runs inside a transaction; a failure
//! rolls back cleanly with no partial schema state.
//!
//! The `schema_version` table tracks which migrations have been applied.
//! Running the migrator is idempotent: already-applied versions are skipped.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::errors::{Result, StoreError};

/// A single migration with a version number and SQL to execute.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in version order.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Complete schema: users, projects, tickets, tasks, time sessions",
    sql: include_str!("v001_schema.sql"),
}];

/// Run all pending migrations on the given connection.
///
/// Creates the `schema_version` table if it doesn't exist, then applies
/// each migration whose version exceeds the current maximum. Each migration
/// runs in its own transaction.
///
/// # Errors
///
/// Returns [`StoreError::Migration`] if any migration SQL fails.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    ensure_version_table(conn)?;
    let current = current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version <= current {
            debug!(
                version = migration.version,
                description = migration.description,
                "migration already applied, skipping"
            );
            continue;
        }

        info!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );

        apply_migration(conn, migration)?;
        applied += 1;
    }

    if applied > 0 {
        info!(applied, "migrations complete");
    }

    Ok(applied)
}

/// Return the highest applied migration version, or 0 if none.
pub fn current_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::Migration {
            message: format!("failed to read schema_version: {e}"),
        })?;
    Ok(version)
}

/// Return the latest migration version defined in code.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal
// ─────────────────────────────────────────────────────────────────────────────

fn ensure_version_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
           version     INTEGER PRIMARY KEY,
           applied_at  TEXT    NOT NULL,
           description TEXT
         );",
    )
    .map_err(|e| StoreError::Migration {
        message: format!("failed to create schema_version table: {e}"),
    })?;
    Ok(())
}

fn apply_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StoreError::Migration {
            message: format!(
                "failed to begin transaction for v{}: {e}",
                migration.version
            ),
        })?;

    tx.execute_batch(migration.sql)
        .map_err(|e| StoreError::Migration {
            message: format!(
                "migration v{} ({}) failed: {e}",
                migration.version, migration.description
            ),
        })?;

    let _ = tx
        .execute(
            "INSERT INTO schema_version (version, applied_at, description) VALUES (?1, datetime('now'), ?2)",
            rusqlite::params![migration.version, migration.description],
        )
        .map_err(|e| StoreError::Migration {
            message: format!(
                "failed to record v{} in schema_version: {e}",
                migration.version
            ),
        })?;

    tx.commit().map_err(|e| StoreError::Migration {
        message: format!("failed to commit v{}: {e}", migration.version),
    })?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn open_memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;",
        )
        .unwrap();
        conn
    }

    #[test]
    fn run_migrations_creates_all_tables() {
        let conn = open_memory();
        let applied = run_migrations(&conn).unwrap();
        assert_eq!(applied, 1);

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        let expected = [
            "projects",
            "schema_version",
            "tasks",
            "tickets",
            "time_sessions",
            "users",
        ];
        for table in &expected {
            assert!(
                tables.contains(&(*table).to_string()),
                "missing table: {table}"
            );
        }
    }

    #[test]
    fn run_migrations_is_idempotent() {
        let conn = open_memory();
        assert_eq!(run_migrations(&conn).unwrap(), 1);
        assert_eq!(run_migrations(&conn).unwrap(), 0);
        assert_eq!(current_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn schema_enforces_role_check() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        let err = conn.execute(
            "INSERT INTO users (id, email, username, full_name, role, password_hash, created_at, updated_at)
             VALUES ('u1', 'a@b.c', 'a', 'A', 'superuser', 'x', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
            [],
        );
        assert!(err.is_err(), "CHECK constraint should reject unknown role");
    }

    #[test]
    fn schema_enforces_single_open_session_per_user_and_task() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, email, username, full_name, role, password_hash, created_at, updated_at)
             VALUES ('u1', 'a@b.c', 'a', 'A', 'admin', 'x', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z');
             INSERT INTO projects (id, name, client_id, created_at, updated_at)
             VALUES ('p1', 'P', 'u1', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z');
             INSERT INTO tickets (id, project_id, client_id, message, created_at, updated_at)
             VALUES ('k1', 'p1', 'u1', 'm', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z');
             INSERT INTO tasks (id, ticket_id, assigned_to, action, created_at, updated_at)
             VALUES ('t1', 'k1', 'u1', 'do it', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z');
             INSERT INTO time_sessions (id, task_id, user_id, start_time)
             VALUES ('s1', 't1', 'u1', '2025-01-01T00:00:00Z');",
        )
        .unwrap();

        // Second open session for the same (task, user) violates the
        // partial unique index.
        let err = conn.execute(
            "INSERT INTO time_sessions (id, task_id, user_id, start_time)
             VALUES ('s2', 't1', 'u1', '2025-01-01T01:00:00Z')",
            [],
        );
        assert!(err.is_err());

        // A closed session is exempt, so a new open one can follow it.
        conn.execute(
            "UPDATE time_sessions SET end_time = '2025-01-01T02:00:00Z', duration_minutes = 120
             WHERE id = 's1'",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO time_sessions (id, task_id, user_id, start_time)
             VALUES ('s3', 't1', 'u1', '2025-01-01T03:00:00Z')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn schema_enforces_foreign_keys() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        let err = conn.execute(
            "INSERT INTO projects (id, name, client_id, created_at, updated_at)
             VALUES ('p1', 'P', 'missing-user', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
            [],
        );
        assert!(err.is_err(), "FK should reject unknown client_id");
    }
}
