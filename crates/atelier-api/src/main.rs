//! # atelier-api
//!
//! Atelier API server binary. Wires settings, the SQLite store, and the
//! HTTP server together, and carries a small bootstrap subcommand for
//! creating the first admin account.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use atelier_auth::hash_password;
use atelier_core::Role;
use atelier_server::{Server, Settings};
use atelier_store::repositories::{CreateUserOptions, UserRepo};
use atelier_store::{ConnectionConfig, ConnectionPool, new_file, run_migrations};

/// Atelier collab manager API.
#[derive(Parser, Debug)]
#[command(name = "atelier-api", about = "Atelier collab manager API")]
struct Cli {
    /// Path to a JSON settings file. Environment variables still win.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines instead of compact text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (the default when no subcommand is given).
    Serve,

    /// Create an admin account directly in the database.
    ///
    /// Registration over HTTP requires an admin token, so the very first
    /// admin has to come from here.
    CreateAdmin {
        /// Login email.
        #[arg(long)]
        email: String,
        /// Short unique handle.
        #[arg(long)]
        username: String,
        /// Display name.
        #[arg(long)]
        full_name: String,
        /// Plaintext password; only the hash is stored.
        #[arg(long)]
        password: String,
    },
}

fn init_tracing(log_json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init is a no-op if a subscriber is already set
    if log_json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.compact().try_init();
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Open the pooled database named in the settings and bring the schema
/// up to date.
fn open_pool(settings: &Settings) -> Result<ConnectionPool> {
    ensure_parent_dir(Path::new(&settings.database_path))?;
    let config = ConnectionConfig {
        pool_size: settings.pool_size,
        ..ConnectionConfig::default()
    };
    let pool = new_file(&settings.database_path, &config)
        .with_context(|| format!("failed to open database: {}", settings.database_path))?;
    let conn = pool.get().context("failed to check out a connection")?;
    let version = run_migrations(&conn).context("failed to run migrations")?;
    tracing::info!(path = %settings.database_path, schema_version = version, "database ready");
    Ok(pool)
}

async fn serve(config_path: Option<&Path>) -> Result<()> {
    let settings = Settings::load(config_path).context("failed to load settings")?;
    let pool = open_pool(&settings)?;

    let server = Server::new(settings, pool);
    let (addr, handle) = server.listen().await.context("failed to bind server")?;
    tracing::info!(%addr, "atelier API ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");
    handle.abort();
    let _ = handle.await;
    Ok(())
}

fn create_admin(
    config_path: Option<&Path>,
    email: &str,
    username: &str,
    full_name: &str,
    password: &str,
) -> Result<()> {
    if email.trim().is_empty() || username.trim().is_empty() || full_name.trim().is_empty() {
        anyhow::bail!("email, username, and full name must be non-empty");
    }
    if password.len() < 8 {
        anyhow::bail!("password must be at least 8 characters");
    }

    let settings = Settings::load(config_path).context("failed to load settings")?;
    let pool = open_pool(&settings)?;
    let conn = pool.get().context("failed to check out a connection")?;

    let user = UserRepo::create(
        &conn,
        &CreateUserOptions {
            email,
            username,
            full_name,
            role: Role::Admin,
            password_hash: &hash_password(password),
        },
    )
    .context("failed to create admin account")?;

    println!("Created admin {} <{}>", user.username, user.email);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match &cli.command {
        None | Some(Command::Serve) => serve(cli.config.as_deref()).await,
        Some(Command::CreateAdmin {
            email,
            username,
            full_name,
            password,
        }) => create_admin(cli.config.as_deref(), email, username, full_name, password),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_defaults_to_serve() {
        let cli = Cli::parse_from(["atelier-api"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
        assert!(!cli.log_json);
    }

    #[test]
    fn cli_accepts_config_path() {
        let cli = Cli::parse_from(["atelier-api", "--config", "/tmp/settings.json"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/settings.json")));
    }

    #[test]
    fn cli_config_is_global() {
        let cli = Cli::parse_from(["atelier-api", "serve", "--config", "/tmp/settings.json"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/settings.json")));
    }

    #[test]
    fn cli_parses_create_admin() {
        let cli = Cli::parse_from([
            "atelier-api",
            "create-admin",
            "--email",
            "root@example.com",
            "--username",
            "root",
            "--full-name",
            "Root Admin",
            "--password",
            "password123",
        ]);
        match cli.command {
            Some(Command::CreateAdmin { email, username, .. }) => {
                assert_eq!(email, "root@example.com");
                assert_eq!(username, "root");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn ensure_parent_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("atelier.db");
        ensure_parent_dir(&path).unwrap();
        assert!(path.parent().unwrap().exists());
    }

    #[test]
    fn create_admin_validates_before_touching_the_database() {
        let err = create_admin(None, "root@example.com", "root", "Root", "short")
            .unwrap_err()
            .to_string();
        assert!(err.contains("at least 8 characters"), "{err}");

        let err = create_admin(None, "  ", "root", "Root", "password123")
            .unwrap_err()
            .to_string();
        assert!(err.contains("must be non-empty"), "{err}");
    }

    #[tokio::test]
    async fn server_boots_and_answers_health() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.db");
        let pool = new_file(path.to_str().unwrap(), &ConnectionConfig::default()).unwrap();
        let _ = run_migrations(&pool.get().unwrap()).unwrap();

        let settings = Settings {
            host: "127.0.0.1".into(),
            port: 0,
            database_path: path.to_string_lossy().into_owned(),
            ..Settings::default()
        };
        let server = Server::new(settings, pool);
        let (addr, handle) = server.listen().await.unwrap();

        let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "atelier-api");
        handle.abort();
    }
}
