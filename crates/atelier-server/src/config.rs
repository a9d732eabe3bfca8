//! Server settings.
//!
//! Settings resolve through three figment layers, lowest precedence first:
//! compiled defaults, an optional JSON file (`atelier.json` in the working
//! directory, or an explicit path from the CLI), and environment variables
//! prefixed `ATELIER_`. [`Settings::validate`] runs after extraction and
//! refuses configurations that would be unsafe to serve.

use std::fmt;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Signing key compiled into the defaults. Fine for local development;
/// [`Settings::validate`] refuses it in production.
const DEV_SECRET_KEY: &str = "dev-secret-change-in-production";

/// Origins allowed by default in development: the usual local dev servers.
const DEV_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:8080",
    "http://127.0.0.1:8080",
];

/// Deployment environment.
///
/// Development relaxes CORS to the local dev-server origins and mounts the
/// `/debug` routes; production requires explicit origins and never exposes
/// them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development.
    Development,
    /// Deployed service.
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// Runtime settings for the API server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    /// Deployment environment (default `development`).
    pub environment: Environment,
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `8000`).
    pub port: u16,
    /// Path to the `SQLite` database file (default `"atelier.db"`).
    pub database_path: String,
    /// HS256 signing key for access tokens.
    pub secret_key: String,
    /// Access token lifetime in minutes (default `30`).
    pub token_ttl_minutes: i64,
    /// Comma-separated CORS origins. Unset in development falls back to
    /// the local dev-server list; unset in production allows none.
    pub allowed_origins: Option<String>,
    /// Connection pool size (default `8`).
    pub pool_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: "127.0.0.1".into(),
            port: 8000,
            database_path: "atelier.db".into(),
            secret_key: DEV_SECRET_KEY.into(),
            token_ttl_minutes: 30,
            allowed_origins: None,
            pool_size: 8,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional JSON file, and
    /// `ATELIER_*` environment variables, then validate.
    ///
    /// Without an explicit path the file layer reads `atelier.json` from
    /// the working directory and is skipped when absent; an explicit path
    /// that does not exist is an error.
    pub fn load(config_path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = match config_path {
            Some(path) => Json::file_exact(path),
            None => Json::file("atelier.json"),
        };
        let settings: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(file)
            .merge(Env::prefixed("ATELIER_"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject configurations that must not reach `serve`.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.environment == Environment::Production && self.secret_key == DEV_SECRET_KEY {
            return Err(SettingsError::Invalid(
                "secret_key is still the compiled development default; set ATELIER_SECRET_KEY"
                    .into(),
            ));
        }
        if self.secret_key.is_empty() {
            return Err(SettingsError::Invalid("secret_key must not be empty".into()));
        }
        if self.token_ttl_minutes <= 0 {
            return Err(SettingsError::Invalid(
                "token_ttl_minutes must be positive".into(),
            ));
        }
        if self.pool_size == 0 {
            return Err(SettingsError::Invalid("pool_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Whether the environment is development.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// CORS origins to allow.
    ///
    /// Configured origins win; otherwise development falls back to the
    /// local dev-server list and production allows none.
    #[must_use]
    pub fn cors_origins(&self) -> Vec<String> {
        match &self.allowed_origins {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_owned)
                .collect(),
            None if self.is_development() => {
                DEV_CORS_ORIGINS.iter().map(|s| (*s).to_owned()).collect()
            }
            None => Vec::new(),
        }
    }

    /// The settings as a JSON object with the secret omitted.
    ///
    /// Built field by field rather than serialized and scrubbed, so the
    /// signing key cannot reach a debug response.
    #[must_use]
    pub fn sanitized(&self) -> serde_json::Value {
        serde_json::json!({
            "environment": self.environment,
            "host": self.host,
            "port": self.port,
            "database_path": self.database_path,
            "token_ttl_minutes": self.token_ttl_minutes,
            "allowed_origins": self.allowed_origins,
            "pool_size": self.pool_size,
        })
    }
}

/// Errors produced while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A figment layer failed to read, parse, or merge.
    #[error("configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// Settings parsed but fail a semantic check.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
