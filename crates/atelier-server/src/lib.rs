//! # atelier-server
//!
//! Axum HTTP layer for the Atelier collab-manager API:
//!
//! - **Settings**: layered figment config (defaults, JSON file, `ATELIER_*`
//!   environment variables) with production safety checks
//! - **Auth extraction**: bearer-token verification into a [`CurrentUser`],
//!   with role guards applied per handler
//! - **Handlers**: auth, admin, client, assigned-work, and meta routes, all
//!   returning a uniform `{"detail", "status_code"}` error envelope
//! - **Server**: router assembly, CORS, request tracing, and the listen loop
//!
//! Handlers stay thin: persistence rules live in `atelier-store`, and this
//! crate maps their outcomes onto status codes and response shapes.

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod guard;
pub mod handlers;
pub mod server;
pub mod state;

pub use auth::CurrentUser;
pub use config::{Environment, Settings, SettingsError};
pub use errors::{ApiError, ApiJson, ApiResult};
pub use server::Server;
pub use state::AppState;
