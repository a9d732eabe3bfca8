//! `Server`: router assembly, CORS policy, and the listen loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, patch, post};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use atelier_store::ConnectionPool;

use crate::config::Settings;
use crate::handlers::{admin, auth, client, meta, tasks};
use crate::state::AppState;

/// The Atelier API server.
///
/// Owns the resolved settings and the connection pool; [`Server::router`]
/// assembles the route table and [`Server::listen`] binds and serves it in
/// a background task.
pub struct Server {
    settings: Arc<Settings>,
    pool: ConnectionPool,
}

impl Server {
    /// Create a new server over an already-migrated pool.
    pub fn new(settings: Settings, pool: ConnectionPool) -> Self {
        Self {
            settings: Arc::new(settings),
            pool,
        }
    }

    /// Build the Axum router with all routes.
    ///
    /// The `/debug` routes are only mounted in development.
    pub fn router(&self) -> Router {
        let state = AppState::new(self.pool.clone(), Arc::clone(&self.settings));

        let mut router = Router::new()
            .route("/", get(meta::root))
            .route("/health", get(meta::health))
            .route("/health/db", get(meta::health_db))
            .route("/auth/login", post(auth::login))
            .route("/auth/logout", post(auth::logout))
            .route("/auth/me", get(auth::me))
            .route("/auth/register", post(auth::register))
            .route("/admin/users", get(admin::list_users))
            .route("/admin/users/staff", get(admin::list_staff))
            .route("/admin/users/clients", get(admin::list_clients))
            .route(
                "/admin/projects",
                get(admin::list_projects).post(admin::create_project),
            )
            .route("/admin/projects/{project_id}", get(admin::get_project))
            .route("/admin/dashboard", get(admin::dashboard))
            .route("/admin/tasks", post(admin::create_task))
            .route(
                "/admin/tickets/{ticket_id}/tasks",
                post(admin::create_tasks_bulk),
            )
            .route(
                "/admin/tickets/{ticket_id}/status",
                patch(admin::update_ticket_status),
            )
            .route("/client/projects", get(client::list_projects))
            .route("/client/projects/{project_id}", get(client::get_project))
            .route(
                "/client/projects/{project_id}/tickets",
                post(client::create_ticket),
            )
            .route(
                "/client/projects/{project_id}/tickets/{ticket_id}/tasks",
                get(client::list_ticket_tasks),
            )
            .route("/client/tickets", get(client::list_tickets))
            .route("/client/tickets/{ticket_id}", get(client::get_ticket))
            .route("/client/active-timers", get(client::active_timers))
            .route("/tasks/my", get(tasks::my_tasks))
            .route("/tasks/my/active", get(tasks::my_active_tasks))
            .route("/tasks/my/time-summary", get(tasks::my_time_summary))
            .route("/tasks/{task_id}/status", patch(tasks::update_status))
            .route("/tasks/{task_id}/timer/start", post(tasks::start_timer))
            .route("/tasks/{task_id}/timer/stop", post(tasks::stop_timer))
            .route("/tasks/{task_id}/time-logs", get(tasks::time_logs));

        if self.settings.is_development() {
            router = router
                .route("/debug/config", get(meta::debug_config))
                .route("/debug/db", get(meta::debug_db));
        }

        router
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(self.cors_layer())
    }

    /// Bind and serve in a background task.
    ///
    /// Returns the bound address (useful with port 0) and the serve task's
    /// join handle.
    pub async fn listen(&self) -> io::Result<(SocketAddr, JoinHandle<()>)> {
        let addr = format!("{}:{}", self.settings.host, self.settings.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        let router = self.router();

        tracing::info!(
            addr = %local_addr,
            environment = %self.settings.environment,
            "atelier API listening"
        );

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                tracing::error!(error = %err, "server task exited");
            }
        });
        Ok((local_addr, handle))
    }

    /// Get the effective settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Credentialed CORS requires explicit origins, so wildcard matching is
    /// off the table; unparsable configured origins are skipped with a
    /// warning rather than refused at startup.
    fn cors_layer(&self) -> CorsLayer {
        let mut origins = Vec::new();
        for origin in self.settings.cors_origins() {
            if origin == "*" {
                tracing::warn!("wildcard CORS origin is incompatible with credentials, skipping");
                continue;
            }
            match origin.parse::<HeaderValue>() {
                Ok(value) => origins.push(value),
                Err(_) => tracing::warn!(%origin, "ignoring malformed CORS origin"),
            }
        }

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
