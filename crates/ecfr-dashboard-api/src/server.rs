// crates/ecfr-dashboard-api/src/server.rs
// ============================================================================
// Module: Dashboard Server
// Description: axum router, shared state, and HTTP serving loop.
// Purpose: Expose dashboard queries as read-only JSON endpoints.
// Dependencies: ecfr-dashboard-core, ecfr-dashboard-config, axum, tokio
// ============================================================================

//! ## Overview
//! [`DashboardServer`] owns the bind address and the shared [`ServerState`].
//! The store handle is created once at startup and passed to handlers
//! through router state; it is released when the router is dropped. Store
//! calls are synchronous and run on Tokio's blocking pool.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use ecfr_dashboard_config::AuditConfig;
use ecfr_dashboard_config::DashboardConfig;
use ecfr_dashboard_config::StoreConfig;
use ecfr_dashboard_config::StoreType;
use ecfr_dashboard_core::SharedDashboardStore;
use ecfr_dashboard_core::StoreError;
use ecfr_dashboard_store_postgres::PostgresDashboardStore;
use ecfr_dashboard_store_sqlite::SqliteDashboardStore;
use serde::Serialize;
use tokio::net::TcpListener;

use crate::audit::ApiAuditEvent;
use crate::audit::ApiAuditEventParams;
use crate::audit::ApiAuditSink;
use crate::audit::ApiFileAuditSink;
use crate::audit::ApiNoopAuditSink;
use crate::audit::ApiOutcome;
use crate::audit::ApiStderrAuditSink;
use crate::audit::Endpoint;
use crate::audit::ServerStartEvent;
use crate::error::ApiError;
use crate::handlers;

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// Shared state for request handlers.
pub struct ServerState {
    /// Dashboard store handle.
    store: SharedDashboardStore,
    /// Audit sink for request events.
    audit: Arc<dyn ApiAuditSink>,
    /// Include store error detail in client bodies.
    expose_error_detail: bool,
    /// Serve the dashboard page.
    dashboard: bool,
}

impl ServerState {
    /// Creates state with the dashboard enabled and store detail hidden.
    #[must_use]
    pub fn new(store: SharedDashboardStore, audit: Arc<dyn ApiAuditSink>) -> Self {
        Self {
            store,
            audit,
            expose_error_detail: false,
            dashboard: true,
        }
    }

    /// Sets whether store error detail is returned to clients.
    #[must_use]
    pub fn with_error_detail(mut self, expose: bool) -> Self {
        self.expose_error_detail = expose;
        self
    }

    /// Sets whether the dashboard page is served.
    #[must_use]
    pub fn with_dashboard(mut self, enabled: bool) -> Self {
        self.dashboard = enabled;
        self
    }

    /// Runs a blocking store call off the async executor.
    pub(crate) async fn run_store<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&SharedDashboardStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || call(&store))
            .await
            .map_err(|err| StoreError::Query(format!("store task failed: {err}")))?;
        Ok(result?)
    }

    /// Audits a handler result and converts it into a response.
    pub(crate) fn respond<T: Serialize>(
        &self,
        endpoint: Endpoint,
        started: Instant,
        result: Result<(T, u64), ApiError>,
    ) -> Response {
        let latency_ms = started.elapsed().as_millis();
        match result {
            Ok((body, rows)) => {
                self.audit.record(&ApiAuditEvent::new(ApiAuditEventParams {
                    endpoint,
                    status: StatusCode::OK.as_u16(),
                    outcome: ApiOutcome::Ok,
                    error_kind: None,
                    error_detail: None,
                    rows: Some(rows),
                    latency_ms,
                }));
                (StatusCode::OK, Json(body)).into_response()
            }
            Err(error) => {
                let status = error.status();
                let outcome =
                    if error.is_client_error() { ApiOutcome::Rejected } else { ApiOutcome::Failed };
                self.audit.record(&ApiAuditEvent::new(ApiAuditEventParams {
                    endpoint,
                    status: status.as_u16(),
                    outcome,
                    error_kind: Some(error.kind()),
                    error_detail: Some(error.to_string()),
                    rows: None,
                    latency_ms,
                }));
                let body = error.body(endpoint.failure_message(), self.expose_error_detail);
                (status, Json(body)).into_response()
            }
        }
    }

    /// Audits a static page response.
    pub(crate) fn record_page(&self, endpoint: Endpoint, started: Instant) {
        self.audit.record(&ApiAuditEvent::new(ApiAuditEventParams {
            endpoint,
            status: StatusCode::OK.as_u16(),
            outcome: ApiOutcome::Ok,
            error_kind: None,
            error_detail: None,
            rows: None,
            latency_ms: started.elapsed().as_millis(),
        }));
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the dashboard router over shared state.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let mut router = Router::new()
        .route(Endpoint::Agencies.path(), get(handlers::list_agencies))
        .route(Endpoint::Corrections.path(), get(handlers::list_corrections))
        .route(Endpoint::Errors.path(), get(handlers::list_errors))
        .route(Endpoint::Metrics.path(), get(handlers::metrics));
    if state.dashboard {
        router = router.route(Endpoint::Dashboard.path(), get(handlers::dashboard));
    }
    router.with_state(state)
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Dashboard HTTP server.
pub struct DashboardServer {
    /// Socket address to bind.
    bind: SocketAddr,
    /// Store backend label for the startup event.
    store_label: &'static str,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl DashboardServer {
    /// Builds a server from validated configuration.
    ///
    /// Opening the store may block (the Postgres pool connects eagerly), so
    /// async callers should run this on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or the store or
    /// audit sink cannot be opened.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let bind = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let store = build_dashboard_store(&config.store)?;
        let audit = build_audit_sink(&config.server.audit)?;
        let state = ServerState::new(store, audit)
            .with_error_detail(config.server.expose_error_detail)
            .with_dashboard(config.server.dashboard);
        Ok(Self::new(bind, store_label(config.store.store_type), state))
    }

    /// Creates a server from prepared state.
    #[must_use]
    pub fn new(bind: SocketAddr, store_label: &'static str, state: ServerState) -> Self {
        Self {
            bind,
            store_label,
            state: Arc::new(state),
        }
    }

    /// Returns the configured bind address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Binds the configured address and serves until the server fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_listener(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when serving fails.
    pub async fn serve_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        let local = listener
            .local_addr()
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.state.audit.record_start(&ServerStartEvent::new(
            local.to_string(),
            self.store_label,
            self.state.dashboard,
        ));
        let app = build_router(self.state);
        axum::serve(listener, app.into_make_service())
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

/// Opens the configured store backend.
///
/// # Errors
///
/// Returns [`ServerError`] when the store cannot be opened.
pub fn build_dashboard_store(config: &StoreConfig) -> Result<SharedDashboardStore, ServerError> {
    match config.store_type {
        StoreType::Sqlite => {
            let store = SqliteDashboardStore::open(&config.sqlite_config())
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Ok(SharedDashboardStore::from_store(store))
        }
        StoreType::Postgres => {
            let postgres =
                config.postgres_config().map_err(|err| ServerError::Config(err.to_string()))?;
            let store = PostgresDashboardStore::connect(&postgres)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Ok(SharedDashboardStore::from_store(store))
        }
    }
}

/// Builds the audit sink selected by configuration.
fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn ApiAuditSink>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(ApiNoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = ApiFileAuditSink::new(Path::new(path.trim()))
                .map_err(|err| ServerError::Init(format!("audit log open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(ApiStderrAuditSink)),
    }
}

/// Label used in the startup event.
const fn store_label(store_type: StoreType) -> &'static str {
    match store_type {
        StoreType::Sqlite => "sqlite",
        StoreType::Postgres => "postgres",
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Dashboard server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
