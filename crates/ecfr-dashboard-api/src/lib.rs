// crates/ecfr-dashboard-api/src/lib.rs
// ============================================================================
// Module: eCFR Dashboard API
// Description: HTTP endpoints and embedded dashboard for eCFR metrics.
// Purpose: Serve read-only agency, correction, error, and metrics queries.
// Dependencies: ecfr-dashboard-core, ecfr-dashboard-config, axum, tokio
// ============================================================================

//! ## Overview
//! Four JSON endpoints (`/api/agencies`, `/api/corrections`, `/api/errors`,
//! `/api/metrics`) and an optional dashboard page at `/`. All endpoints are
//! read-only. Query strings are untrusted: they are validated against
//! allow-lists and clamped before reaching the store.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod error;
mod handlers;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::ApiAuditEvent;
pub use audit::ApiAuditSink;
pub use audit::ApiFileAuditSink;
pub use audit::ApiNoopAuditSink;
pub use audit::ApiOutcome;
pub use audit::ApiStderrAuditSink;
pub use audit::Endpoint;
pub use audit::ServerStartEvent;
pub use error::ApiError;
pub use error::ErrorBody;
pub use handlers::AgenciesResponse;
pub use handlers::CorrectionsResponse;
pub use handlers::ErrorsResponse;
pub use server::DashboardServer;
pub use server::ServerError;
pub use server::ServerState;
pub use server::build_dashboard_store;
pub use server::build_router;
