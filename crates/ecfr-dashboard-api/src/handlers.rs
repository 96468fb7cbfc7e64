// crates/ecfr-dashboard-api/src/handlers.rs
// ============================================================================
// Module: API Handlers
// Description: Request handlers for the dashboard endpoints.
// Purpose: Parse and validate query strings, delegate to the store, serialize.
// Dependencies: ecfr-dashboard-core, axum, serde, tokio
// ============================================================================

//! ## Overview
//! Each handler follows the same path: decode the raw query string, validate
//! it into a typed query, run the store call on the blocking pool, then
//! serialize the response. Every request is audited through
//! [`ServerState::respond`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Query;
use axum::extract::State;
use axum::extract::rejection::QueryRejection;
use axum::response::Html;
use axum::response::Response;
use ecfr_dashboard_core::Agency;
use ecfr_dashboard_core::AgencyParams;
use ecfr_dashboard_core::AgencyQuery;
use ecfr_dashboard_core::CfrReferenceError;
use ecfr_dashboard_core::Correction;
use ecfr_dashboard_core::CorrectionParams;
use ecfr_dashboard_core::CorrectionQuery;
use ecfr_dashboard_core::DashboardStore;
use ecfr_dashboard_core::ErrorPagination;
use ecfr_dashboard_core::MetricsReport;
use ecfr_dashboard_core::ReferenceErrorParams;
use ecfr_dashboard_core::ReferenceErrorQuery;
use serde::Serialize;

use crate::audit::Endpoint;
use crate::error::ApiError;
use crate::server::ServerState;

/// Embedded dashboard page.
const DASHBOARD_HTML: &str = include_str!("../assets/dashboard.html");

// ============================================================================
// SECTION: Response Bodies
// ============================================================================

/// Response body of `GET /api/agencies`.
#[derive(Debug, Serialize)]
pub struct AgenciesResponse {
    /// Agencies on this page.
    pub agencies: Vec<Agency>,
    /// Total matching agencies.
    pub total: u64,
    /// Applied page size.
    pub limit: u32,
    /// Applied offset.
    pub offset: u64,
}

/// Response body of `GET /api/corrections`.
#[derive(Debug, Serialize)]
pub struct CorrectionsResponse {
    /// Corrections on this page.
    pub corrections: Vec<Correction>,
    /// Total matching corrections.
    pub total: u64,
    /// Applied page size.
    pub limit: u32,
    /// Applied offset.
    pub offset: u64,
}

/// Response body of `GET /api/errors`.
#[derive(Debug, Serialize)]
pub struct ErrorsResponse {
    /// Reference errors on this page.
    pub data: Vec<CfrReferenceError>,
    /// Page metadata.
    pub pagination: ErrorPagination,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Serves the embedded dashboard page.
pub(crate) async fn dashboard(State(state): State<Arc<ServerState>>) -> Html<&'static str> {
    state.record_page(Endpoint::Dashboard, Instant::now());
    Html(DASHBOARD_HTML)
}

/// Handles `GET /api/agencies`.
pub(crate) async fn list_agencies(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<AgencyParams>, QueryRejection>,
) -> Response {
    let started = Instant::now();
    let result = fetch_agencies(&state, params).await;
    state.respond(Endpoint::Agencies, started, result)
}

/// Handles `GET /api/corrections`.
pub(crate) async fn list_corrections(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<CorrectionParams>, QueryRejection>,
) -> Response {
    let started = Instant::now();
    let result = fetch_corrections(&state, params).await;
    state.respond(Endpoint::Corrections, started, result)
}

/// Handles `GET /api/errors`.
pub(crate) async fn list_errors(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<ReferenceErrorParams>, QueryRejection>,
) -> Response {
    let started = Instant::now();
    let result = fetch_errors(&state, params).await;
    state.respond(Endpoint::Errors, started, result)
}

/// Handles `GET /api/metrics`.
pub(crate) async fn metrics(State(state): State<Arc<ServerState>>) -> Response {
    let started = Instant::now();
    let result = fetch_metrics(&state).await;
    state.respond(Endpoint::Metrics, started, result)
}

// ============================================================================
// SECTION: Fetches
// ============================================================================

/// Successful payload with the number of rows it carries.
type Fetched<T> = Result<(T, u64), ApiError>;

/// Unwraps the query extractor result.
fn decode<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params.map(|Query(params)| params).map_err(|err| ApiError::MalformedQuery(err.body_text()))
}

/// Row count for audit events.
fn row_count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// Validates and runs an agency listing.
async fn fetch_agencies(
    state: &ServerState,
    params: Result<Query<AgencyParams>, QueryRejection>,
) -> Fetched<AgenciesResponse> {
    let query = AgencyQuery::from_params(&decode(params)?)?;
    let window = query.window;
    let page = state.run_store(move |store| store.list_agencies(&query)).await?;
    let rows = row_count(page.items.len());
    Ok((
        AgenciesResponse {
            agencies: page.items,
            total: page.total,
            limit: window.limit,
            offset: window.offset,
        },
        rows,
    ))
}

/// Validates and runs a correction listing.
async fn fetch_corrections(
    state: &ServerState,
    params: Result<Query<CorrectionParams>, QueryRejection>,
) -> Fetched<CorrectionsResponse> {
    let query = CorrectionQuery::from_params(&decode(params)?)?;
    let window = query.window;
    let page = state.run_store(move |store| store.list_corrections(&query)).await?;
    let rows = row_count(page.items.len());
    Ok((
        CorrectionsResponse {
            corrections: page.items,
            total: page.total,
            limit: window.limit,
            offset: window.offset,
        },
        rows,
    ))
}

/// Validates and runs a reference error listing.
async fn fetch_errors(
    state: &ServerState,
    params: Result<Query<ReferenceErrorParams>, QueryRejection>,
) -> Fetched<ErrorsResponse> {
    let query = ReferenceErrorQuery::from_params(&decode(params)?)?;
    let (page_number, limit) = (query.page, query.limit);
    let page = state.run_store(move |store| store.list_reference_errors(&query)).await?;
    let rows = row_count(page.items.len());
    Ok((
        ErrorsResponse {
            pagination: ErrorPagination::new(page_number, limit, page.total),
            data: page.items,
        },
        rows,
    ))
}

/// Computes the metrics report.
async fn fetch_metrics(state: &ServerState) -> Fetched<MetricsReport> {
    let report = state.run_store(|store| store.metrics_report()).await?;
    let rows = report.word_count_stats.agency_count;
    Ok((report, rows))
}
