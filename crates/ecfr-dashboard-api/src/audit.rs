// crates/ecfr-dashboard-api/src/audit.rs
// ============================================================================
// Module: API Audit Logging
// Description: Structured audit events for dashboard API request handling.
// Purpose: Emit JSON-line request logs without a logging framework dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every API request produces one [`ApiAuditEvent`] and server startup emits a
//! [`ServerStartEvent`]. Events carry the internal error detail that is kept
//! out of client responses, so sinks must route them to operator-only
//! destinations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Dashboard HTTP endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// `GET /`
    Dashboard,
    /// `GET /api/agencies`
    Agencies,
    /// `GET /api/corrections`
    Corrections,
    /// `GET /api/errors`
    Errors,
    /// `GET /api/metrics`
    Metrics,
}

impl Endpoint {
    /// Route path served by the endpoint.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Dashboard => "/",
            Self::Agencies => "/api/agencies",
            Self::Corrections => "/api/corrections",
            Self::Errors => "/api/errors",
            Self::Metrics => "/api/metrics",
        }
    }

    /// Client-facing failure message for the endpoint.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Dashboard => "Failed to load dashboard",
            Self::Agencies => "Failed to fetch agencies",
            Self::Corrections => "Failed to fetch corrections",
            Self::Errors => "Failed to fetch errors",
            Self::Metrics => "Failed to fetch metrics",
        }
    }
}

/// Request outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiOutcome {
    /// Request succeeded.
    Ok,
    /// Request parameters were rejected.
    Rejected,
    /// Store access failed.
    Failed,
}

/// API request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ApiAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Endpoint that handled the request.
    pub endpoint: Endpoint,
    /// HTTP status code returned.
    pub status: u16,
    /// Request outcome.
    pub outcome: ApiOutcome,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Internal error detail; never sent to clients unless opted in.
    pub error_detail: Option<String>,
    /// Rows returned on success.
    pub rows: Option<u64>,
    /// Handler latency in milliseconds.
    pub latency_ms: u128,
}

/// Inputs required to construct an API audit event.
pub struct ApiAuditEventParams {
    /// Endpoint that handled the request.
    pub endpoint: Endpoint,
    /// HTTP status code returned.
    pub status: u16,
    /// Request outcome.
    pub outcome: ApiOutcome,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Internal error detail.
    pub error_detail: Option<String>,
    /// Rows returned on success.
    pub rows: Option<u64>,
    /// Handler latency in milliseconds.
    pub latency_ms: u128,
}

impl ApiAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ApiAuditEventParams) -> Self {
        Self {
            event: "api_request",
            timestamp_ms: now_ms(),
            endpoint: params.endpoint,
            status: params.status,
            outcome: params.outcome,
            error_kind: params.error_kind,
            error_detail: params.error_detail,
            rows: params.rows,
            latency_ms: params.latency_ms,
        }
    }
}

/// Server startup audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ServerStartEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Bound socket address.
    pub bind: String,
    /// Store backend label.
    pub store: &'static str,
    /// Whether the dashboard page is served.
    pub dashboard: bool,
}

impl ServerStartEvent {
    /// Creates a new startup event with a consistent timestamp.
    #[must_use]
    pub fn new(bind: String, store: &'static str, dashboard: bool) -> Self {
        Self {
            event: "server_start",
            timestamp_ms: now_ms(),
            bind,
            store,
            dashboard,
        }
    }
}

/// Milliseconds since the Unix epoch, zero if the clock is before it.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for API events.
pub trait ApiAuditSink: Send + Sync {
    /// Record a request event.
    fn record(&self, event: &ApiAuditEvent);

    /// Record a server startup event.
    fn record_start(&self, _event: &ServerStartEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct ApiStderrAuditSink;

impl ApiAuditSink for ApiStderrAuditSink {
    fn record(&self, event: &ApiAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_start(&self, event: &ServerStartEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct ApiFileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl ApiFileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized line.
    fn append(&self, payload: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl ApiAuditSink for ApiFileAuditSink {
    fn record(&self, event: &ApiAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            self.append(&payload);
        }
    }

    fn record_start(&self, event: &ServerStartEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            self.append(&payload);
        }
    }
}

/// No-op audit sink.
pub struct ApiNoopAuditSink;

impl ApiAuditSink for ApiNoopAuditSink {
    fn record(&self, _event: &ApiAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use std::fs;

    use super::*;

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = ApiFileAuditSink::new(&path).unwrap();
        sink.record_start(&ServerStartEvent::new("127.0.0.1:3000".to_string(), "sqlite", true));
        sink.record(&ApiAuditEvent::new(ApiAuditEventParams {
            endpoint: Endpoint::Errors,
            status: 400,
            outcome: ApiOutcome::Rejected,
            error_kind: Some("validation"),
            error_detail: Some("unsupported sort key: DROP TABLE".to_string()),
            rows: None,
            latency_ms: 1,
        }));
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> =
            content.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "server_start");
        assert_eq!(lines[1]["event"], "api_request");
        assert_eq!(lines[1]["endpoint"], "errors");
        assert_eq!(lines[1]["outcome"], "rejected");
    }

    #[test]
    fn endpoint_messages_name_the_resource() {
        assert_eq!(Endpoint::Agencies.failure_message(), "Failed to fetch agencies");
        assert_eq!(Endpoint::Metrics.path(), "/api/metrics");
    }
}
