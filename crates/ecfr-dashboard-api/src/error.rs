// crates/ecfr-dashboard-api/src/error.rs
// ============================================================================
// Module: API Errors
// Description: Request failures and their HTTP status mapping.
// Purpose: Keep client bodies short while preserving detail for audit logs.
// Dependencies: ecfr-dashboard-core, axum, serde, thiserror
// ============================================================================

//! ## Overview
//! Validation failures map to `400`, unreachable stores to `502`, and every
//! other store failure to `500`. Validation detail echoes client input and is
//! always returned; store detail is returned only when the server opts in.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::http::StatusCode;
use ecfr_dashboard_core::QueryError;
use ecfr_dashboard_core::StoreError;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// API request failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Query parameters were malformed or outside the allow-list.
    #[error(transparent)]
    Validation(#[from] QueryError),
    /// The query string could not be decoded.
    #[error("malformed query string: {0}")]
    MalformedQuery(String),
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// HTTP status code for the failure.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MalformedQuery(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
            Self::Store(StoreError::Query(_) | StoreError::Invalid(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Normalized error kind label for audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::MalformedQuery(_) => "validation",
            Self::Store(StoreError::Unavailable(_)) => "store_unavailable",
            Self::Store(StoreError::Query(_)) => "store_query",
            Self::Store(StoreError::Invalid(_)) => "store_invalid_data",
        }
    }

    /// Returns true when the failure was caused by client input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::MalformedQuery(_))
    }

    /// Builds the client-facing body.
    #[must_use]
    pub fn body(&self, message: &'static str, expose_store_detail: bool) -> ErrorBody {
        let detail = if self.is_client_error() || expose_store_detail {
            Some(self.to_string())
        } else {
            None
        };
        ErrorBody {
            error: message.to_string(),
            detail,
        }
    }
}

/// JSON error body returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Short per-endpoint failure message.
    pub error: String,
    /// Optional diagnostic detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
