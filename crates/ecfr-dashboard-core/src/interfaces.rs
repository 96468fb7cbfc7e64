// crates/ecfr-dashboard-core/src/interfaces.rs
// ============================================================================
// Module: Dashboard Store Interfaces
// Description: Backend-agnostic read interface for dashboard data.
// Purpose: Let HTTP handlers query agencies, corrections, and errors without
//          knowing whether SQLite or Postgres sits behind them.
// Dependencies: thiserror, crate::{model, query, metrics}
// ============================================================================

//! ## Overview
//! [`DashboardStore`] is the single seam between the HTTP layer and storage.
//! Implementations are synchronous; async callers are expected to run them on
//! a blocking thread. [`SharedDashboardStore`] wraps any implementation in an
//! `Arc` so one handle can be created at startup and cloned into router state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::metrics::MetricsReport;
use crate::metrics::RECENT_CORRECTIONS_LIMIT;
use crate::model::Agency;
use crate::model::AgencyMetricRow;
use crate::model::CfrReferenceError;
use crate::model::Correction;
use crate::query::AgencyQuery;
use crate::query::CorrectionQuery;
use crate::query::Page;
use crate::query::ReferenceErrorQuery;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Dashboard store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend could not be reached (connection, pool, or lock failure).
    #[error("dashboard store unavailable: {0}")]
    Unavailable(String),
    /// Backend rejected or failed a query.
    #[error("dashboard store query failed: {0}")]
    Query(String),
    /// Stored data could not be decoded.
    #[error("dashboard store invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Store Trait
// ============================================================================

/// Read-only access to dashboard data.
pub trait DashboardStore {
    /// Lists agencies matching the query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn list_agencies(&self, query: &AgencyQuery) -> Result<Page<Agency>, StoreError>;

    /// Lists corrections matching the query, most recently corrected first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn list_corrections(&self, query: &CorrectionQuery) -> Result<Page<Correction>, StoreError>;

    /// Lists reference errors matching the query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn list_reference_errors(
        &self,
        query: &ReferenceErrorQuery,
    ) -> Result<Page<CfrReferenceError>, StoreError>;

    /// Returns one metric row per agency, with zero corrections when none exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn agency_metric_rows(&self) -> Result<Vec<AgencyMetricRow>, StoreError>;

    /// Returns the `limit` most recently corrected entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn recent_corrections(&self, limit: u32) -> Result<Vec<Correction>, StoreError>;

    /// Computes the metrics report from two fetches.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when either fetch fails.
    fn metrics_report(&self) -> Result<MetricsReport, StoreError> {
        let rows = self.agency_metric_rows()?;
        let recent = self.recent_corrections(RECENT_CORRECTIONS_LIMIT)?;
        Ok(MetricsReport::from_rows(&rows, recent))
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared dashboard store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedDashboardStore {
    /// Inner store implementation.
    inner: Arc<dyn DashboardStore + Send + Sync>,
}

impl SharedDashboardStore {
    /// Wraps a dashboard store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl DashboardStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn DashboardStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl DashboardStore for SharedDashboardStore {
    fn list_agencies(&self, query: &AgencyQuery) -> Result<Page<Agency>, StoreError> {
        self.inner.list_agencies(query)
    }

    fn list_corrections(&self, query: &CorrectionQuery) -> Result<Page<Correction>, StoreError> {
        self.inner.list_corrections(query)
    }

    fn list_reference_errors(
        &self,
        query: &ReferenceErrorQuery,
    ) -> Result<Page<CfrReferenceError>, StoreError> {
        self.inner.list_reference_errors(query)
    }

    fn agency_metric_rows(&self) -> Result<Vec<AgencyMetricRow>, StoreError> {
        self.inner.agency_metric_rows()
    }

    fn recent_corrections(&self, limit: u32) -> Result<Vec<Correction>, StoreError> {
        self.inner.recent_corrections(limit)
    }

    fn metrics_report(&self) -> Result<MetricsReport, StoreError> {
        self.inner.metrics_report()
    }
}
