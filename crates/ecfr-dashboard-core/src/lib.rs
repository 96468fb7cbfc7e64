// crates/ecfr-dashboard-core/src/lib.rs
// ============================================================================
// Module: eCFR Dashboard Core Library
// Description: Public API surface for the eCFR dashboard core.
// Purpose: Expose domain types, query validation, metrics, and store interfaces.
// Dependencies: crate::{model, query, metrics, interfaces, memory, ingest}
// ============================================================================

//! ## Overview
//! The dashboard core owns everything that is independent of a particular
//! database backend: the agency/correction/reference-error model, validation
//! of inbound query parameters, decile-based metric aggregation, and the
//! [`DashboardStore`] interface that the `SQLite` and Postgres backends
//! implement. It also carries the offline ingestion logic that resolves CFR
//! references against title structures into agency word counts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod ingest;
pub mod interfaces;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod query;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use interfaces::DashboardStore;
pub use interfaces::SharedDashboardStore;
pub use interfaces::StoreError;
pub use memory::InMemoryDashboardStore;
pub use metrics::AgencyWordCount;
pub use metrics::CorrectionMetric;
pub use metrics::CorrectionRate;
pub use metrics::MetricsReport;
pub use metrics::SubAgencyRatio;
pub use metrics::WordCountStats;
pub use model::Agency;
pub use model::AgencyMetricRow;
pub use model::CfrReference;
pub use model::CfrReferenceError;
pub use model::Correction;
pub use model::StructuredField;
pub use query::AgencyParams;
pub use query::AgencyQuery;
pub use query::AgencySort;
pub use query::CorrectionParams;
pub use query::CorrectionQuery;
pub use query::ErrorPagination;
pub use query::ErrorSortKey;
pub use query::Page;
pub use query::PageWindow;
pub use query::QueryError;
pub use query::ReferenceErrorParams;
pub use query::ReferenceErrorQuery;
pub use query::SortDirection;
