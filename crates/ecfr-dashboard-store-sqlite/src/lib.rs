// crates/ecfr-dashboard-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Dashboard Store
// Description: DashboardStore backend over a local SQLite database file.
// Purpose: Serve dashboard queries from the file produced by ingestion.
// Dependencies: ecfr-dashboard-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a read-only `SQLite` implementation of
//! [`ecfr_dashboard_core::DashboardStore`] and a small writer used by the
//! ingestion command and test fixtures. The reader opens the database with
//! read-only flags and `PRAGMA query_only`, so the serving path cannot modify
//! data. Security posture: stored rows are untrusted; malformed JSON columns fall back to raw text.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod schema;
pub mod store;
pub mod writer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteDashboardStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use writer::IngestCounts;
pub use writer::SqliteDashboardWriter;
