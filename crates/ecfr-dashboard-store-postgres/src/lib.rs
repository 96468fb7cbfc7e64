// crates/ecfr-dashboard-store-postgres/src/lib.rs
// ============================================================================
// Module: Postgres Dashboard Store
// Description: DashboardStore backend over a hosted Postgres database.
// Purpose: Serve dashboard queries from a shared relational backend.
// Dependencies: ecfr-dashboard-core, postgres, r2d2, r2d2_postgres
// ============================================================================

//! ## Overview
//! [`PostgresDashboardStore`] keeps an r2d2 pool of read-only sessions
//! (`default_transaction_read_only=on`) with a per-statement timeout. Pool
//! and connection failures surface as
//! [`StoreError::Unavailable`](ecfr_dashboard_core::StoreError::Unavailable);
//! statement failures surface as query errors.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::PostgresDashboardStore;
pub use store::PostgresStoreConfig;
pub use store::PostgresStoreError;
