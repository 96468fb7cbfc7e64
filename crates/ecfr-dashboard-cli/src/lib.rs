// crates/ecfr-dashboard-cli/src/lib.rs
// ============================================================================
// Module: eCFR Dashboard CLI Library
// Description: Shared helpers for the ecfr-dashboard command-line interface.
// Purpose: Keep file-driven workflows testable outside the binary.
// Dependencies: ecfr-dashboard-core, ecfr-dashboard-store-sqlite
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) parses arguments and dispatches;
//! the ingest workflow lives here so integration tests can drive it against
//! temporary directories.
//!
//! Security posture: export files are untrusted and read under size limits.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod ingest;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ingest::IngestError;
pub use ingest::IngestSources;
pub use ingest::IngestSummary;
pub use ingest::PreparedIngest;
pub use ingest::prepare_ingest;
pub use ingest::run_ingest;
pub use ingest::structure_file_name;
