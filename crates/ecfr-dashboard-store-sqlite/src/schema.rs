// crates/ecfr-dashboard-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite Dashboard Schema
// Description: Table definitions shared by the reader and the writer.
// Purpose: Keep the dashboard tables in one place.
// Dependencies: none
// ============================================================================

//! Table layout compatible with databases produced by the eCFR analysis
//! tooling. JSON-bearing columns are plain `TEXT`.

/// Tables the reader requires.
pub const REQUIRED_TABLES: [&str; 3] = ["agencies", "agency_corrections", "cfr_reference_errors"];

/// DDL creating every dashboard table when missing.
pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS agencies (
    name TEXT PRIMARY KEY,
    short_name TEXT,
    slug TEXT,
    cfr_references TEXT,
    sub_agencies INTEGER,
    word_count INTEGER
);
CREATE TABLE IF NOT EXISTS agency_corrections (
    correction_id INTEGER PRIMARY KEY,
    agency_name TEXT NOT NULL,
    title INTEGER,
    corrective_action TEXT,
    error_corrected TEXT,
    error_occurred TEXT,
    fr_citation TEXT,
    last_modified TEXT
);
CREATE INDEX IF NOT EXISTS idx_agency_corrections_agency
    ON agency_corrections (agency_name);
CREATE TABLE IF NOT EXISTS cfr_reference_errors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agency_name TEXT,
    cfr_reference TEXT,
    error_message TEXT,
    timestamp TEXT
);
";
