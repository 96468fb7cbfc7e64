// crates/ecfr-dashboard-cli/src/ingest.rs
// ============================================================================
// Module: Ingest Command
// Description: Loads local eCFR exports and writes them into SQLite.
// Purpose: Populate the dashboard database from downloaded JSON files.
// Dependencies: ecfr-dashboard-core, ecfr-dashboard-store-sqlite, serde_json
// ============================================================================

//! ## Overview
//! Inputs are an agency directory export, a title catalog export, and a
//! directory holding one `title-<n>.json` structure export per title. A
//! missing structure file is not fatal: references into that title are
//! recorded as diagnostics. All files are read with a hard size limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use ecfr_dashboard_core::ingest::AgencyDirectory;
use ecfr_dashboard_core::ingest::IngestReport;
use ecfr_dashboard_core::ingest::StructureNode;
use ecfr_dashboard_core::ingest::TitleCatalog;
use ecfr_dashboard_core::ingest::TitleIndex;
use ecfr_dashboard_core::ingest::ingest_agencies;
use ecfr_dashboard_store_sqlite::IngestCounts;
use ecfr_dashboard_store_sqlite::SqliteDashboardWriter;
use ecfr_dashboard_store_sqlite::SqliteStoreConfig;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of the agency and title catalog exports.
pub const MAX_CATALOG_BYTES: usize = 16 * 1024 * 1024;
/// Maximum size of one title structure export.
pub const MAX_STRUCTURE_BYTES: usize = 256 * 1024 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Locations of the export files.
#[derive(Debug, Clone)]
pub struct IngestSources {
    /// Agency directory export.
    pub agencies: PathBuf,
    /// Title catalog export.
    pub titles: PathBuf,
    /// Directory holding `title-<n>.json` structure exports.
    pub structures: PathBuf,
}

/// Ingest report plus structure coverage, before it is written.
#[derive(Debug, Clone)]
pub struct PreparedIngest {
    /// Computed agencies and diagnostics.
    pub report: IngestReport,
    /// Titles with a structure export.
    pub titles_indexed: usize,
    /// Titles listed in the catalog without a structure export.
    pub titles_missing: usize,
}

/// Outcome of an ingest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    /// Titles with a structure export.
    pub titles_indexed: usize,
    /// Titles listed in the catalog without a structure export.
    pub titles_missing: usize,
    /// Rows written.
    pub written: IngestCounts,
}

/// Ingest failures.
#[derive(Debug, Error)]
pub enum IngestError {
    /// File could not be read.
    #[error("failed to read {path}: {message}")]
    Read {
        /// Offending path.
        path: String,
        /// I/O error text.
        message: String,
    },
    /// File exceeds its size limit.
    #[error("{path} is {size} bytes; limit is {limit}")]
    TooLarge {
        /// Offending path.
        path: String,
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
    /// File is not valid JSON for its export type.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Offending path.
        path: String,
        /// Decoder error text.
        message: String,
    },
    /// Database write failed.
    #[error("failed to write database: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// File name of the structure export for `title`.
#[must_use]
pub fn structure_file_name(title: u32) -> String {
    format!("title-{title}.json")
}

/// Reads the exports and computes the ingest report without writing it.
///
/// # Errors
///
/// Returns [`IngestError`] when an export cannot be read or parsed.
pub fn prepare_ingest(sources: &IngestSources, today: &str) -> Result<PreparedIngest, IngestError> {
    let directory: AgencyDirectory = read_json(&sources.agencies, MAX_CATALOG_BYTES)?;
    let catalog: TitleCatalog = read_json(&sources.titles, MAX_CATALOG_BYTES)?;
    let mut structures = BTreeMap::new();
    let mut titles_missing = 0_usize;
    for title in &catalog.titles {
        let path = sources.structures.join(structure_file_name(title.number));
        if !path.is_file() {
            titles_missing += 1;
            continue;
        }
        let root: StructureNode = read_json(&path, MAX_STRUCTURE_BYTES)?;
        structures.insert(title.number, TitleIndex::build(&root));
    }
    Ok(PreparedIngest {
        report: ingest_agencies(&directory, &catalog, &structures, today),
        titles_indexed: structures.len(),
        titles_missing,
    })
}

/// Runs a full ingest into the `SQLite` database described by `database`.
///
/// # Errors
///
/// Returns [`IngestError`] when an export cannot be loaded or the database
/// write fails.
pub fn run_ingest(
    sources: &IngestSources,
    database: &SqliteStoreConfig,
    today: &str,
) -> Result<IngestSummary, IngestError> {
    let prepared = prepare_ingest(sources, today)?;
    let mut writer =
        SqliteDashboardWriter::open(database).map_err(|err| IngestError::Store(err.to_string()))?;
    let written = writer
        .write_ingest_report(&prepared.report)
        .map_err(|err| IngestError::Store(err.to_string()))?;
    Ok(IngestSummary {
        titles_indexed: prepared.titles_indexed,
        titles_missing: prepared.titles_missing,
        written,
    })
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

/// Reads and decodes a JSON file under a size limit.
fn read_json<T: DeserializeOwned>(path: &Path, max_bytes: usize) -> Result<T, IngestError> {
    let bytes = read_bytes_with_limit(path, max_bytes)?;
    serde_json::from_slice(&bytes).map_err(|err| IngestError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Reads a file from disk while enforcing a hard size limit.
pub(crate) fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, IngestError> {
    let read_error = |err: std::io::Error| IngestError::Read {
        path: path.display().to_string(),
        message: err.to_string(),
    };
    let too_large = |size: u64| IngestError::TooLarge {
        path: path.display().to_string(),
        size,
        limit: max_bytes,
    };
    let file = File::open(path).map_err(read_error)?;
    let size = file.metadata().map_err(read_error)?.len();
    let limit = u64::try_from(max_bytes).map_err(|_| too_large(size))?;
    if size > limit {
        return Err(too_large(size));
    }
    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(read_error)?;
    if bytes.len() > max_bytes {
        return Err(too_large(u64::try_from(bytes.len()).unwrap_or(u64::MAX)));
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
