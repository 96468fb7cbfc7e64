// crates/ecfr-dashboard-store-sqlite/src/writer.rs
// ============================================================================
// Module: SQLite Dashboard Writer
// Description: Read-write access used by ingestion and fixtures.
// Purpose: Create the dashboard schema and persist ingested rows.
// Dependencies: ecfr-dashboard-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! The serving path never writes. [`SqliteDashboardWriter`] is the only
//! component that opens the database read-write; it is used by the
//! `ingest` command and by tests that need a populated database file.
//! Agencies are upserted by name. Each ingest run replaces the reference
//! error log in a single transaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::time::Duration;

use ecfr_dashboard_core::Agency;
use ecfr_dashboard_core::Correction;
use ecfr_dashboard_core::StructuredField;
use ecfr_dashboard_core::ingest::AgencyRecord;
use ecfr_dashboard_core::ingest::IngestReport;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::params;
use serde::Serialize;

use crate::schema::CREATE_TABLES;
use crate::store::SqliteStoreConfig;
use crate::store::SqliteStoreError;
use crate::store::validate_store_path;

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Read-write `SQLite` connection for populating the dashboard database.
pub struct SqliteDashboardWriter {
    /// Exclusive read-write connection.
    connection: Connection,
}

/// Rows written by one ingest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestCounts {
    /// Agencies upserted.
    pub agencies: usize,
    /// Reference errors recorded.
    pub errors: usize,
}

impl SqliteDashboardWriter {
    /// Opens (creating when needed) the database and its tables.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let connection = Connection::open_with_flags(&config.path, flags)
            .map_err(|err| SqliteStoreError::Unavailable(err.to_string()))?;
        connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        connection.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            connection,
        })
    }

    /// Inserts or replaces an agency by name.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the statement fails.
    pub fn upsert_agency(&self, agency: &Agency) -> Result<(), SqliteStoreError> {
        let references = match &agency.cfr_references {
            StructuredField::Parsed(values) => json_text(values)?,
            StructuredField::Raw(text) => text.clone(),
        };
        upsert_agency_row(
            &self.connection,
            &AgencyColumns {
                name: &agency.name,
                short_name: agency.short_name.as_deref(),
                slug: agency.slug.as_deref(),
                cfr_references: &references,
                sub_agencies: agency.sub_agencies,
                word_count: agency.word_count,
            },
        )
    }

    /// Inserts or replaces a correction by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the statement fails.
    pub fn insert_correction(&self, correction: &Correction) -> Result<(), SqliteStoreError> {
        self.connection.execute(
            "INSERT OR REPLACE INTO agency_corrections (
                correction_id, agency_name, title, corrective_action,
                error_corrected, error_occurred, fr_citation, last_modified
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                correction.correction_id,
                correction.agency_name,
                correction.title,
                correction.corrective_action,
                correction.error_corrected,
                correction.error_occurred,
                correction.fr_citation,
                correction.last_modified,
            ],
        )?;
        Ok(())
    }

    /// Appends a reference error row and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the statement fails.
    pub fn record_reference_error(
        &self,
        agency_name: &str,
        cfr_reference: &str,
        error_message: &str,
        timestamp: Option<&str>,
    ) -> Result<i64, SqliteStoreError> {
        self.connection.execute(
            "INSERT INTO cfr_reference_errors (agency_name, cfr_reference, error_message, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![agency_name, cfr_reference, error_message, timestamp],
        )?;
        Ok(self.connection.last_insert_rowid())
    }

    /// Persists an ingest report atomically, replacing previous diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when any statement fails; nothing is
    /// written in that case.
    pub fn write_ingest_report(
        &mut self,
        report: &IngestReport,
    ) -> Result<IngestCounts, SqliteStoreError> {
        let tx = self.connection.transaction()?;
        tx.execute("DELETE FROM cfr_reference_errors", [])?;
        for record in &report.agencies {
            write_agency_record(&tx, record)?;
        }
        for error in &report.errors {
            tx.execute(
                "INSERT INTO cfr_reference_errors (agency_name, cfr_reference, error_message, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![error.agency_name, json_text(&error.cfr_reference)?, error.error_message, report.date],
            )?;
        }
        tx.commit()?;
        Ok(IngestCounts {
            agencies: report.agencies.len(),
            errors: report.errors.len(),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Borrowed agency column values.
struct AgencyColumns<'a> {
    /// Agency name.
    name: &'a str,
    /// Short name.
    short_name: Option<&'a str>,
    /// URL slug.
    slug: Option<&'a str>,
    /// References as JSON text.
    cfr_references: &'a str,
    /// Direct sub-agencies.
    sub_agencies: u64,
    /// Word count.
    word_count: Option<u64>,
}

/// Writes an ingested agency.
fn write_agency_record(
    connection: &Connection,
    record: &AgencyRecord,
) -> Result<(), SqliteStoreError> {
    let references = json_text(&record.cfr_references)?;
    upsert_agency_row(
        connection,
        &AgencyColumns {
            name: &record.name,
            short_name: record.short_name.as_deref(),
            slug: record.slug.as_deref(),
            cfr_references: &references,
            sub_agencies: record.sub_agencies,
            word_count: Some(record.word_count),
        },
    )
}

/// `INSERT OR REPLACE` for one agency row.
fn upsert_agency_row(
    connection: &Connection,
    columns: &AgencyColumns<'_>,
) -> Result<(), SqliteStoreError> {
    let word_count = columns.word_count.map(signed).transpose()?;
    connection.execute(
        "INSERT OR REPLACE INTO agencies (name, short_name, slug, cfr_references, sub_agencies, word_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            columns.name,
            columns.short_name,
            columns.slug,
            columns.cfr_references,
            signed(columns.sub_agencies)?,
            word_count,
        ],
    )?;
    Ok(())
}

/// Serializes a JSON column.
fn json_text<T: Serialize + ?Sized>(value: &T) -> Result<String, SqliteStoreError> {
    serde_json::to_string(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Converts an unsigned count to an `SQLite` integer.
fn signed(value: u64) -> Result<i64, SqliteStoreError> {
    i64::try_from(value)
        .map_err(|_| SqliteStoreError::Invalid(format!("integer out of range: {value}")))
}

/// Ensures the parent directory for the database exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}
