// crates/ecfr-dashboard-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Dashboard Store
// Description: Read-only DashboardStore over a SQLite database file.
// Purpose: Execute validated, parameterized dashboard queries.
// Dependencies: ecfr-dashboard-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteDashboardStore`] holds one read-only connection behind a mutex.
//! Every statement binds caller values as parameters; the only interpolated
//! SQL fragments come from [`ErrorSortKey::column`] and
//! [`SortDirection::keyword`](ecfr_dashboard_core::SortDirection::keyword).
//! Substring filters compare through `unicode_lower`, registered on the
//! connection, because the built-in `lower()` only folds ASCII.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use ecfr_dashboard_core::Agency;
use ecfr_dashboard_core::AgencyMetricRow;
use ecfr_dashboard_core::AgencyQuery;
use ecfr_dashboard_core::AgencySort;
use ecfr_dashboard_core::CfrReferenceError;
use ecfr_dashboard_core::Correction;
use ecfr_dashboard_core::CorrectionQuery;
use ecfr_dashboard_core::DashboardStore;
use ecfr_dashboard_core::ErrorSortKey;
use ecfr_dashboard_core::Page;
use ecfr_dashboard_core::ReferenceErrorQuery;
use ecfr_dashboard_core::StoreError;
use ecfr_dashboard_core::StructuredField;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::functions::FunctionFlags;
use rusqlite::params;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use thiserror::Error;

use crate::schema::REQUIRED_TABLES;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum total path length for the database file.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;

/// Columns selected for correction rows.
pub(crate) const CORRECTION_COLUMNS: &str = "correction_id, agency_name, title, corrective_action, \
                                             error_corrected, error_occurred, fr_citation, \
                                             last_modified";

/// Unicode-aware lowercasing function registered on reader connections.
const UNICODE_LOWER: &str = "unicode_lower";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the `SQLite` dashboard store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl SqliteStoreConfig {
    /// Creates a config for `path` with the default busy timeout.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Filesystem error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// Database could not be opened or locked.
    #[error("sqlite store unavailable: {0}")]
    Unavailable(String),
    /// `SQLite` engine error during a statement.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) | SqliteStoreError::Unavailable(message) => {
                Self::Unavailable(message)
            }
            SqliteStoreError::Db(message) => Self::Query(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::FromSqlConversionFailure(..) => Self::Invalid(error.to_string()),
            other => Self::Db(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Read-only `SQLite` dashboard store.
#[derive(Clone)]
pub struct SqliteDashboardStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDashboardStore {
    /// Opens an existing dashboard database read-only.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the file is missing, cannot be opened,
    /// or lacks one of the dashboard tables.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        if !config.path.is_file() {
            return Err(SqliteStoreError::Unavailable(format!(
                "database file not found: {}",
                config.path.display()
            )));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let connection = Connection::open_with_flags(&config.path, flags)
            .map_err(|err| SqliteStoreError::Unavailable(err.to_string()))?;
        connection.execute_batch("PRAGMA query_only = ON;")?;
        connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        register_unicode_lower(&connection)?;
        verify_tables(&connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Runs `f` with the locked connection.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Unavailable("mutex poisoned".to_string()))?;
        f(&guard)
    }

    /// Agency listing with total count.
    fn query_agencies(&self, query: &AgencyQuery) -> Result<Page<Agency>, SqliteStoreError> {
        let pattern = query.search_pattern();
        let order = match query.sort {
            AgencySort::Name => "name ASC",
            AgencySort::WordCount => "word_count DESC, name ASC",
        };
        self.with_connection(|connection| {
            let total: i64 = connection.query_row(
                "SELECT COUNT(*) FROM agencies WHERE (?1 IS NULL OR unicode_lower(name) LIKE ?1 ESCAPE '\\')",
                params![pattern],
                |row| row.get(0),
            )?;
            let sql = format!(
                "SELECT name, short_name, slug, cfr_references, sub_agencies, word_count
                 FROM agencies
                 WHERE (?1 IS NULL OR unicode_lower(name) LIKE ?1 ESCAPE '\\')
                 ORDER BY {order}
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = connection.prepare(&sql)?;
            let items = stmt
                .query_map(
                    params![pattern, query.window.sql_limit(), query.window.sql_offset()],
                    agency_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Page {
                items,
                total: count(total),
            })
        })
    }

    /// Correction listing with total count.
    fn query_corrections(
        &self,
        query: &CorrectionQuery,
    ) -> Result<Page<Correction>, SqliteStoreError> {
        self.with_connection(|connection| {
            let total: i64 = connection.query_row(
                "SELECT COUNT(*) FROM agency_corrections WHERE (?1 IS NULL OR agency_name = ?1)",
                params![query.agency_name],
                |row| row.get(0),
            )?;
            let sql = format!(
                "SELECT {CORRECTION_COLUMNS}
                 FROM agency_corrections
                 WHERE (?1 IS NULL OR agency_name = ?1)
                 ORDER BY error_corrected DESC, correction_id DESC
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = connection.prepare(&sql)?;
            let items = stmt
                .query_map(
                    params![
                        query.agency_name,
                        query.window.sql_limit(),
                        query.window.sql_offset()
                    ],
                    correction_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Page {
                items,
                total: count(total),
            })
        })
    }

    /// Reference error listing with total count.
    fn query_reference_errors(
        &self,
        query: &ReferenceErrorQuery,
    ) -> Result<Page<CfrReferenceError>, SqliteStoreError> {
        let agency = query.agency_pattern();
        let message = query.message_pattern();
        let window = query.window();
        let order = order_clause(query.sort, query.direction.keyword());
        self.with_connection(|connection| {
            let filter = "(?1 IS NULL OR unicode_lower(agency_name) LIKE ?1 ESCAPE '\\')
                 AND (?2 IS NULL OR unicode_lower(error_message) LIKE ?2 ESCAPE '\\')";
            let total: i64 = connection.query_row(
                &format!("SELECT COUNT(*) FROM cfr_reference_errors WHERE {filter}"),
                params![agency, message],
                |row| row.get(0),
            )?;
            let sql = format!(
                "SELECT id, agency_name, cfr_reference, error_message, timestamp
                 FROM cfr_reference_errors
                 WHERE {filter}
                 ORDER BY {order}
                 LIMIT ?3 OFFSET ?4"
            );
            let mut stmt = connection.prepare(&sql)?;
            let items = stmt
                .query_map(
                    params![agency, message, window.sql_limit(), window.sql_offset()],
                    reference_error_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Page {
                items,
                total: count(total),
            })
        })
    }

    /// One row per agency with its correction count.
    fn query_metric_rows(&self) -> Result<Vec<AgencyMetricRow>, SqliteStoreError> {
        self.with_connection(|connection| {
            let mut stmt = connection.prepare(
                "SELECT a.name, a.word_count, COALESCE(a.sub_agencies, 0), COUNT(c.correction_id)
                 FROM agencies a
                 LEFT JOIN agency_corrections c ON c.agency_name = a.name
                 GROUP BY a.name, a.word_count, a.sub_agencies
                 ORDER BY a.name ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(AgencyMetricRow {
                        name: row.get(0)?,
                        word_count: optional_unsigned(row, 1)?,
                        sub_agencies: unsigned(row, 2)?,
                        correction_count: unsigned(row, 3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Most recently corrected entries.
    fn query_recent_corrections(&self, limit: u32) -> Result<Vec<Correction>, SqliteStoreError> {
        self.with_connection(|connection| {
            let sql = format!(
                "SELECT {CORRECTION_COLUMNS}
                 FROM agency_corrections
                 ORDER BY error_corrected DESC, correction_id DESC
                 LIMIT ?1"
            );
            let mut stmt = connection.prepare(&sql)?;
            let rows = stmt
                .query_map(params![i64::from(limit)], correction_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

impl DashboardStore for SqliteDashboardStore {
    fn list_agencies(&self, query: &AgencyQuery) -> Result<Page<Agency>, StoreError> {
        self.query_agencies(query).map_err(StoreError::from)
    }

    fn list_corrections(&self, query: &CorrectionQuery) -> Result<Page<Correction>, StoreError> {
        self.query_corrections(query).map_err(StoreError::from)
    }

    fn list_reference_errors(
        &self,
        query: &ReferenceErrorQuery,
    ) -> Result<Page<CfrReferenceError>, StoreError> {
        self.query_reference_errors(query).map_err(StoreError::from)
    }

    fn agency_metric_rows(&self) -> Result<Vec<AgencyMetricRow>, StoreError> {
        self.query_metric_rows().map_err(StoreError::from)
    }

    fn recent_corrections(&self, limit: u32) -> Result<Vec<Correction>, StoreError> {
        self.query_recent_corrections(limit).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Decodes an agency row.
fn agency_from_row(row: &Row<'_>) -> rusqlite::Result<Agency> {
    let references: Option<String> = row.get(3)?;
    Ok(Agency {
        name: row.get(0)?,
        short_name: row.get(1)?,
        slug: row.get(2)?,
        cfr_references: references
            .as_deref()
            .map_or_else(|| StructuredField::Parsed(Vec::new()), StructuredField::parse),
        sub_agencies: optional_unsigned(row, 4)?.unwrap_or(0),
        word_count: optional_unsigned(row, 5)?,
    })
}

/// Decodes a correction row selected with [`CORRECTION_COLUMNS`].
pub(crate) fn correction_from_row(row: &Row<'_>) -> rusqlite::Result<Correction> {
    Ok(Correction {
        correction_id: row.get(0)?,
        agency_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        title: row.get(2)?,
        corrective_action: row.get(3)?,
        error_corrected: row.get(4)?,
        error_occurred: row.get(5)?,
        fr_citation: row.get(6)?,
        last_modified: row.get(7)?,
    })
}

/// Decodes a reference error row.
fn reference_error_from_row(row: &Row<'_>) -> rusqlite::Result<CfrReferenceError> {
    let reference: Option<String> = row.get(2)?;
    Ok(CfrReferenceError {
        id: row.get(0)?,
        agency_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        cfr_reference: StructuredField::parse(reference.as_deref().unwrap_or_default()),
        error_message: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        timestamp: row.get(4)?,
    })
}

/// Reads a nullable non-negative integer column.
fn optional_unsigned(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<u64>> {
    row.get::<_, Option<i64>>(idx)?
        .map(|value| {
            u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
        })
        .transpose()
}

/// Reads a non-negative integer column.
fn unsigned(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// ORDER BY clause built only from allow-listed fragments.
fn order_clause(sort: ErrorSortKey, direction: &'static str) -> String {
    match sort {
        ErrorSortKey::Id => format!("id {direction}"),
        other => format!("{} {direction}, id ASC", other.column()),
    }
}

/// Converts a `COUNT(*)` result.
fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Registers [`UNICODE_LOWER`]; non-text arguments yield `NULL`.
fn register_unicode_lower(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let ValueRef::Text(bytes) = ctx.get_raw(0) else {
                return Ok(None);
            };
            Ok(Some(String::from_utf8_lossy(bytes).to_lowercase()))
        },
    )?;
    Ok(())
}

/// Fails unless every dashboard table exists.
fn verify_tables(connection: &Connection) -> Result<(), SqliteStoreError> {
    for table in REQUIRED_TABLES {
        let found: Option<String> = connection
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        if found.is_none() {
            return Err(SqliteStoreError::Invalid(format!("missing table: {table}")));
        }
    }
    Ok(())
}

/// Validates store paths for safety limits.
pub(crate) fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
