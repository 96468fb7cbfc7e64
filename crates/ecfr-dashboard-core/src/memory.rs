// crates/ecfr-dashboard-core/src/memory.rs
// ============================================================================
// Module: In-Memory Dashboard Store
// Description: Simple in-memory dashboard store for tests and demos.
// Purpose: Provide deterministic store behavior without a database.
// Dependencies: crate::{interfaces, model, query}
// ============================================================================

//! ## Overview
//! [`InMemoryDashboardStore`] mirrors the ordering and filtering rules of the
//! SQL backends (NULLs sort as smallest values, ties break on the row key) so
//! HTTP tests can run without a database file. It is not intended for
//! production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::interfaces::DashboardStore;
use crate::interfaces::StoreError;
use crate::model::Agency;
use crate::model::AgencyMetricRow;
use crate::model::CfrReferenceError;
use crate::model::Correction;
use crate::model::StructuredField;
use crate::query::AgencyQuery;
use crate::query::AgencySort;
use crate::query::CorrectionQuery;
use crate::query::ErrorSortKey;
use crate::query::Page;
use crate::query::ReferenceErrorQuery;
use crate::query::SortDirection;
use crate::query::contains_ignore_case;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Rows held by the in-memory store.
#[derive(Debug, Default)]
struct MemoryState {
    /// Agencies keyed by insertion order.
    agencies: Vec<Agency>,
    /// Corrections.
    corrections: Vec<Correction>,
    /// Reference errors.
    errors: Vec<CfrReferenceError>,
    /// Error returned by every read when set.
    failure: Option<StoreError>,
}

/// In-memory dashboard store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDashboardStore {
    /// Shared state protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryDashboardStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an agency by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the mutex is poisoned.
    pub fn upsert_agency(&self, agency: Agency) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if let Some(existing) = state.agencies.iter_mut().find(|row| row.name == agency.name) {
            *existing = agency;
        } else {
            state.agencies.push(agency);
        }
        drop(state);
        Ok(())
    }

    /// Inserts a correction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the mutex is poisoned.
    pub fn insert_correction(&self, correction: Correction) -> Result<(), StoreError> {
        self.lock()?.corrections.push(correction);
        Ok(())
    }

    /// Inserts a reference error row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the mutex is poisoned.
    pub fn insert_reference_error(&self, error: CfrReferenceError) -> Result<(), StoreError> {
        self.lock()?.errors.push(error);
        Ok(())
    }

    /// Makes every subsequent read fail with `failure` (or succeed when `None`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the mutex is poisoned.
    pub fn set_failure(&self, failure: Option<StoreError>) -> Result<(), StoreError> {
        self.lock()?.failure = failure;
        Ok(())
    }

    /// Locks the state and surfaces any injected failure.
    fn read(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        let state = self.lock()?;
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }
        Ok(state)
    }

    /// Locks the state.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("dashboard store mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Store Implementation
// ============================================================================

impl DashboardStore for InMemoryDashboardStore {
    fn list_agencies(&self, query: &AgencyQuery) -> Result<Page<Agency>, StoreError> {
        let mut rows: Vec<Agency> = {
            let state = self.read()?;
            state
                .agencies
                .iter()
                .filter(|agency| {
                    query.search.as_deref().is_none_or(|term| contains_ignore_case(&agency.name, term))
                })
                .cloned()
                .collect()
        };
        match query.sort {
            AgencySort::Name => rows.sort_by(|a, b| a.name.cmp(&b.name)),
            AgencySort::WordCount => rows.sort_by(|a, b| {
                b.word_count.cmp(&a.word_count).then_with(|| a.name.cmp(&b.name))
            }),
        }
        let total = rows.len() as u64;
        Ok(Page {
            items: query.window.slice(rows),
            total,
        })
    }

    fn list_corrections(&self, query: &CorrectionQuery) -> Result<Page<Correction>, StoreError> {
        let mut rows: Vec<Correction> = {
            let state = self.read()?;
            state
                .corrections
                .iter()
                .filter(|row| {
                    query.agency_name.as_deref().is_none_or(|name| row.agency_name == name)
                })
                .cloned()
                .collect()
        };
        rows.sort_by(most_recent_first);
        let total = rows.len() as u64;
        Ok(Page {
            items: query.window.slice(rows),
            total,
        })
    }

    fn list_reference_errors(
        &self,
        query: &ReferenceErrorQuery,
    ) -> Result<Page<CfrReferenceError>, StoreError> {
        let mut rows: Vec<CfrReferenceError> = {
            let state = self.read()?;
            state
                .errors
                .iter()
                .filter(|row| {
                    query
                        .agency_name
                        .as_deref()
                        .is_none_or(|term| contains_ignore_case(&row.agency_name, term))
                        && query
                            .error_message
                            .as_deref()
                            .is_none_or(|term| contains_ignore_case(&row.error_message, term))
                })
                .cloned()
                .collect()
        };
        rows.sort_by(|a, b| {
            let primary = compare_error_column(a, b, query.sort);
            let primary = match query.direction {
                SortDirection::Asc => primary,
                SortDirection::Desc => primary.reverse(),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });
        let total = rows.len() as u64;
        Ok(Page {
            items: query.window().slice(rows),
            total,
        })
    }

    fn agency_metric_rows(&self) -> Result<Vec<AgencyMetricRow>, StoreError> {
        let state = self.read()?;
        let rows = state
            .agencies
            .iter()
            .map(|agency| AgencyMetricRow {
                name: agency.name.clone(),
                word_count: agency.word_count,
                sub_agencies: agency.sub_agencies,
                correction_count: state
                    .corrections
                    .iter()
                    .filter(|correction| correction.agency_name == agency.name)
                    .count() as u64,
            })
            .collect();
        drop(state);
        Ok(rows)
    }

    fn recent_corrections(&self, limit: u32) -> Result<Vec<Correction>, StoreError> {
        let mut rows = self.read()?.corrections.clone();
        rows.sort_by(most_recent_first);
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// `error_corrected DESC NULLS LAST, correction_id DESC`.
fn most_recent_first(a: &Correction, b: &Correction) -> Ordering {
    b.error_corrected.cmp(&a.error_corrected).then_with(|| b.correction_id.cmp(&a.correction_id))
}

/// Compares two error rows on one allow-listed column, NULLs first.
fn compare_error_column(a: &CfrReferenceError, b: &CfrReferenceError, key: ErrorSortKey) -> Ordering {
    match key {
        ErrorSortKey::Id => a.id.cmp(&b.id),
        ErrorSortKey::AgencyName => a.agency_name.cmp(&b.agency_name),
        ErrorSortKey::CfrReference => {
            reference_text(&a.cfr_reference).cmp(&reference_text(&b.cfr_reference))
        }
        ErrorSortKey::ErrorMessage => a.error_message.cmp(&b.error_message),
        ErrorSortKey::Timestamp => a.timestamp.cmp(&b.timestamp),
    }
}

/// Text form of a reference column as a database would store it.
fn reference_text<T: serde::Serialize>(field: &StructuredField<T>) -> String {
    match field {
        StructuredField::Parsed(value) => serde_json::to_string(value).unwrap_or_default(),
        StructuredField::Raw(text) => text.clone(),
    }
}
