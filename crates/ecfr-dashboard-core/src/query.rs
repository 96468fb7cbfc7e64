// crates/ecfr-dashboard-core/src/query.rs
// ============================================================================
// Module: Dashboard Query Validation
// Description: Typed, validated query parameters for the list endpoints.
// Purpose: Turn raw query-string values into bounded, allow-listed queries.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Inbound query strings arrive as optional text. This module validates them
//! once, clamps page sizes, and maps sort keys onto closed enums so that store
//! backends never interpolate caller-provided text into SQL.
//!
//! Security posture: every value here is untrusted input. Sort columns come
//! only from [`ErrorSortKey::column`] and directions only from
//! [`SortDirection::keyword`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Smallest page size accepted after clamping.
pub const MIN_PAGE_SIZE: u32 = 1;
/// Largest page size accepted after clamping.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Default page size for agency and correction listings.
pub const DEFAULT_LIST_LIMIT: u32 = 20;
/// Default page size for the reference error log.
pub const DEFAULT_ERROR_LIMIT: u32 = 10;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Validation failures for inbound query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A parameter could not be parsed or is out of range.
    #[error("invalid {field}: {message}")]
    InvalidParameter {
        /// Parameter name.
        field: &'static str,
        /// Failure description.
        message: String,
    },
    /// Sort key outside the allow-list.
    #[error("unsupported sort key: {0}")]
    UnsupportedSort(String),
    /// Sort direction outside the allow-list.
    #[error("unsupported sort direction: {0}")]
    UnsupportedDirection(String),
}

// ============================================================================
// SECTION: Raw Parameters
// ============================================================================

/// Raw query parameters for `GET /api/agencies`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgencyParams {
    /// Case-insensitive substring filter on agency name.
    pub search: Option<String>,
    /// Sort key (`name` or `word_count`).
    pub sort: Option<String>,
    /// Requested page size.
    pub limit: Option<String>,
    /// Rows to skip.
    pub offset: Option<String>,
}

/// Raw query parameters for `GET /api/corrections`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorrectionParams {
    /// Exact agency name filter.
    pub agency_name: Option<String>,
    /// Requested page size.
    pub limit: Option<String>,
    /// Rows to skip.
    pub offset: Option<String>,
}

/// Raw query parameters for `GET /api/errors`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferenceErrorParams {
    /// One-based page number.
    pub page: Option<String>,
    /// Requested page size.
    pub limit: Option<String>,
    /// Substring filter on agency name.
    pub agency_name: Option<String>,
    /// Substring filter on the diagnostic message.
    pub error_message: Option<String>,
    /// Sort key from the allow-list.
    pub sort: Option<String>,
    /// Sort direction (`asc` or `desc`).
    pub direction: Option<String>,
}

// ============================================================================
// SECTION: Sort Keys
// ============================================================================

/// Agency listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgencySort {
    /// Name ascending.
    #[default]
    Name,
    /// Word count descending, ties by name ascending.
    WordCount,
}

impl AgencySort {
    /// Parses an optional sort key, defaulting to [`AgencySort::Name`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedSort`] for unknown keys.
    pub fn parse(value: Option<&str>) -> Result<Self, QueryError> {
        match present(value) {
            None | Some("name") => Ok(Self::Name),
            Some("word_count") => Ok(Self::WordCount),
            Some(other) => Err(QueryError::UnsupportedSort(other.to_string())),
        }
    }
}

/// Sortable columns of the reference error log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSortKey {
    /// Row identifier.
    #[default]
    Id,
    /// Agency name.
    AgencyName,
    /// Reference text.
    CfrReference,
    /// Diagnostic message.
    ErrorMessage,
    /// Recorded date.
    Timestamp,
}

impl ErrorSortKey {
    /// Parses an optional sort key, defaulting to [`ErrorSortKey::Id`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedSort`] for keys outside the allow-list.
    pub fn parse(value: Option<&str>) -> Result<Self, QueryError> {
        match present(value) {
            None | Some("id") => Ok(Self::Id),
            Some("agency_name") => Ok(Self::AgencyName),
            Some("cfr_reference") => Ok(Self::CfrReference),
            Some("error_message") => Ok(Self::ErrorMessage),
            Some("timestamp") => Ok(Self::Timestamp),
            Some(other) => Err(QueryError::UnsupportedSort(other.to_string())),
        }
    }

    /// Column name used in ORDER BY clauses.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::AgencyName => "agency_name",
            Self::CfrReference => "cfr_reference",
            Self::ErrorMessage => "error_message",
            Self::Timestamp => "timestamp",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// Parses an optional direction (case-insensitive), defaulting to ascending.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedDirection`] for anything else.
    pub fn parse(value: Option<&str>) -> Result<Self, QueryError> {
        match present(value) {
            None => Ok(Self::Asc),
            Some(text) if text.eq_ignore_ascii_case("asc") => Ok(Self::Asc),
            Some(text) if text.eq_ignore_ascii_case("desc") => Ok(Self::Desc),
            Some(other) => Err(QueryError::UnsupportedDirection(other.to_string())),
        }
    }

    /// SQL keyword for this direction.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

// ============================================================================
// SECTION: Validated Queries
// ============================================================================

/// Limit/offset window applied to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    /// Page size in `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]`.
    pub limit: u32,
    /// Rows skipped before the page.
    pub offset: u64,
}

impl PageWindow {
    /// Builds a window from raw `limit` and `offset` values.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidParameter`] for non-numeric values or a
    /// negative offset.
    pub fn parse(
        limit: Option<&str>,
        offset: Option<&str>,
        default_limit: u32,
    ) -> Result<Self, QueryError> {
        Ok(Self {
            limit: parse_limit(limit, default_limit)?,
            offset: parse_offset(offset)?,
        })
    }

    /// Limit as a signed SQL parameter.
    #[must_use]
    pub fn sql_limit(&self) -> i64 {
        i64::from(self.limit)
    }

    /// Offset as a signed SQL parameter, saturating at `i64::MAX`.
    #[must_use]
    pub fn sql_offset(&self) -> i64 {
        i64::try_from(self.offset).unwrap_or(i64::MAX)
    }

    /// Applies the window to an already ordered sequence.
    pub fn slice<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let skip = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let take = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.into_iter().skip(skip).take(take).collect()
    }
}

/// Validated agency listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgencyQuery {
    /// Search term as entered, when present.
    pub search: Option<String>,
    /// Listing order.
    pub sort: AgencySort,
    /// Page window.
    pub window: PageWindow,
}

impl AgencyQuery {
    /// Validates raw agency parameters.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] for unknown sort keys or malformed paging.
    pub fn from_params(params: &AgencyParams) -> Result<Self, QueryError> {
        Ok(Self {
            search: present(params.search.as_deref()).map(str::to_string),
            sort: AgencySort::parse(params.sort.as_deref())?,
            window: PageWindow::parse(
                params.limit.as_deref(),
                params.offset.as_deref(),
                DEFAULT_LIST_LIMIT,
            )?,
        })
    }

    /// Escaped, lowercased LIKE pattern for the search term.
    #[must_use]
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(like_pattern)
    }
}

/// Validated correction listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionQuery {
    /// Exact agency name filter.
    pub agency_name: Option<String>,
    /// Page window.
    pub window: PageWindow,
}

impl CorrectionQuery {
    /// Validates raw correction parameters.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] for malformed paging.
    pub fn from_params(params: &CorrectionParams) -> Result<Self, QueryError> {
        Ok(Self {
            agency_name: present(params.agency_name.as_deref()).map(str::to_string),
            window: PageWindow::parse(
                params.limit.as_deref(),
                params.offset.as_deref(),
                DEFAULT_LIST_LIMIT,
            )?,
        })
    }
}

/// Validated reference error query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceErrorQuery {
    /// Substring filter on agency name.
    pub agency_name: Option<String>,
    /// Substring filter on the diagnostic message.
    pub error_message: Option<String>,
    /// Sort column.
    pub sort: ErrorSortKey,
    /// Sort direction.
    pub direction: SortDirection,
    /// One-based page number.
    pub page: u64,
    /// Page size.
    pub limit: u32,
}

impl ReferenceErrorQuery {
    /// Validates raw reference error parameters.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] for keys outside the allow-lists or malformed
    /// paging.
    pub fn from_params(params: &ReferenceErrorParams) -> Result<Self, QueryError> {
        Ok(Self {
            agency_name: present(params.agency_name.as_deref()).map(str::to_string),
            error_message: present(params.error_message.as_deref()).map(str::to_string),
            sort: ErrorSortKey::parse(params.sort.as_deref())?,
            direction: SortDirection::parse(params.direction.as_deref())?,
            page: parse_page(params.page.as_deref())?,
            limit: parse_limit(params.limit.as_deref(), DEFAULT_ERROR_LIMIT)?,
        })
    }

    /// Window equivalent to `(page - 1) * limit`.
    #[must_use]
    pub const fn window(&self) -> PageWindow {
        PageWindow {
            limit: self.limit,
            offset: self.page.saturating_sub(1).saturating_mul(self.limit as u64),
        }
    }

    /// LIKE pattern for the agency filter.
    #[must_use]
    pub fn agency_pattern(&self) -> Option<String> {
        self.agency_name.as_deref().map(like_pattern)
    }

    /// LIKE pattern for the message filter.
    #[must_use]
    pub fn message_pattern(&self) -> Option<String> {
        self.error_message.as_deref().map(like_pattern)
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// One page of rows plus the unpaged match count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// Total rows matching the filters.
    pub total: u64,
}

/// Pagination block of the error log response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPagination {
    /// One-based page number.
    pub page: u64,
    /// Page size.
    pub limit: u32,
    /// Total matching rows.
    pub total: u64,
    /// `ceil(total / limit)`.
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl ErrorPagination {
    /// Builds the pagination block for a query result.
    #[must_use]
    pub const fn new(page: u64, limit: u32, total: u64) -> Self {
        let divisor = if limit == 0 { 1 } else { limit as u64 };
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(divisor),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Treats blank values as absent.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

/// Parses and clamps a page size.
fn parse_limit(value: Option<&str>, default: u32) -> Result<u32, QueryError> {
    let Some(text) = present(value) else {
        return Ok(default);
    };
    let parsed: i64 = text.parse().map_err(|_| QueryError::InvalidParameter {
        field: "limit",
        message: format!("expected an integer, got {text:?}"),
    })?;
    let clamped = parsed.clamp(i64::from(MIN_PAGE_SIZE), i64::from(MAX_PAGE_SIZE));
    Ok(u32::try_from(clamped).unwrap_or(MAX_PAGE_SIZE))
}

/// Parses a non-negative offset.
fn parse_offset(value: Option<&str>) -> Result<u64, QueryError> {
    let Some(text) = present(value) else {
        return Ok(0);
    };
    let parsed: i64 = text.parse().map_err(|_| QueryError::InvalidParameter {
        field: "offset",
        message: format!("expected an integer, got {text:?}"),
    })?;
    u64::try_from(parsed).map_err(|_| QueryError::InvalidParameter {
        field: "offset",
        message: format!("must be >= 0, got {parsed}"),
    })
}

/// Parses a one-based page number.
fn parse_page(value: Option<&str>) -> Result<u64, QueryError> {
    let Some(text) = present(value) else {
        return Ok(1);
    };
    let parsed: i64 = text.parse().map_err(|_| QueryError::InvalidParameter {
        field: "page",
        message: format!("expected an integer, got {text:?}"),
    })?;
    if parsed < 1 {
        return Err(QueryError::InvalidParameter {
            field: "page",
            message: format!("must be >= 1, got {parsed}"),
        });
    }
    u64::try_from(parsed).map_err(|_| QueryError::InvalidParameter {
        field: "page",
        message: format!("must be >= 1, got {parsed}"),
    })
}

/// Builds a lowercased `%term%` LIKE pattern with `\` escaping.
#[must_use]
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive substring match mirroring [`like_pattern`] semantics.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Farm_Credit"), "%farm\\_credit%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn blank_values_are_absent() {
        let params = AgencyParams {
            search: Some("   ".to_string()),
            sort: Some(String::new()),
            limit: Some(String::new()),
            offset: None,
        };
        let query = AgencyQuery::from_params(&params).unwrap();
        assert_eq!(query.search, None);
        assert_eq!(query.sort, AgencySort::Name);
        assert_eq!(query.window.limit, DEFAULT_LIST_LIMIT);
    }

    #[test]
    fn window_offset_saturates() {
        let query = ReferenceErrorQuery {
            agency_name: None,
            error_message: None,
            sort: ErrorSortKey::Id,
            direction: SortDirection::Asc,
            page: u64::MAX,
            limit: MAX_PAGE_SIZE,
        };
        assert_eq!(query.window().offset, u64::MAX);
        assert_eq!(query.window().sql_offset(), i64::MAX);
    }
}
