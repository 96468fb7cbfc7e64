// crates/ecfr-dashboard-core/src/model.rs
// ============================================================================
// Module: Dashboard Data Model
// Description: Agency, correction, and CFR reference error records.
// Purpose: Typed rows shared by every store backend and the HTTP layer.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Rows are read-only from the application's point of view. Columns that
//! hold JSON text written by external tooling are decoded into
//! [`StructuredField`], which keeps the raw text when decoding fails so the
//! dashboard can still display it verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

// ============================================================================
// SECTION: Structured Fields
// ============================================================================

/// A JSON text column that may fail to decode.
///
/// # Invariants
/// - `Raw` carries the stored text unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredField<T> {
    /// Column decoded into its structured form.
    Parsed(T),
    /// Column text that could not be decoded.
    Raw(String),
}

impl<T: DeserializeOwned> StructuredField<T> {
    /// Decodes JSON column text, falling back to the raw text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).map_or_else(|_| Self::Raw(raw.to_string()), Self::Parsed)
    }
}

impl<T> StructuredField<T> {
    /// Returns the decoded value when parsing succeeded.
    #[must_use]
    pub const fn parsed(&self) -> Option<&T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// Returns true when the column could not be decoded.
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

// ============================================================================
// SECTION: CFR References
// ============================================================================

/// Structured citation into the Code of Federal Regulations.
///
/// Hierarchy identifiers are normalized to strings; the eCFR exports mix
/// numeric and textual identifiers (`"I"`, `200`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfrReference {
    /// CFR title number.
    pub title: u32,
    /// Subtitle identifier.
    #[serde(default, deserialize_with = "identifier", skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Chapter identifier.
    #[serde(default, deserialize_with = "identifier", skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    /// Subchapter identifier.
    #[serde(default, deserialize_with = "identifier", skip_serializing_if = "Option::is_none")]
    pub subchapter: Option<String>,
    /// Part identifier.
    #[serde(default, deserialize_with = "identifier", skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    /// Subpart identifier.
    #[serde(default, deserialize_with = "identifier", skip_serializing_if = "Option::is_none")]
    pub subpart: Option<String>,
    /// Section identifier.
    #[serde(default, deserialize_with = "identifier", skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Fields not modeled explicitly.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CfrReference {
    /// Creates a title-only reference.
    #[must_use]
    pub const fn title(title: u32) -> Self {
        Self {
            title,
            subtitle: None,
            chapter: None,
            subchapter: None,
            part: None,
            subpart: None,
            section: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Deserializes an optional hierarchy identifier from a string or number.
///
/// Empty strings are treated as absent.
pub(crate) fn identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "identifier must be a string or number, got {other}"
        ))),
    }
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// A regulatory agency with aggregate attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    /// Unique display name (join key for corrections).
    pub name: String,
    /// Short name or acronym.
    pub short_name: Option<String>,
    /// URL slug.
    pub slug: Option<String>,
    /// Words of regulation attributed to the agency.
    pub word_count: Option<u64>,
    /// Number of direct sub-agencies.
    pub sub_agencies: u64,
    /// CFR references the agency is responsible for.
    pub cfr_references: StructuredField<Vec<CfrReference>>,
}

/// A recorded correction to regulatory text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    /// Correction identifier.
    pub correction_id: i64,
    /// Agency name the correction belongs to.
    pub agency_name: String,
    /// CFR title number.
    pub title: Option<i64>,
    /// Description of the corrective action.
    pub corrective_action: Option<String>,
    /// Date the error was corrected.
    pub error_corrected: Option<String>,
    /// Date the error occurred.
    pub error_occurred: Option<String>,
    /// Federal Register citation.
    pub fr_citation: Option<String>,
    /// Last modification date of the record.
    pub last_modified: Option<String>,
}

/// A malformed-reference diagnostic produced during ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfrReferenceError {
    /// Row identifier.
    pub id: i64,
    /// Agency whose reference failed to resolve.
    pub agency_name: String,
    /// The offending reference.
    pub cfr_reference: StructuredField<CfrReference>,
    /// Diagnostic message.
    pub error_message: String,
    /// Date the diagnostic was recorded.
    pub timestamp: Option<String>,
}

/// Per-agency inputs for metric aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyMetricRow {
    /// Agency name.
    pub name: String,
    /// Word count, when known.
    pub word_count: Option<u64>,
    /// Number of direct sub-agencies.
    pub sub_agencies: u64,
    /// Corrections recorded for the agency (zero when none).
    pub correction_count: u64,
}
