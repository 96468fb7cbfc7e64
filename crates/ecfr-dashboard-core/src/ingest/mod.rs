// crates/ecfr-dashboard-core/src/ingest/mod.rs
// ============================================================================
// Module: Agency Ingestion
// Description: Word-count attribution from eCFR agency and title exports.
// Purpose: Produce agency rows and reference diagnostics for the data store.
// Dependencies: serde, serde_json, thiserror, crate::model
// ============================================================================

//! ## Overview
//! Ingestion walks the agency directory (agencies and their nested children),
//! resolves each CFR reference against a [`TitleIndex`], and sums the
//! resolved sizes into the agency's word count. References that cannot be
//! resolved are reported as [`ReferenceErrorRecord`] rows rather than failing
//! the run.
//!
//! Resolution is bottom-up: the most specific level present wins. A reference
//! naming a part is resolved as a part (under its subchapter when named, else
//! under the chapter), then subchapter, then chapter, then subtitle.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod structure;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::CfrReference;
pub use structure::StructureNode;
pub use structure::TitleIndex;

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// Agency directory export (`agencies.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgencyDirectory {
    /// Top-level agencies.
    #[serde(default)]
    pub agencies: Vec<AgencySource>,
}

/// One agency entry, possibly with nested children.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgencySource {
    /// Preferred display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Formal name.
    #[serde(default)]
    pub name: Option<String>,
    /// Short name or acronym.
    #[serde(default)]
    pub short_name: Option<String>,
    /// URL slug.
    #[serde(default)]
    pub slug: Option<String>,
    /// Raw CFR references.
    #[serde(default)]
    pub cfr_references: Option<Vec<Value>>,
    /// Sub-agencies.
    #[serde(default)]
    pub children: Option<Vec<AgencySource>>,
}

impl AgencySource {
    /// Name used as the agency key.
    #[must_use]
    pub fn agency_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNKNOWN_AGENCY)
    }

    /// Direct children.
    fn children(&self) -> &[Self] {
        self.children.as_deref().unwrap_or_default()
    }
}

/// Title catalog export (`titles.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleCatalog {
    /// Titles with their currency dates.
    #[serde(default)]
    pub titles: Vec<TitleSummary>,
}

/// Title metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct TitleSummary {
    /// Title number.
    pub number: u32,
    /// Last amendment date.
    #[serde(default)]
    pub latest_amended_on: Option<String>,
    /// Currency date.
    #[serde(default)]
    pub up_to_date_as_of: Option<String>,
}

impl TitleCatalog {
    /// Structure date per title, falling back to `today`.
    #[must_use]
    pub fn dates(&self, today: &str) -> BTreeMap<u32, String> {
        self.titles
            .iter()
            .map(|title| {
                let date = title
                    .latest_amended_on
                    .clone()
                    .or_else(|| title.up_to_date_as_of.clone())
                    .unwrap_or_else(|| today.to_string());
                (title.number, date)
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// Agency row ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgencyRecord {
    /// Agency name.
    pub name: String,
    /// Short name.
    pub short_name: Option<String>,
    /// URL slug.
    pub slug: Option<String>,
    /// References as exported.
    pub cfr_references: Vec<Value>,
    /// Number of direct children.
    pub sub_agencies: u64,
    /// Sum of resolved reference sizes.
    pub word_count: u64,
}

/// Reference diagnostic ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceErrorRecord {
    /// Agency name.
    pub agency_name: String,
    /// Offending reference as exported (`{}` when none were provided).
    pub cfr_reference: Value,
    /// Diagnostic message.
    pub error_message: String,
}

/// Result of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Ingestion date recorded on diagnostics.
    pub date: String,
    /// Agencies in directory order (parents before children).
    pub agencies: Vec<AgencyRecord>,
    /// Reference diagnostics.
    pub errors: Vec<ReferenceErrorRecord>,
}

// ============================================================================
// SECTION: Diagnostics
// ============================================================================

/// Placeholder name for agencies without one.
pub const UNKNOWN_AGENCY: &str = "Unknown Agency";

/// Reasons a reference contributes no words.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceIssue {
    /// Agency lists no references.
    #[error("No cfr_references provided for agency {0}")]
    NoReferences(String),
    /// Title missing or not an integer.
    #[error("Invalid title: {0}")]
    InvalidTitle(String),
    /// Reference could not be decoded.
    #[error("Malformed reference: {0}")]
    Malformed(String),
    /// No structure was loaded for the title.
    #[error("No structure data for title {title}, date {date}")]
    MissingStructure {
        /// Title number.
        title: u32,
        /// Structure date.
        date: String,
    },
    /// Part not present at the named location.
    #[error(
        "Part {part} not found for title {title}, subtitle {subtitle}, chapter {chapter}, \
         subchapter {subchapter}"
    )]
    PartNotFound {
        /// Title number.
        title: u32,
        /// Subtitle identifier.
        subtitle: Level,
        /// Chapter identifier.
        chapter: Level,
        /// Subchapter identifier.
        subchapter: Level,
        /// Part identifier.
        part: String,
    },
    /// Subchapter not present at the named location.
    #[error("Subchapter {subchapter} not found for title {title}, subtitle {subtitle}, chapter {chapter}")]
    SubchapterNotFound {
        /// Title number.
        title: u32,
        /// Subtitle identifier.
        subtitle: Level,
        /// Chapter identifier.
        chapter: Level,
        /// Subchapter identifier.
        subchapter: String,
    },
    /// Chapter not present at the named location.
    #[error("Chapter {chapter} not found for title {title}, subtitle {subtitle}")]
    ChapterNotFound {
        /// Title number.
        title: u32,
        /// Subtitle identifier.
        subtitle: Level,
        /// Chapter identifier.
        chapter: String,
    },
    /// Subtitle not present.
    #[error("Subtitle {subtitle} not found for title {title}")]
    SubtitleNotFound {
        /// Title number.
        title: u32,
        /// Subtitle identifier.
        subtitle: String,
    },
    /// Reference names no level the index can resolve.
    #[error("No valid subtitle or chapter specified for title {0}")]
    NoSubtitleOrChapter(u32),
    /// Reference names only subpart/section levels.
    #[error("Subpart {subpart} or section {section} not supported")]
    UnsupportedLevel {
        /// Subpart identifier.
        subpart: Level,
        /// Section identifier.
        section: Level,
    },
}

/// Optional hierarchy level rendered in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level(pub Option<String>);

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_deref().unwrap_or("none"))
    }
}

impl From<&Option<String>> for Level {
    fn from(value: &Option<String>) -> Self {
        Self(value.clone())
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves one reference against a title index.
///
/// # Errors
///
/// Returns the [`ReferenceIssue`] describing why no size was found.
pub fn resolve_reference(reference: &CfrReference, index: &TitleIndex) -> Result<u64, ReferenceIssue> {
    let title = reference.title;
    let subtitle = reference.subtitle.as_deref();
    let chapter = reference.chapter.as_deref();
    let subchapter = reference.subchapter.as_deref();

    if let Some(part) = reference.part.as_deref() {
        let nested = subtitle.zip(chapter).and_then(|(s, c)| index.subtitle_chapter(s, c));
        let direct = chapter.and_then(|c| index.chapters.get(c));
        return [nested, direct]
            .into_iter()
            .flatten()
            .find_map(|entry| entry.part_size(subchapter, part))
            .ok_or_else(|| ReferenceIssue::PartNotFound {
                title,
                subtitle: (&reference.subtitle).into(),
                chapter: (&reference.chapter).into(),
                subchapter: (&reference.subchapter).into(),
                part: part.to_string(),
            });
    }

    if let Some(subchapter) = subchapter {
        let nested = subtitle.zip(chapter).and_then(|(s, c)| index.subtitle_chapter(s, c));
        let direct = chapter.and_then(|c| index.chapters.get(c));
        return [nested, direct]
            .into_iter()
            .flatten()
            .find_map(|entry| entry.subchapter_size(subchapter))
            .ok_or_else(|| ReferenceIssue::SubchapterNotFound {
                title,
                subtitle: (&reference.subtitle).into(),
                chapter: (&reference.chapter).into(),
                subchapter: subchapter.to_string(),
            });
    }

    if let Some(chapter) = chapter {
        return subtitle
            .and_then(|s| index.subtitle_chapter(s, chapter))
            .or_else(|| index.chapters.get(chapter))
            .map(|entry| entry.size)
            .ok_or_else(|| ReferenceIssue::ChapterNotFound {
                title,
                subtitle: (&reference.subtitle).into(),
                chapter: chapter.to_string(),
            });
    }

    if let Some(subtitle) = subtitle {
        return index.subtitles.get(subtitle).map(|entry| entry.size).ok_or_else(|| {
            ReferenceIssue::SubtitleNotFound {
                title,
                subtitle: subtitle.to_string(),
            }
        });
    }

    Err(ReferenceIssue::NoSubtitleOrChapter(title))
}

/// Resolves a raw reference value, collecting every diagnostic it produces.
fn resolve_value(
    value: &Value,
    structures: &BTreeMap<u32, TitleIndex>,
    dates: &BTreeMap<u32, String>,
    today: &str,
) -> Result<u64, Vec<ReferenceIssue>> {
    let title = value.get("title").and_then(Value::as_u64).and_then(|n| u32::try_from(n).ok());
    let Some(title) = title else {
        let shown = value.get("title").map_or_else(|| "none".to_string(), Value::to_string);
        return Err(vec![ReferenceIssue::InvalidTitle(shown)]);
    };
    let reference: CfrReference = serde_json::from_value(value.clone())
        .map_err(|err| vec![ReferenceIssue::Malformed(err.to_string())])?;
    let Some(index) = structures.get(&title).filter(|index| !index.is_empty()) else {
        let date = dates.get(&title).cloned().unwrap_or_else(|| today.to_string());
        return Err(vec![ReferenceIssue::MissingStructure {
            title,
            date,
        }]);
    };
    resolve_reference(&reference, index).map_err(|issue| {
        let mut issues = vec![issue];
        if matches!(issues[0], ReferenceIssue::NoSubtitleOrChapter(_))
            && (reference.subpart.is_some() || reference.section.is_some())
        {
            issues.push(ReferenceIssue::UnsupportedLevel {
                subpart: (&reference.subpart).into(),
                section: (&reference.section).into(),
            });
        }
        issues
    })
}

// ============================================================================
// SECTION: Ingestion
// ============================================================================

/// Walks the directory and attributes word counts to every agency.
#[must_use]
pub fn ingest_agencies(
    directory: &AgencyDirectory,
    catalog: &TitleCatalog,
    structures: &BTreeMap<u32, TitleIndex>,
    today: &str,
) -> IngestReport {
    let dates = catalog.dates(today);
    let mut report = IngestReport {
        date: today.to_string(),
        ..IngestReport::default()
    };
    let mut pending: Vec<&AgencySource> = directory.agencies.iter().rev().collect();
    while let Some(agency) = pending.pop() {
        let name = agency.agency_name().to_string();
        let references = agency.cfr_references.clone().unwrap_or_default();
        let mut word_count = 0_u64;
        if references.is_empty() {
            report.errors.push(ReferenceErrorRecord {
                agency_name: name.clone(),
                cfr_reference: Value::Object(serde_json::Map::new()),
                error_message: ReferenceIssue::NoReferences(name.clone()).to_string(),
            });
        }
        for value in &references {
            match resolve_value(value, structures, &dates, today) {
                Ok(size) => word_count = word_count.saturating_add(size),
                Err(issues) => {
                    report.errors.extend(issues.into_iter().map(|issue| ReferenceErrorRecord {
                        agency_name: name.clone(),
                        cfr_reference: value.clone(),
                        error_message: issue.to_string(),
                    }));
                }
            }
        }
        report.agencies.push(AgencyRecord {
            name,
            short_name: agency.short_name.clone(),
            slug: agency.slug.clone(),
            cfr_references: references,
            sub_agencies: agency.children().len() as u64,
            word_count,
        });
        pending.extend(agency.children().iter().rev());
    }
    report
}
