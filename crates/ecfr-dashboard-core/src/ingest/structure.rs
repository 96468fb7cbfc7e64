// crates/ecfr-dashboard-core/src/ingest/structure.rs
// ============================================================================
// Module: Title Structure Index
// Description: Size lookup tables built from eCFR title structure exports.
// Purpose: Resolve subtitle/chapter/subchapter/part identifiers to word sizes.
// Dependencies: serde, crate::model
// ============================================================================

//! ## Overview
//! An eCFR title structure is a tree of typed nodes (`subtitle`, `chapter`,
//! `subchapter`, `part`, ...) each carrying a `size`. [`TitleIndex`] flattens
//! the levels the dashboard attributes to agencies into nested maps so that a
//! reference resolves with a handful of lookups.
//!
//! Nodes without an identifier are skipped, as are reserved parts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::model::identifier;

// ============================================================================
// SECTION: Raw Structure
// ============================================================================

/// One node of an eCFR title structure export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StructureNode {
    /// Node level (`title`, `subtitle`, `chapter`, `subchapter`, `part`, ...).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Level identifier.
    #[serde(default, deserialize_with = "identifier")]
    pub identifier: Option<String>,
    /// Word size of the node.
    #[serde(default)]
    pub size: Option<u64>,
    /// Reserved placeholder flag.
    #[serde(default)]
    pub reserved: Option<bool>,
    /// Child nodes.
    #[serde(default)]
    pub children: Vec<StructureNode>,
}

impl StructureNode {
    /// Returns true when the node has the given level.
    fn is(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    /// Node size, zero when absent.
    fn size(&self) -> u64 {
        self.size.unwrap_or(0)
    }

    /// Returns true for reserved placeholders.
    fn is_reserved(&self) -> bool {
        self.reserved.unwrap_or(false)
    }
}

// ============================================================================
// SECTION: Index
// ============================================================================

/// Sizes of a subchapter and its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubchapterEntry {
    /// Subchapter size.
    pub size: u64,
    /// Part sizes keyed by part identifier.
    pub parts: BTreeMap<String, u64>,
}

/// Sizes of a chapter, its subchapters, and parts placed directly under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChapterEntry {
    /// Chapter size.
    pub size: u64,
    /// Subchapters keyed by identifier.
    pub subchapters: BTreeMap<String, SubchapterEntry>,
    /// Parts not nested under a subchapter.
    pub parts: BTreeMap<String, u64>,
}

impl ChapterEntry {
    /// Looks up a part, preferring the named subchapter.
    #[must_use]
    pub fn part_size(&self, subchapter: Option<&str>, part: &str) -> Option<u64> {
        subchapter
            .and_then(|id| self.subchapters.get(id))
            .and_then(|entry| entry.parts.get(part))
            .or_else(|| self.parts.get(part))
            .copied()
    }

    /// Looks up a subchapter size.
    #[must_use]
    pub fn subchapter_size(&self, subchapter: &str) -> Option<u64> {
        self.subchapters.get(subchapter).map(|entry| entry.size)
    }
}

/// Sizes of a subtitle and its chapters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubtitleEntry {
    /// Subtitle size.
    pub size: u64,
    /// Chapters keyed by identifier.
    pub chapters: BTreeMap<String, ChapterEntry>,
}

/// Lookup tables for one CFR title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TitleIndex {
    /// Subtitles keyed by identifier.
    pub subtitles: BTreeMap<String, SubtitleEntry>,
    /// Chapters placed directly under the title.
    pub chapters: BTreeMap<String, ChapterEntry>,
}

impl TitleIndex {
    /// Builds the index from a title's root structure node.
    #[must_use]
    pub fn build(root: &StructureNode) -> Self {
        let mut index = Self::default();
        for node in &root.children {
            let Some(id) = node.identifier.clone() else {
                continue;
            };
            if node.is("subtitle") {
                let chapters = node
                    .children
                    .iter()
                    .filter(|child| child.is("chapter"))
                    .filter_map(|child| {
                        child.identifier.clone().map(|chapter_id| (chapter_id, index_chapter(child)))
                    })
                    .collect();
                index.subtitles.insert(
                    id,
                    SubtitleEntry {
                        size: node.size(),
                        chapters,
                    },
                );
            } else if node.is("chapter") {
                index.chapters.insert(id, index_chapter(node));
            }
        }
        index
    }

    /// Returns true when the structure produced no lookups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subtitles.is_empty() && self.chapters.is_empty()
    }

    /// Chapter nested under a subtitle.
    #[must_use]
    pub fn subtitle_chapter(&self, subtitle: &str, chapter: &str) -> Option<&ChapterEntry> {
        self.subtitles.get(subtitle).and_then(|entry| entry.chapters.get(chapter))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Indexes a chapter node.
fn index_chapter(node: &StructureNode) -> ChapterEntry {
    let mut entry = ChapterEntry {
        size: node.size(),
        ..ChapterEntry::default()
    };
    for child in &node.children {
        if child.is("part") {
            insert_part(&mut entry.parts, child);
            continue;
        }
        match &child.identifier {
            Some(subchapter_id) => {
                let mut subchapter = SubchapterEntry {
                    size: child.size(),
                    parts: BTreeMap::new(),
                };
                for part in &child.children {
                    insert_part(&mut subchapter.parts, part);
                }
                entry.subchapters.insert(subchapter_id.clone(), subchapter);
            }
            None => {
                for part in &child.children {
                    insert_part(&mut entry.parts, part);
                }
            }
        }
    }
    entry
}

/// Records a part size unless the node is reserved or not a part.
fn insert_part(parts: &mut BTreeMap<String, u64>, node: &StructureNode) {
    if !node.is("part") || node.is_reserved() {
        return;
    }
    if let Some(id) = &node.identifier {
        parts.insert(id.clone(), node.size());
    }
}
