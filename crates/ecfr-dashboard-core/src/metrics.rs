// crates/ecfr-dashboard-core/src/metrics.rs
// ============================================================================
// Module: Dashboard Metrics
// Description: Decile rankings and descriptive statistics over agencies.
// Purpose: Compute the metrics report in-process from per-agency rows.
// Dependencies: serde, crate::model
// ============================================================================

//! ## Overview
//! Metrics are derived per request from a single fetch of
//! [`AgencyMetricRow`] values plus the most recent corrections. Nothing here
//! is persisted.
//!
//! Rankings take the top (or bottom) decile, `ceil(n / 10)` rows, and report
//! at most [`DECILE_DISPLAY_LIMIT`] of them. Ratio metrics divide by the word
//! count, so rows with a missing or zero word count are dropped first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;

use crate::model::AgencyMetricRow;
use crate::model::Correction;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum rows reported from any decile.
pub const DECILE_DISPLAY_LIMIT: usize = 5;
/// Number of recent corrections included in the report.
pub const RECENT_CORRECTIONS_LIMIT: u32 = 5;

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Agency name with its word count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyWordCount {
    /// Agency name.
    pub name: String,
    /// Words attributed to the agency.
    pub word_count: u64,
}

/// Descriptive statistics over agency word counts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WordCountStats {
    /// Sum of word counts.
    pub total_words: u64,
    /// Arithmetic mean.
    pub mean_words: f64,
    /// Element at index `n / 2` of the ascending list.
    pub median_words: u64,
    /// Population standard deviation.
    pub std_dev_words: f64,
    /// Agencies with a known word count.
    pub agency_count: u64,
}

/// Agency name with its correction count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionMetric {
    /// Agency name.
    pub name: String,
    /// Corrections recorded for the agency.
    pub correction_count: u64,
}

/// Corrections normalized by regulation size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRate {
    /// Agency name.
    pub name: String,
    /// Words attributed to the agency (always > 0).
    pub word_count: u64,
    /// Corrections recorded for the agency.
    pub correction_count: u64,
    /// `correction_count * 1000 / word_count`.
    pub corrections_per_1000_words: f64,
}

/// Sub-agencies normalized by regulation size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAgencyRatio {
    /// Agency name.
    pub name: String,
    /// Words attributed to the agency (always > 0).
    pub word_count: u64,
    /// Direct sub-agencies.
    pub sub_agencies: u64,
    /// `sub_agencies * 1000 / word_count`.
    pub sub_agencies_per_1000_words: f64,
}

/// Response body of `GET /api/metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    /// Largest agencies by word count.
    pub top_word_count: Vec<AgencyWordCount>,
    /// Smallest agencies by word count, smallest first.
    pub bottom_word_count: Vec<AgencyWordCount>,
    /// Word count statistics.
    pub word_count_stats: WordCountStats,
    /// Agencies with the most corrections.
    pub top_corrections: Vec<CorrectionMetric>,
    /// Agencies with the highest correction rate.
    pub top_correction_rates: Vec<CorrectionRate>,
    /// Most recently corrected entries.
    pub recent_corrections: Vec<Correction>,
    /// Agencies with the highest sub-agency ratio.
    pub top_sub_agency_ratios: Vec<SubAgencyRatio>,
}

impl MetricsReport {
    /// Builds the report from per-agency rows and recent corrections.
    #[must_use]
    pub fn from_rows(rows: &[AgencyMetricRow], recent_corrections: Vec<Correction>) -> Self {
        let (top_word_count, bottom_word_count) = word_count_deciles(rows);
        Self {
            top_word_count,
            bottom_word_count,
            word_count_stats: word_count_stats(rows),
            top_corrections: top_corrections(rows),
            top_correction_rates: top_correction_rates(rows),
            recent_corrections,
            top_sub_agency_ratios: top_sub_agency_ratios(rows),
        }
    }
}

// ============================================================================
// SECTION: Aggregations
// ============================================================================

/// Size of one decile of `n` rows.
#[must_use]
pub const fn decile_size(n: usize) -> usize {
    n.div_ceil(10)
}

/// Number of rows reported from a decile of `n` rows.
#[must_use]
pub fn decile_take(n: usize) -> usize {
    decile_size(n).min(DECILE_DISPLAY_LIMIT)
}

/// Top and bottom word-count deciles over rows with a known word count.
#[must_use]
pub fn word_count_deciles(
    rows: &[AgencyMetricRow],
) -> (Vec<AgencyWordCount>, Vec<AgencyWordCount>) {
    let mut counted: Vec<AgencyWordCount> = rows
        .iter()
        .filter_map(|row| {
            row.word_count.map(|word_count| AgencyWordCount {
                name: row.name.clone(),
                word_count,
            })
        })
        .collect();
    let take = decile_take(counted.len());

    counted.sort_by(|a, b| b.word_count.cmp(&a.word_count).then_with(|| a.name.cmp(&b.name)));
    let top = counted.iter().take(take).cloned().collect();

    counted.sort_by(|a, b| a.word_count.cmp(&b.word_count).then_with(|| a.name.cmp(&b.name)));
    counted.truncate(take);
    (top, counted)
}

/// Descriptive statistics over rows with a known word count.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Word counts stay well below 2^53.")]
pub fn word_count_stats(rows: &[AgencyMetricRow]) -> WordCountStats {
    let mut counts: Vec<u64> = rows.iter().filter_map(|row| row.word_count).collect();
    if counts.is_empty() {
        return WordCountStats::default();
    }
    counts.sort_unstable();
    let total_words: u64 = counts.iter().sum();
    let count = counts.len() as f64;
    let mean_words = total_words as f64 / count;
    let variance = counts
        .iter()
        .map(|value| {
            let delta = *value as f64 - mean_words;
            delta * delta
        })
        .sum::<f64>()
        / count;
    WordCountStats {
        total_words,
        mean_words,
        median_words: counts[counts.len() / 2],
        std_dev_words: variance.sqrt(),
        agency_count: counts.len() as u64,
    }
}

/// Agencies with the most corrections (top decile).
#[must_use]
pub fn top_corrections(rows: &[AgencyMetricRow]) -> Vec<CorrectionMetric> {
    let mut ranked: Vec<CorrectionMetric> = rows
        .iter()
        .map(|row| CorrectionMetric {
            name: row.name.clone(),
            correction_count: row.correction_count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.correction_count.cmp(&a.correction_count).then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(decile_take(ranked.len()));
    ranked
}

/// Agencies with the highest corrections per 1000 words (top decile).
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Counts stay well below 2^53.")]
pub fn top_correction_rates(rows: &[AgencyMetricRow]) -> Vec<CorrectionRate> {
    let mut ranked: Vec<CorrectionRate> = rows
        .iter()
        .filter_map(|row| {
            let word_count = row.word_count.filter(|count| *count > 0)?;
            Some(CorrectionRate {
                name: row.name.clone(),
                word_count,
                correction_count: row.correction_count,
                corrections_per_1000_words: per_thousand(row.correction_count, word_count),
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        descending(a.corrections_per_1000_words, b.corrections_per_1000_words)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(decile_take(ranked.len()));
    ranked
}

/// Agencies with the highest sub-agencies per 1000 words (top decile).
#[must_use]
pub fn top_sub_agency_ratios(rows: &[AgencyMetricRow]) -> Vec<SubAgencyRatio> {
    let mut ranked: Vec<SubAgencyRatio> = rows
        .iter()
        .filter_map(|row| {
            let word_count = row.word_count.filter(|count| *count > 0)?;
            Some(SubAgencyRatio {
                name: row.name.clone(),
                word_count,
                sub_agencies: row.sub_agencies,
                sub_agencies_per_1000_words: per_thousand(row.sub_agencies, word_count),
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        descending(a.sub_agencies_per_1000_words, b.sub_agencies_per_1000_words)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(decile_take(ranked.len()));
    ranked
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// `numerator * 1000 / word_count` in floating point.
#[allow(clippy::cast_precision_loss, reason = "Counts stay well below 2^53.")]
fn per_thousand(numerator: u64, word_count: u64) -> f64 {
    numerator as f64 * 1000.0 / word_count as f64
}

/// Total ordering for descending floats.
fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
