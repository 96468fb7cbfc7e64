// crates/ecfr-dashboard-core/tests/metrics.rs
// ============================================================================
// Module: Metrics Tests
// Description: Decile slicing, statistics, and ratio filtering.
// Purpose: Pin the aggregation rules behind the metrics report.
// ============================================================================

//! Metrics aggregation tests, including property-based decile checks.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::float_cmp,
    reason = "Test-only assertions and helpers are permitted."
)]

use ecfr_dashboard_core::AgencyMetricRow;
use ecfr_dashboard_core::MetricsReport;
use ecfr_dashboard_core::metrics::decile_take;
use ecfr_dashboard_core::metrics::top_correction_rates;
use ecfr_dashboard_core::metrics::top_sub_agency_ratios;
use ecfr_dashboard_core::metrics::word_count_deciles;
use ecfr_dashboard_core::metrics::word_count_stats;
use proptest::prelude::*;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn row(name: &str, word_count: Option<u64>, sub_agencies: u64, corrections: u64) -> AgencyMetricRow {
    AgencyMetricRow {
        name: name.to_string(),
        word_count,
        sub_agencies,
        correction_count: corrections,
    }
}

fn hundred_agencies() -> Vec<AgencyMetricRow> {
    (1 ..= 100).map(|i| row(&format!("Agency {i:03}"), Some(i * 10), 0, i)).collect()
}

// ============================================================================
// SECTION: Deciles
// ============================================================================

#[test]
fn hundred_agencies_report_five_largest_and_five_smallest() {
    let rows = hundred_agencies();
    let (top, bottom) = word_count_deciles(&rows);

    let top_counts: Vec<u64> = top.iter().map(|entry| entry.word_count).collect();
    let bottom_counts: Vec<u64> = bottom.iter().map(|entry| entry.word_count).collect();
    assert_eq!(top_counts, vec![1000, 990, 980, 970, 960]);
    assert_eq!(bottom_counts, vec![10, 20, 30, 40, 50]);
}

#[test]
fn small_inputs_report_one_row_per_decile() {
    let rows = vec![row("A", Some(5), 0, 0), row("B", Some(7), 0, 0), row("C", Some(1), 0, 0)];
    let (top, bottom) = word_count_deciles(&rows);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].name, "B");
    assert_eq!(bottom.len(), 1);
    assert_eq!(bottom[0].name, "C");
}

#[test]
fn null_word_counts_are_excluded_from_rankings() {
    let rows = vec![row("Known", Some(3), 0, 0), row("Unknown", None, 0, 4)];
    let (top, bottom) = word_count_deciles(&rows);
    assert_eq!(top[0].name, "Known");
    assert_eq!(bottom[0].name, "Known");
    let report = MetricsReport::from_rows(&rows, Vec::new());
    assert_eq!(report.top_corrections[0].name, "Unknown");
}

// ============================================================================
// SECTION: Statistics
// ============================================================================

#[test]
fn stats_match_population_formulas() {
    let rows: Vec<AgencyMetricRow> = [2, 4, 4, 4, 5, 5, 7, 9]
        .iter()
        .enumerate()
        .map(|(i, count)| row(&format!("A{i}"), Some(*count), 0, 0))
        .collect();
    let stats = word_count_stats(&rows);
    assert_eq!(stats.total_words, 40);
    assert_eq!(stats.mean_words, 5.0);
    assert_eq!(stats.std_dev_words, 2.0);
    assert_eq!(stats.agency_count, 8);
    // Index n / 2 of the ascending list, not the even-n midpoint.
    assert_eq!(stats.median_words, 5);
}

#[test]
fn stats_are_zero_without_word_counts() {
    let stats = word_count_stats(&[row("A", None, 0, 0)]);
    assert_eq!(stats.total_words, 0);
    assert_eq!(stats.mean_words, 0.0);
    assert_eq!(stats.median_words, 0);
    assert_eq!(stats.std_dev_words, 0.0);
    assert_eq!(stats.agency_count, 0);
}

// ============================================================================
// SECTION: Ratios
// ============================================================================

#[test]
fn zero_word_agencies_never_appear_in_ratio_lists() {
    let rows = vec![
        row("Empty", Some(0), 12, 40),
        row("Missing", None, 9, 30),
        row("Dense", Some(1000), 2, 5),
    ];
    let rates = top_correction_rates(&rows);
    let ratios = top_sub_agency_ratios(&rows);
    assert_eq!(rates.len(), 1);
    assert_eq!(rates[0].name, "Dense");
    assert_eq!(rates[0].corrections_per_1000_words, 5.0);
    assert_eq!(ratios.len(), 1);
    assert_eq!(ratios[0].sub_agencies_per_1000_words, 2.0);
}

#[test]
fn report_serializes_with_camel_case_sections() {
    let report = MetricsReport::from_rows(&hundred_agencies(), Vec::new());
    let value = serde_json::to_value(&report).unwrap();
    for key in [
        "topWordCount",
        "bottomWordCount",
        "wordCountStats",
        "topCorrections",
        "topCorrectionRates",
        "recentCorrections",
        "topSubAgencyRatios",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert!(value["wordCountStats"].get("total_words").is_some());
}

// ============================================================================
// SECTION: Properties
// ============================================================================

fn rows_strategy() -> impl Strategy<Value = Vec<AgencyMetricRow>> {
    prop::collection::vec((prop::option::of(0_u64 .. 1_000_000), 0_u64 .. 50, 0_u64 .. 200), 0 .. 150)
        .prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (words, subs, corrections))| row(&format!("Agency {i}"), words, subs, corrections))
                .collect()
        })
}

proptest! {
    #[test]
    fn decile_lists_are_bounded_and_extreme(rows in rows_strategy()) {
        let counted: Vec<u64> = rows.iter().filter_map(|r| r.word_count).collect();
        let (top, bottom) = word_count_deciles(&rows);
        prop_assert_eq!(top.len(), decile_take(counted.len()));
        prop_assert_eq!(bottom.len(), decile_take(counted.len()));
        prop_assert!(top.windows(2).all(|pair| pair[0].word_count >= pair[1].word_count));
        prop_assert!(bottom.windows(2).all(|pair| pair[0].word_count <= pair[1].word_count));
        if let Some(last_top) = top.last() {
            let above = counted.iter().filter(|count| **count > last_top.word_count).count();
            prop_assert!(above < top.len());
        }
    }

    #[test]
    fn ratio_lists_only_hold_positive_word_counts(rows in rows_strategy()) {
        let rates = top_correction_rates(&rows);
        let ratios = top_sub_agency_ratios(&rows);
        prop_assert!(rates.iter().all(|rate| rate.word_count > 0));
        prop_assert!(ratios.iter().all(|ratio| ratio.word_count > 0));
        let positive = rows.iter().filter(|r| r.word_count.unwrap_or(0) > 0).count();
        prop_assert_eq!(rates.len(), decile_take(positive));
    }

    #[test]
    fn stats_total_and_mean_are_consistent(rows in rows_strategy()) {
        let stats = word_count_stats(&rows);
        let counted: Vec<u64> = rows.iter().filter_map(|r| r.word_count).collect();
        prop_assert_eq!(stats.total_words, counted.iter().sum::<u64>());
        prop_assert_eq!(stats.agency_count, counted.len() as u64);
        if !counted.is_empty() {
            let expected = stats.total_words as f64 / counted.len() as f64;
            prop_assert!((stats.mean_words - expected).abs() < 1e-6);
            prop_assert!(stats.std_dev_words >= 0.0);
        }
    }
}
