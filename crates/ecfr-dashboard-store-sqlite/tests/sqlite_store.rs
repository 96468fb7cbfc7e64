// crates/ecfr-dashboard-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Dashboard Store Tests
// Description: Queries against a populated temporary database file.
// Purpose: Ensure filtering, ordering, paging, and metrics over real SQL.
// Dependencies: ecfr-dashboard-store-sqlite, ecfr-dashboard-core, tempfile
// ============================================================================

//! ## Overview
//! Integration tests for the read-only `SQLite` store. Each test writes a
//! fixture database with [`SqliteDashboardWriter`] and reopens it read-only.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    missing_docs,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use ecfr_dashboard_core::Agency;
use ecfr_dashboard_core::AgencyParams;
use ecfr_dashboard_core::AgencyQuery;
use ecfr_dashboard_core::CfrReference;
use ecfr_dashboard_core::Correction;
use ecfr_dashboard_core::CorrectionParams;
use ecfr_dashboard_core::CorrectionQuery;
use ecfr_dashboard_core::DashboardStore;
use ecfr_dashboard_core::ReferenceErrorParams;
use ecfr_dashboard_core::ReferenceErrorQuery;
use ecfr_dashboard_core::StoreError;
use ecfr_dashboard_core::StructuredField;
use ecfr_dashboard_core::ingest::AgencyRecord;
use ecfr_dashboard_core::ingest::IngestReport;
use ecfr_dashboard_core::ingest::ReferenceErrorRecord;
use ecfr_dashboard_store_sqlite::SqliteDashboardStore;
use ecfr_dashboard_store_sqlite::SqliteDashboardWriter;
use ecfr_dashboard_store_sqlite::SqliteStoreConfig;
use proptest::prelude::*;
use rusqlite::Connection;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const AGENCY_NAMES: [&str; 20] = [
    "Agricultural Marketing Service",
    "Animal and Plant Health Inspection Service",
    "Bureau of Industry and Security",
    "Coast Guard",
    "Commodity Credit Corporation",
    "Consumer Product Safety Commission",
    "Defense Department",
    "Education Department",
    "Energy Department",
    "Environmental Protection Agency",
    "Farm Credit Administration",
    "Federal Aviation Administration",
    "Federal Communications Commission",
    "Food and Drug Administration",
    "Forest Service",
    "Internal Revenue Service",
    "Marketing Order Administration Branch",
    "National Park Service",
    "Rural Housing Service",
    "Small Business Administration",
];

fn agency(name: &str, word_count: Option<u64>, sub_agencies: u64) -> Agency {
    Agency {
        name: name.to_string(),
        short_name: Some(name.split_whitespace().map(|w| &w[.. 1]).collect()),
        slug: Some(name.to_lowercase().replace(' ', "-")),
        word_count,
        sub_agencies,
        cfr_references: StructuredField::Parsed(vec![CfrReference::title(7)]),
    }
}

fn correction(id: i64, agency_name: &str, corrected: &str) -> Correction {
    Correction {
        correction_id: id,
        agency_name: agency_name.to_string(),
        title: Some(7),
        corrective_action: Some("Corrected amendatory instruction".to_string()),
        error_corrected: Some(corrected.to_string()),
        error_occurred: Some("2023-01-01".to_string()),
        fr_citation: Some(format!("89 FR {id}")),
        last_modified: None,
    }
}

/// Writes 20 agencies (word counts 0, 100, ..., 1900) and 5 corrections.
fn populate(path: &Path) -> SqliteStoreConfig {
    let config = SqliteStoreConfig::new(path);
    let writer = SqliteDashboardWriter::open(&config).unwrap();
    for (i, name) in AGENCY_NAMES.iter().enumerate() {
        let i = i as u64;
        writer.upsert_agency(&agency(name, Some(i * 100), i % 3)).unwrap();
    }
    writer.insert_correction(&correction(1, "Coast Guard", "2024-01-15")).unwrap();
    writer.insert_correction(&correction(2, "Coast Guard", "2024-03-02")).unwrap();
    writer.insert_correction(&correction(3, "Forest Service", "2023-11-30")).unwrap();
    writer.insert_correction(&correction(4, "Energy Department", "2024-05-20")).unwrap();
    writer.insert_correction(&correction(5, "Education Department", "2024-02-10")).unwrap();
    drop(writer);
    config
}

fn open_fixture() -> (TempDir, SqliteDashboardStore) {
    let temp = TempDir::new().unwrap();
    let config = populate(&temp.path().join("ecfr.db"));
    let store = SqliteDashboardStore::open(&config).unwrap();
    (temp, store)
}

fn agency_query(search: Option<&str>, sort: Option<&str>, limit: &str, offset: &str) -> AgencyQuery {
    AgencyQuery::from_params(&AgencyParams {
        search: search.map(str::to_string),
        sort: sort.map(str::to_string),
        limit: Some(limit.to_string()),
        offset: Some(offset.to_string()),
    })
    .unwrap()
}

// ============================================================================
// SECTION: Open
// ============================================================================

#[test]
fn missing_database_is_unavailable() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(temp.path().join("absent.db"));
    let err = SqliteDashboardStore::open(&config).err().unwrap();
    assert!(matches!(StoreError::from(err), StoreError::Unavailable(_)));
}

#[test]
fn database_without_tables_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("empty.db");
    std::fs::write(&path, b"").unwrap();
    let err = SqliteDashboardStore::open(&SqliteStoreConfig::new(&path)).err().unwrap();
    assert!(err.to_string().contains("missing table"));
}

// ============================================================================
// SECTION: Agencies
// ============================================================================

#[test]
fn search_marketing_matches_case_insensitively() {
    let (_temp, store) = open_fixture();
    let page = store.list_agencies(&agency_query(Some("MARKETING"), None, "20", "0")).unwrap();
    let names: Vec<&str> = page.items.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(page.total, 2);
    assert_eq!(names, vec!["Agricultural Marketing Service", "Marketing Order Administration Branch"]);

    let temp = TempDir::new().unwrap();
    let config = populate(&temp.path().join("accented.db"));
    let writer = SqliteDashboardWriter::open(&config).unwrap();
    let mut accented = agency("Office of Elan Affairs", Some(50), 0);
    accented.name = "Office of Élan Affairs".to_string();
    writer.upsert_agency(&accented).unwrap();
    drop(writer);
    let store = SqliteDashboardStore::open(&config).unwrap();
    for term in ["Élan", "élan", "ÉLAN"] {
        let page = store.list_agencies(&agency_query(Some(term), None, "20", "0")).unwrap();
        assert_eq!(page.total, 1, "search {term}");
        assert_eq!(page.items[0].name, "Office of Élan Affairs");
    }
}

#[test]
fn search_treats_wildcards_literally() {
    let (_temp, store) = open_fixture();
    let page = store.list_agencies(&agency_query(Some("%"), None, "20", "0")).unwrap();
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
}

#[test]
fn word_count_sort_is_descending_and_keeps_zero_rows() {
    let (_temp, store) = open_fixture();
    let page = store.list_agencies(&agency_query(None, Some("word_count"), "100", "0")).unwrap();
    assert_eq!(page.total, 20);
    assert_eq!(page.items.first().unwrap().word_count, Some(1900));
    assert_eq!(page.items.last().unwrap().word_count, Some(0));
}

#[test]
fn raw_reference_text_is_preserved() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(temp.path().join("raw.db"));
    let writer = SqliteDashboardWriter::open(&config).unwrap();
    let mut legacy = agency("Legacy Board", None, 0);
    legacy.cfr_references = StructuredField::Raw("[{'title': 7, 'chapter': 'I'}]".to_string());
    writer.upsert_agency(&legacy).unwrap();
    drop(writer);

    let store = SqliteDashboardStore::open(&config).unwrap();
    let page = store.list_agencies(&agency_query(None, None, "10", "0")).unwrap();
    assert_eq!(
        page.items[0].cfr_references,
        StructuredField::Raw("[{'title': 7, 'chapter': 'I'}]".to_string())
    );
    assert_eq!(page.items[0].word_count, None);
}

// ============================================================================
// SECTION: Corrections
// ============================================================================

#[test]
fn corrections_filter_by_exact_agency() {
    let (_temp, store) = open_fixture();
    let query = CorrectionQuery::from_params(&CorrectionParams {
        agency_name: Some("Coast Guard".to_string()),
        ..CorrectionParams::default()
    })
    .unwrap();
    let page = store.list_corrections(&query).unwrap();
    let ids: Vec<i64> = page.items.iter().map(|c| c.correction_id).collect();
    assert_eq!(page.total, 2);
    assert_eq!(ids, vec![2, 1]);

    let partial = CorrectionQuery::from_params(&CorrectionParams {
        agency_name: Some("Coast".to_string()),
        ..CorrectionParams::default()
    })
    .unwrap();
    assert_eq!(store.list_corrections(&partial).unwrap().total, 0);
}

#[test]
fn corrections_with_null_agency_decode_as_empty_name() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("external.db");
    let connection = Connection::open(&path).unwrap();
    connection
        .execute_batch(
            "CREATE TABLE agencies (name TEXT PRIMARY KEY, short_name TEXT, slug TEXT,
                 cfr_references TEXT, sub_agencies INTEGER, word_count INTEGER);
             CREATE TABLE agency_corrections (correction_id INTEGER PRIMARY KEY, agency_name TEXT,
                 title INTEGER, corrective_action TEXT, error_corrected TEXT, error_occurred TEXT,
                 fr_citation TEXT, last_modified TEXT);
             CREATE TABLE cfr_reference_errors (id INTEGER PRIMARY KEY, agency_name TEXT,
                 cfr_reference TEXT, error_message TEXT, timestamp TEXT);
             INSERT INTO agency_corrections (correction_id, agency_name, error_corrected)
                 VALUES (9, NULL, '2024-06-01');",
        )
        .unwrap();
    drop(connection);

    let store = SqliteDashboardStore::open(&SqliteStoreConfig::new(&path)).unwrap();
    let page = store.list_corrections(&CorrectionQuery::from_params(&CorrectionParams::default()).unwrap()).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].correction_id, 9);
    assert_eq!(page.items[0].agency_name, "");
    let recent = store.recent_corrections(5).unwrap();
    assert_eq!(recent[0].agency_name, "");
}

// ============================================================================
// SECTION: Metrics
// ============================================================================

#[test]
fn metrics_report_has_five_recent_corrections_in_descending_order() {
    let (_temp, store) = open_fixture();
    let report = store.metrics_report().unwrap();
    let dates: Vec<&str> = report
        .recent_corrections
        .iter()
        .map(|c| c.error_corrected.as_deref().unwrap())
        .collect();
    assert_eq!(dates.len(), 5);
    assert!(dates.windows(2).all(|pair| pair[0] > pair[1]));
}

#[test]
fn metrics_exclude_zero_word_agencies_from_rates() {
    let (_temp, store) = open_fixture();
    let rows = store.agency_metric_rows().unwrap();
    assert_eq!(rows.len(), 20);
    let guard = rows.iter().find(|row| row.name == "Coast Guard").unwrap();
    assert_eq!(guard.correction_count, 2);

    let report = store.metrics_report().unwrap();
    assert!(report.top_correction_rates.iter().all(|rate| rate.word_count > 0));
    assert!(report.top_sub_agency_ratios.iter().all(|ratio| ratio.word_count > 0));
    assert_eq!(report.word_count_stats.total_words, (0 .. 20).map(|i| i * 100).sum::<u64>());
    assert_eq!(report.top_word_count[0].word_count, 1900);
    assert_eq!(report.bottom_word_count[0].word_count, 0);
}

// ============================================================================
// SECTION: Reference Errors
// ============================================================================

fn ingest_report(date: &str, messages: &[(&str, &str)]) -> IngestReport {
    IngestReport {
        date: date.to_string(),
        agencies: vec![AgencyRecord {
            name: "Coast Guard".to_string(),
            short_name: Some("USCG".to_string()),
            slug: Some("coast-guard".to_string()),
            cfr_references: vec![json!({"title": 33, "chapter": "I"})],
            sub_agencies: 0,
            word_count: 4200,
        }],
        errors: messages
            .iter()
            .map(|(agency, message)| ReferenceErrorRecord {
                agency_name: (*agency).to_string(),
                cfr_reference: json!({"title": 33, "part": "999"}),
                error_message: (*message).to_string(),
            })
            .collect(),
    }
}

#[test]
fn ingest_report_replaces_error_log_and_upserts_agencies() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ecfr.db");
    let config = populate(&path);
    let mut writer = SqliteDashboardWriter::open(&config).unwrap();
    writer.write_ingest_report(&ingest_report("2025-01-01", &[("Coast Guard", "stale")])).unwrap();
    let counts = writer
        .write_ingest_report(&ingest_report(
            "2025-02-01",
            &[("Coast Guard", "Part 999 not found"), ("Forest Service", "Invalid title: null")],
        ))
        .unwrap();
    assert_eq!(counts.errors, 2);
    drop(writer);

    let store = SqliteDashboardStore::open(&config).unwrap();
    let all = ReferenceErrorQuery::from_params(&ReferenceErrorParams::default()).unwrap();
    let page = store.list_reference_errors(&all).unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|row| row.timestamp.as_deref() == Some("2025-02-01")));
    assert_eq!(page.items[0].cfr_reference.parsed().and_then(|r| r.part.as_deref()), Some("999"));

    let agencies = store.list_agencies(&agency_query(Some("coast"), None, "5", "0")).unwrap();
    assert_eq!(agencies.items[0].word_count, Some(4200));
    assert_eq!(agencies.items[0].short_name.as_deref(), Some("USCG"));
}

#[test]
fn error_log_filters_sorts_and_pages() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(temp.path().join("errors.db"));
    let writer = SqliteDashboardWriter::open(&config).unwrap();
    for i in 0 .. 25 {
        let agency = if i % 2 == 0 { "Coast Guard" } else { "Forest Service" };
        let message = if i % 5 == 0 { format!("Invalid title: {i}") } else { format!("Part {i} not found") };
        writer.record_reference_error(agency, "{not json", &message, Some("2025-01-01")).unwrap();
    }
    drop(writer);
    let store = SqliteDashboardStore::open(&config).unwrap();

    let filtered = ReferenceErrorQuery::from_params(&ReferenceErrorParams {
        agency_name: Some("coast".to_string()),
        error_message: Some("INVALID".to_string()),
        ..ReferenceErrorParams::default()
    })
    .unwrap();
    let page = store.list_reference_errors(&filtered).unwrap();
    // i in {0, 10, 20}
    assert_eq!(page.total, 3);
    assert!(page.items.iter().all(|row| row.cfr_reference.is_raw()));

    let sorted = ReferenceErrorQuery::from_params(&ReferenceErrorParams {
        sort: Some("agency_name".to_string()),
        direction: Some("desc".to_string()),
        page: Some("3".to_string()),
        ..ReferenceErrorParams::default()
    })
    .unwrap();
    let page = store.list_reference_errors(&sorted).unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.items.len(), 5);
    assert!(page.items.iter().all(|row| row.agency_name == "Coast Guard"));
}

#[test]
fn error_log_filters_fold_non_ascii_case() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(temp.path().join("accented-errors.db"));
    let writer = SqliteDashboardWriter::open(&config).unwrap();
    writer
        .record_reference_error("Office of Élan Affairs", "{}", "Chapter Ⅸ not found", Some("2025-01-01"))
        .unwrap();
    writer.record_reference_error("Coast Guard", "{}", "Part 9 not found", Some("2025-01-01")).unwrap();
    drop(writer);
    let store = SqliteDashboardStore::open(&config).unwrap();

    let query = ReferenceErrorQuery::from_params(&ReferenceErrorParams {
        agency_name: Some("ÉLAN".to_string()),
        ..ReferenceErrorParams::default()
    })
    .unwrap();
    let page = store.list_reference_errors(&query).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].agency_name, "Office of Élan Affairs");

    let query = ReferenceErrorQuery::from_params(&ReferenceErrorParams {
        error_message: Some("chapter ⅸ".to_string()),
        ..ReferenceErrorParams::default()
    })
    .unwrap();
    assert_eq!(store.list_reference_errors(&query).unwrap().total, 1);
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn agency_pages_never_exceed_limit(limit in 1_u32 ..= 30, offset in 0_u64 .. 30) {
        let (_temp, store) = open_fixture();
        let query = agency_query(None, None, &limit.to_string(), &offset.to_string());
        let page = store.list_agencies(&query).unwrap();
        let expected = 20_u64.saturating_sub(offset).min(u64::from(limit));
        prop_assert_eq!(page.total, 20);
        prop_assert_eq!(page.items.len() as u64, expected);
        if let Some(first) = page.items.first() {
            let mut sorted = AGENCY_NAMES.to_vec();
            sorted.sort_unstable();
            prop_assert_eq!(first.name.as_str(), sorted[usize::try_from(offset).unwrap()]);
        }
    }
}
