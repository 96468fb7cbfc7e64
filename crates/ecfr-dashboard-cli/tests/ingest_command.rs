// crates/ecfr-dashboard-cli/tests/ingest_command.rs
// ============================================================================
// Module: Ingest Command Tests
// Description: End-to-end ingest from export files into a SQLite database.
// Purpose: Ensure exports on disk become queryable agencies and diagnostics.
// Dependencies: ecfr-dashboard-cli, ecfr-dashboard-store-sqlite, tempfile
// ============================================================================

//! ## Overview
//! Writes a tiny agency directory, title catalog, and one title structure to
//! a temporary directory, runs the ingest, and reads the result back through
//! the read-only store.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    missing_docs,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::fs;
use std::path::Path;

use ecfr_dashboard_cli::IngestError;
use ecfr_dashboard_cli::IngestSources;
use ecfr_dashboard_cli::prepare_ingest;
use ecfr_dashboard_cli::run_ingest;
use ecfr_dashboard_cli::structure_file_name;
use ecfr_dashboard_core::AgencyParams;
use ecfr_dashboard_core::AgencyQuery;
use ecfr_dashboard_core::DashboardStore;
use ecfr_dashboard_core::ReferenceErrorParams;
use ecfr_dashboard_core::ReferenceErrorQuery;
use ecfr_dashboard_store_sqlite::SqliteDashboardStore;
use ecfr_dashboard_store_sqlite::SqliteStoreConfig;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn write_json(path: &Path, value: &serde_json::Value) {
    fs::write(path, serde_json::to_vec(value).unwrap()).unwrap();
}

fn write_exports(dir: &TempDir) -> IngestSources {
    let agencies = dir.path().join("agencies.json");
    let titles = dir.path().join("titles.json");
    let structures = dir.path().join("structures");
    fs::create_dir(&structures).unwrap();
    write_json(
        &agencies,
        &json!({
            "agencies": [
                {
                    "display_name": "Department of Agriculture",
                    "short_name": "USDA",
                    "slug": "agriculture-department",
                    "cfr_references": [ { "title": 7, "chapter": "I" } ],
                    "children": [
                        {
                            "display_name": "Agricultural Marketing Service",
                            "cfr_references": [ { "title": 7, "chapter": "I", "part": "30" } ]
                        }
                    ]
                },
                {
                    "display_name": "Coast Guard",
                    "cfr_references": [ { "title": 33, "chapter": "I" } ]
                }
            ]
        }),
    );
    write_json(
        &titles,
        &json!({
            "titles": [
                { "number": 7, "latest_amended_on": "2025-01-02" },
                { "number": 33, "latest_amended_on": "2025-01-03" }
            ]
        }),
    );
    write_json(
        &structures.join(structure_file_name(7)),
        &json!({
            "type": "title",
            "identifier": "7",
            "children": [
                {
                    "type": "chapter",
                    "identifier": "I",
                    "size": 600,
                    "children": [ { "type": "part", "identifier": "30", "size": 75 } ]
                }
            ]
        }),
    );
    IngestSources {
        agencies,
        titles,
        structures,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn prepare_counts_titles_without_structure() {
    let dir = TempDir::new().unwrap();
    let sources = write_exports(&dir);
    let prepared = prepare_ingest(&sources, "2025-02-01").unwrap();
    assert_eq!(prepared.titles_indexed, 1);
    assert_eq!(prepared.titles_missing, 1);
    assert_eq!(prepared.report.agencies.len(), 3);
    assert_eq!(prepared.report.errors.len(), 1);
}

#[test]
fn ingest_writes_queryable_database() {
    let dir = TempDir::new().unwrap();
    let sources = write_exports(&dir);
    let database = SqliteStoreConfig::new(dir.path().join("ecfr.db"));

    let summary = run_ingest(&sources, &database, "2025-02-01").unwrap();
    assert_eq!(summary.titles_indexed, 1);
    assert_eq!(summary.titles_missing, 1);
    assert_eq!(summary.written.agencies, 3);
    assert_eq!(summary.written.errors, 1);

    let store = SqliteDashboardStore::open(&database).unwrap();
    let agencies =
        store.list_agencies(&AgencyQuery::from_params(&AgencyParams::default()).unwrap()).unwrap();
    let names: Vec<&str> = agencies.items.iter().map(|agency| agency.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Agricultural Marketing Service", "Coast Guard", "Department of Agriculture"]
    );
    assert_eq!(agencies.items[0].word_count, Some(75));
    assert_eq!(agencies.items[2].word_count, Some(600));
    assert_eq!(agencies.items[2].sub_agencies, 1);

    let errors = store
        .list_reference_errors(
            &ReferenceErrorQuery::from_params(&ReferenceErrorParams::default()).unwrap(),
        )
        .unwrap();
    assert_eq!(errors.total, 1);
    assert_eq!(errors.items[0].agency_name, "Coast Guard");
    assert_eq!(errors.items[0].error_message, "No structure data for title 33, date 2025-01-03");
    assert_eq!(errors.items[0].timestamp.as_deref(), Some("2025-02-01"));
}

#[test]
fn reingest_replaces_previous_diagnostics() {
    let dir = TempDir::new().unwrap();
    let sources = write_exports(&dir);
    let database = SqliteStoreConfig::new(dir.path().join("ecfr.db"));
    run_ingest(&sources, &database, "2025-02-01").unwrap();
    run_ingest(&sources, &database, "2025-02-02").unwrap();

    let store = SqliteDashboardStore::open(&database).unwrap();
    let errors = store
        .list_reference_errors(
            &ReferenceErrorQuery::from_params(&ReferenceErrorParams::default()).unwrap(),
        )
        .unwrap();
    assert_eq!(errors.total, 1);
    assert_eq!(errors.items[0].timestamp.as_deref(), Some("2025-02-02"));
}

#[test]
fn malformed_export_reports_parse_error() {
    let dir = TempDir::new().unwrap();
    let sources = write_exports(&dir);
    fs::write(&sources.titles, b"{\"titles\": 7").unwrap();
    match prepare_ingest(&sources, "2025-02-01") {
        Err(IngestError::Parse {
            path, ..
        }) => assert!(path.ends_with("titles.json")),
        other => panic!("expected parse error, got {other:?}"),
    }
}
