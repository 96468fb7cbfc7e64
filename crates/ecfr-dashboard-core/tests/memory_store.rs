// crates/ecfr-dashboard-core/tests/memory_store.rs
// ============================================================================
// Module: In-Memory Store Tests
// Description: Ordering, filtering, and paging of the in-memory store.
// Purpose: Keep the test double aligned with the SQL backends.
// ============================================================================

//! In-memory dashboard store tests.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use ecfr_dashboard_core::Agency;
use ecfr_dashboard_core::AgencyParams;
use ecfr_dashboard_core::AgencyQuery;
use ecfr_dashboard_core::CfrReference;
use ecfr_dashboard_core::CfrReferenceError;
use ecfr_dashboard_core::Correction;
use ecfr_dashboard_core::CorrectionParams;
use ecfr_dashboard_core::CorrectionQuery;
use ecfr_dashboard_core::DashboardStore;
use ecfr_dashboard_core::InMemoryDashboardStore;
use ecfr_dashboard_core::ReferenceErrorParams;
use ecfr_dashboard_core::ReferenceErrorQuery;
use ecfr_dashboard_core::SharedDashboardStore;
use ecfr_dashboard_core::StoreError;
use ecfr_dashboard_core::StructuredField;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn agency(name: &str, word_count: Option<u64>) -> Agency {
    Agency {
        name: name.to_string(),
        short_name: None,
        slug: None,
        word_count,
        sub_agencies: 1,
        cfr_references: StructuredField::Parsed(vec![CfrReference::title(7)]),
    }
}

fn correction(id: i64, agency_name: &str, corrected: Option<&str>) -> Correction {
    Correction {
        correction_id: id,
        agency_name: agency_name.to_string(),
        title: Some(7),
        corrective_action: None,
        error_corrected: corrected.map(str::to_string),
        error_occurred: None,
        fr_citation: None,
        last_modified: None,
    }
}

fn seeded() -> InMemoryDashboardStore {
    let store = InMemoryDashboardStore::new();
    store.upsert_agency(agency("Agricultural Marketing Service", Some(500))).unwrap();
    store.upsert_agency(agency("Bureau of Marketing Analysis", None)).unwrap();
    store.upsert_agency(agency("Coast Guard", Some(0))).unwrap();
    store.upsert_agency(agency("Defense Department", Some(900))).unwrap();
    store.insert_correction(correction(1, "Coast Guard", Some("2024-01-01"))).unwrap();
    store.insert_correction(correction(2, "Coast Guard", None)).unwrap();
    store.insert_correction(correction(3, "Defense Department", Some("2024-06-01"))).unwrap();
    store.insert_correction(correction(4, "Defense Department", Some("2024-06-01"))).unwrap();
    store
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn search_is_case_insensitive_substring() {
    let store = seeded();
    let query = AgencyQuery::from_params(&AgencyParams {
        search: Some("marketing".to_string()),
        ..AgencyParams::default()
    })
    .unwrap();
    let page = store.list_agencies(&query).unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|row| row.name.to_lowercase().contains("marketing")));
}

#[test]
fn word_count_sort_puts_unknown_last() {
    let store = seeded();
    let query = AgencyQuery::from_params(&AgencyParams {
        sort: Some("word_count".to_string()),
        ..AgencyParams::default()
    })
    .unwrap();
    let names: Vec<String> = store.list_agencies(&query).unwrap().items.into_iter().map(|a| a.name).collect();
    assert_eq!(
        names,
        vec![
            "Defense Department",
            "Agricultural Marketing Service",
            "Coast Guard",
            "Bureau of Marketing Analysis",
        ]
    );
}

#[test]
fn corrections_order_most_recent_first_with_nulls_last() {
    let store = seeded();
    let page = store.list_corrections(&CorrectionQuery::from_params(&CorrectionParams::default()).unwrap()).unwrap();
    let ids: Vec<i64> = page.items.iter().map(|row| row.correction_id).collect();
    assert_eq!(ids, vec![4, 3, 1, 2]);
    assert_eq!(page.total, 4);
}

#[test]
fn corrections_page_respects_window() {
    let store = seeded();
    let query = CorrectionQuery::from_params(&CorrectionParams {
        agency_name: None,
        limit: Some("2".to_string()),
        offset: Some("3".to_string()),
    })
    .unwrap();
    let page = store.list_corrections(&query).unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total, 4);
}

#[test]
fn metric_rows_count_corrections_with_zero_default() {
    let store = seeded();
    let rows = store.agency_metric_rows().unwrap();
    let ams = rows.iter().find(|row| row.name == "Agricultural Marketing Service").unwrap();
    let guard = rows.iter().find(|row| row.name == "Coast Guard").unwrap();
    assert_eq!(ams.correction_count, 0);
    assert_eq!(guard.correction_count, 2);
}

#[test]
fn error_log_sorts_by_allow_listed_column() {
    let store = InMemoryDashboardStore::new();
    for (id, name) in [(1, "Zeta"), (2, "Alpha"), (3, "Mid")] {
        store
            .insert_reference_error(CfrReferenceError {
                id,
                agency_name: name.to_string(),
                cfr_reference: StructuredField::Raw("{'title': 7}".to_string()),
                error_message: format!("Invalid title: {id}"),
                timestamp: Some("2025-01-01".to_string()),
            })
            .unwrap();
    }
    let query = ReferenceErrorQuery::from_params(&ReferenceErrorParams {
        sort: Some("agency_name".to_string()),
        direction: Some("desc".to_string()),
        ..ReferenceErrorParams::default()
    })
    .unwrap();
    let ids: Vec<i64> = store.list_reference_errors(&query).unwrap().items.iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![1, 3, 2]);
}

#[test]
fn injected_failure_surfaces_through_shared_wrapper() {
    let store = seeded();
    store.set_failure(Some(StoreError::Unavailable("offline".to_string()))).unwrap();
    let shared = SharedDashboardStore::from_store(store);
    assert_eq!(shared.metrics_report().unwrap_err(), StoreError::Unavailable("offline".to_string()));
}
