mod common;

use campaign_dash::access::FixedIdentity;
use campaign_dash::cache::{DashboardCache, MemoryCacheBackend, dashboard_key};
use campaign_dash::cell::RawCell;
use campaign_dash::column::ColumnRef;
use campaign_dash::config::DashConfig;
use campaign_dash::dashboard::{
    DashboardResponse, DashboardService, SearchResponse, display_name,
};
use campaign_dash::error::DashError;
use campaign_dash::spreadsheet::{MemoryWorkbook, SourceTable, Workbook};
use common::{date, harness, harness_with_config, row, test_clock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

fn this_month(day: u32) -> RawCell {
    RawCell::Date(date(2026, 10, day))
}

fn acme_rows() -> Vec<Vec<RawCell>> {
    vec![
        row(
            "C-1",
            "Acme",
            "Meta",
            "Video",
            RawCell::Number(100.0),
            "Search",
            "Active",
            this_month(1),
            this_month(10),
        ),
        row(
            "C-2",
            "Acme",
            "Meta",
            "Video",
            RawCell::Number(50.0),
            "Display",
            "Active",
            this_month(5),
            this_month(25),
        ),
    ]
}

fn admin() -> FixedIdentity {
    FixedIdentity::new("admin@example.com")
}

fn expect_data(response: DashboardResponse) -> campaign_dash::dashboard::DashboardData {
    match response {
        DashboardResponse::Data(data) => data,
        DashboardResponse::Error { error } => panic!("unexpected error payload: {}", error),
    }
}

#[test]
fn dashboard_sums_acme_on_meta() {
    let h = harness(acme_rows());
    let data = expect_data(h.service.get_dashboard_data(&admin()));

    assert_eq!(data.charts.client_platform.cell("Acme", "Meta"), Some(150.0));
    assert_eq!(data.charts.status_counts.value("Active"), Some(2.0));
    assert_eq!(data.charts.ad_format_budget.value("Video"), Some(150.0));
    assert_eq!(data.clients, vec!["Acme"]);
    assert_eq!(data.user_name, "Admin");
    assert_eq!(data.user_role.as_deref(), Some("admin"));
    println!("✓ Acme/Meta = 150, Active = 2");
}

#[test]
fn second_read_is_served_from_cache() {
    let h = harness(acme_rows());
    let first = expect_data(h.service.get_dashboard_data(&admin()));
    let lookups = h.workbook.lookups();

    // change the sheet behind the cache's back
    let sheet = h.workbook.inner.sheet("Campaign Log").unwrap();
    sheet.write_cell(2, 5, RawCell::Number(1.0)).unwrap();

    let second = expect_data(h.service.get_dashboard_data(&admin()));
    assert_eq!(first.charts, second.charts);
    // only the permissions sheet is read again
    assert_eq!(h.workbook.lookups(), lookups + 1);

    h.clock.advance_secs(600);
    let third = expect_data(h.service.get_dashboard_data(&admin()));
    assert_eq!(third.charts.client_platform.cell("Acme", "Meta"), Some(51.0));
}

#[test]
fn role_is_resolved_per_caller_not_cached() {
    let h = harness(acme_rows());
    let admin_view = expect_data(h.service.get_dashboard_data(&admin()));
    let viewer_view = expect_data(
        h.service
            .get_dashboard_data(&FixedIdentity::new("viewer@example.com")),
    );
    let stranger = expect_data(
        h.service
            .get_dashboard_data(&FixedIdentity::new("who@else.org")),
    );

    assert_eq!(admin_view.user_role.as_deref(), Some("admin"));
    assert_eq!(viewer_view.user_role.as_deref(), Some("viewer"));
    assert_eq!(viewer_view.user_name, "Viewer");
    assert_eq!(stranger.user_role, None);
}

#[test]
fn missing_source_sheet_is_an_error_payload() {
    let config = DashConfig {
        source_sheet: "Nope".to_string(),
        ..DashConfig::default()
    };
    let h = harness_with_config(acme_rows(), config);

    match h.service.get_dashboard_data(&admin()) {
        DashboardResponse::Error { error } => assert!(error.contains("Nope")),
        DashboardResponse::Data(_) => panic!("expected an error payload"),
    }
    match h.service.search_campaign_by_type("search") {
        SearchResponse::Error { error } => assert!(error.contains("Nope")),
        SearchResponse::Results(_) => panic!("expected an error payload"),
    }

    let json = serde_json::to_value(h.service.get_dashboard_data(&admin())).unwrap();
    assert!(json.get("error").is_some());
}

#[test]
fn dashboard_payload_serializes_in_camel_case() {
    let h = harness(acme_rows());
    let json = serde_json::to_value(h.service.get_dashboard_data(&admin())).unwrap();
    assert!(json.get("userName").is_some());
    assert!(json.get("userRole").is_some());
    assert!(json["charts"].get("clientPlatform").is_some());
    assert!(json["charts"].get("campaignTypeDuration").is_some());
}

#[test]
fn blank_search_touches_nothing() {
    let h = harness(acme_rows());
    for query in ["", "   "] {
        let response = h.service.search_campaign_by_type(query);
        assert_eq!(response, SearchResponse::Results(Vec::new()));
    }
    assert_eq!(h.backend.calls(), 0);
    assert_eq!(h.workbook.lookups(), 0);
}

#[test]
fn search_matches_type_case_insensitively_newest_first() {
    let mut rows = acme_rows();
    rows.push(row(
        "C-3",
        "Bolt",
        "Google",
        "Image",
        RawCell::Number(10.0),
        "Paid Search",
        "Paused",
        RawCell::Date(date(2026, 11, 2)),
        RawCell::Date(date(2026, 11, 30)),
    ));
    rows.push(row(
        "C-4",
        "Bolt",
        "Google",
        "Image",
        RawCell::Number(10.0),
        "search",
        "Paused",
        RawCell::text("someday"),
        RawCell::Empty,
    ));
    let h = harness(rows);

    let response = h.service.search_campaign_by_type("  sEaRcH ");
    let results = response.results().unwrap();
    let ids: Vec<&str> = results.iter().map(|v| v.campaign_id.as_str()).collect();
    assert_eq!(ids, vec!["C-3", "C-1", "C-4"]);
    assert_eq!(results[0].start_date.as_deref(), Some("2026-11-02"));
    assert_eq!(results[1].end_date.as_deref(), Some("2026-10-10"));
    assert_eq!(results[2].start_date, None);
}

#[test]
fn search_results_are_capped() {
    let rows: Vec<Vec<RawCell>> = (0..12)
        .map(|i| {
            row(
                &format!("C-{}", i),
                "Acme",
                "Meta",
                "Video",
                RawCell::Number(1.0),
                "Search",
                "Active",
                this_month(1 + i),
                this_month(28),
            )
        })
        .collect();
    let config = DashConfig {
        search_limit: 5,
        ..DashConfig::default()
    };
    let h = harness_with_config(rows, config);

    let response = h.service.search_campaign_by_type("search");
    let results = response.results().unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(results[0].campaign_id, "C-11");
    assert_eq!(results[4].campaign_id, "C-7");
}

#[test]
fn search_results_are_cached_per_term() {
    let h = harness(acme_rows());
    h.service.search_campaign_by_type("search");
    let lookups = h.workbook.lookups();

    h.service.search_campaign_by_type("SEARCH");
    assert_eq!(h.workbook.lookups(), lookups);

    h.service.search_campaign_by_type("display");
    assert_eq!(h.workbook.lookups(), lookups + 1);

    h.clock.advance_secs(300);
    h.service.search_campaign_by_type("search");
    assert_eq!(h.workbook.lookups(), lookups + 2);
}

#[test]
fn admin_submission_writes_and_invalidates() {
    let h = harness(acme_rows());
    let before = expect_data(h.service.get_dashboard_data(&admin()));
    assert_eq!(before.charts.status_counts.value("Active"), Some(2.0));
    let stale = h.service.search_campaign_by_type("search");

    let outcome = h.service.submit_entry(&admin(), "  NEW-7 ").unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.message, "Code NEW-7 recorded in row 4");

    let sheet = h.workbook.inner.sheet("Campaign Log").unwrap();
    assert_eq!(sheet.read_range(4, 1, 1, 1).unwrap()[0][0], RawCell::from("NEW-7"));

    // both caches dropped: the next reads see the new row
    let lookups = h.workbook.lookups();
    h.service.get_dashboard_data(&admin());
    assert_eq!(h.workbook.lookups(), lookups + 2);
    let fresh = h.service.search_campaign_by_type("search");
    assert_eq!(h.workbook.lookups(), lookups + 3);
    assert_eq!(stale, fresh);
}

#[test]
fn submissions_append_one_after_another() {
    let h = harness(acme_rows());
    h.service.submit_entry(&admin(), "A").unwrap();
    let outcome = h.service.submit_entry(&admin(), "B").unwrap();
    assert_eq!(outcome.message, "Code B recorded in row 5");
}

#[test]
fn non_admins_cannot_submit() {
    let h = harness(acme_rows());
    h.service.get_dashboard_data(&admin());
    let calls = h.backend.calls();

    for who in [
        FixedIdentity::new("viewer@example.com"),
        FixedIdentity::new("nobody@example.com"),
        // role must match exactly, "ADMIN" is not "admin"
        FixedIdentity::new("shouty@example.com"),
        FixedIdentity::anonymous(),
    ] {
        let err = h.service.submit_entry(&who, "X-1").unwrap_err();
        assert!(matches!(err, DashError::PermissionDenied(_)));
    }

    let sheet = h.workbook.inner.sheet("Campaign Log").unwrap();
    assert_eq!(sheet.last_row_index(), 3);
    assert_eq!(h.backend.calls(), calls);
}

#[test]
fn blank_codes_are_invalid_input() {
    let h = harness(acme_rows());
    let err = h.service.submit_entry(&admin(), "   ").unwrap_err();
    assert!(matches!(err, DashError::InvalidInput(_)));
    let sheet = h.workbook.inner.sheet("Campaign Log").unwrap();
    assert_eq!(sheet.last_row_index(), 3);
}

#[test]
fn submission_without_source_is_not_found() {
    let h = harness(acme_rows());
    h.workbook.inner.remove_sheet("Campaign Log");
    let err = h.service.submit_entry(&admin(), "X").unwrap_err();
    assert!(matches!(err, DashError::SourceNotFound(_)));
}

#[test]
fn missing_permissions_sheet_fails_closed() {
    let h = harness(acme_rows());
    h.workbook.inner.remove_sheet("Permissions");

    assert!(!h.service.has_access(&admin()));
    let err = h.service.submit_entry(&admin(), "X").unwrap_err();
    assert!(matches!(err, DashError::PermissionDenied(_)));
    let data = expect_data(h.service.get_dashboard_data(&admin()));
    assert_eq!(data.user_role, None);
}

#[test]
fn any_role_grants_access() {
    let h = harness(acme_rows());
    assert!(h.service.has_access(&FixedIdentity::new("VIEWER@example.com")));
    assert!(h.service.has_access(&admin()));
    assert!(!h.service.has_access(&FixedIdentity::new("nobody@example.com")));
    assert!(!h.service.has_access(&FixedIdentity::anonymous()));
}

#[test]
fn concurrent_submissions_get_distinct_rows() {
    let clock = test_clock();
    let workbook = common::workbook_with(acme_rows());
    let cache = DashboardCache::new(Arc::new(MemoryCacheBackend::new(clock.clone())), clock.clone());
    let service = Arc::new(DashboardService::new(
        workbook.clone(),
        cache,
        clock,
        DashConfig::default(),
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service
                    .submit_entry(&admin(), &format!("T-{}", i))
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().success);
    }

    let sheet = workbook.sheet("Campaign Log").unwrap();
    assert_eq!(sheet.last_row_index(), 11);
    let mut codes: Vec<String> = sheet
        .read_range(4, 1, 8, 1)
        .unwrap()
        .into_iter()
        .map(|r| r[0].display())
        .collect();
    codes.sort();
    let expected: Vec<String> = (0..8).map(|i| format!("T-{}", i)).collect();
    assert_eq!(codes, expected);
}

#[test]
fn concurrent_readers_agree() {
    let h = harness(acme_rows());
    let service = Arc::new(h.service);
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || expect_data(service.get_dashboard_data(&admin())).charts)
        })
        .collect();
    let charts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(charts.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn dashboard_key_is_filled_after_a_read() {
    let clock = test_clock();
    let backend = Arc::new(MemoryCacheBackend::new(clock.clone()));
    let cache = DashboardCache::new(backend.clone(), clock.clone());
    let workbook: Arc<MemoryWorkbook> = common::workbook_with(acme_rows());
    let service = DashboardService::new(workbook, cache.clone(), clock, DashConfig::default());

    let key = dashboard_key(cache.search_epoch());
    assert!(cache.get_raw(&key).is_none());
    service.get_dashboard_data(&admin());
    assert!(cache.get_raw(&key).is_some());
}

/// Retires the cache epoch in the middle of the first campaign-sheet read,
/// the way a submission racing a dashboard read would.
struct WriterMidRead {
    inner: Arc<MemoryWorkbook>,
    cache: DashboardCache,
    fired: AtomicBool,
    source_reads: AtomicUsize,
}

impl Workbook for WriterMidRead {
    fn table(&self, name: &str) -> Option<Arc<dyn SourceTable>> {
        if name == "Campaign Log" {
            self.source_reads.fetch_add(1, Ordering::SeqCst);
            if !self.fired.swap(true, Ordering::SeqCst) {
                self.cache.invalidate_source();
            }
        }
        self.inner.table(name)
    }
}

#[test]
fn dashboard_computed_across_a_submission_is_not_served_later() {
    let clock = test_clock();
    let cache = DashboardCache::new(Arc::new(MemoryCacheBackend::new(clock.clone())), clock.clone());
    let workbook = Arc::new(WriterMidRead {
        inner: common::workbook_with(acme_rows()),
        cache: cache.clone(),
        fired: AtomicBool::new(false),
        source_reads: AtomicUsize::new(0),
    });
    let service = DashboardService::new(workbook.clone(), cache, clock, DashConfig::default());

    expect_data(service.get_dashboard_data(&admin()));
    assert_eq!(workbook.source_reads.load(Ordering::SeqCst), 1);

    // the first result belongs to the retired epoch, so this one recomputes
    expect_data(service.get_dashboard_data(&admin()));
    assert_eq!(workbook.source_reads.load(Ordering::SeqCst), 2);

    expect_data(service.get_dashboard_data(&admin()));
    assert_eq!(workbook.source_reads.load(Ordering::SeqCst), 2);
    println!("✓ Stale dashboard stayed out of the live epoch");
}

#[test]
fn expired_entries_do_not_pile_up_across_submissions() {
    let clock = test_clock();
    let backend = Arc::new(MemoryCacheBackend::new(clock.clone()));
    let cache = DashboardCache::new(backend.clone(), clock.clone());
    let service = DashboardService::new(
        common::workbook_with(acme_rows()),
        cache,
        clock.clone(),
        DashConfig::default(),
    );

    for i in 0..200 {
        service.search_campaign_by_type(&format!("term-{}", i));
        service.get_dashboard_data(&admin());
        service.submit_entry(&admin(), &format!("CODE-{}", i)).unwrap();
    }
    assert!(backend.len() >= 200);

    // past every dashboard, search and epoch TTL
    clock.advance_secs(7 * 60 * 60);
    service.search_campaign_by_type("search");
    assert!(
        backend.len() <= 3,
        "backend still holds {} entries",
        backend.len()
    );
    println!("✓ Backend shrank to {} entries", backend.len());
}

#[test]
fn misspelled_column_fails_validation() {
    let mut config = DashConfig::default();
    config.columns.client = ColumnRef::name("Clinet");
    let h = harness_with_config(acme_rows(), config);

    let err = h.service.validate().unwrap_err();
    assert!(matches!(err, DashError::UnresolvedColumn(_)));
    assert_eq!(h.backend.calls(), 0);
}

#[test]
fn validation_needs_the_campaign_sheet() {
    let h = harness(acme_rows());
    assert!(h.service.validate().is_ok());

    h.workbook.inner.remove_sheet("Campaign Log");
    let err = h.service.validate().unwrap_err();
    assert!(matches!(err, DashError::SourceNotFound(_)));
}

#[test]
fn display_names_come_from_the_local_part() {
    assert_eq!(display_name("jane.doe@example.com"), "Jane Doe");
    assert_eq!(display_name("max_power-jr@x.io"), "Max Power Jr");
    assert_eq!(display_name(""), "");
}
