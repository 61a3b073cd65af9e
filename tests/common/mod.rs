#![allow(dead_code)]

use campaign_dash::cache::{CacheBackend, DashboardCache, MemoryCacheBackend};
use campaign_dash::cell::RawCell;
use campaign_dash::clock::{Clock, ManualClock};
use campaign_dash::config::DashConfig;
use campaign_dash::dashboard::DashboardService;
use campaign_dash::error::DashResult;
use campaign_dash::spreadsheet::{MemorySheet, MemoryWorkbook, SourceTable, Workbook};
use campaign_dash::table::CampaignRecord;
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const HEADER: [&str; 11] = [
    "Campaign ID",
    "Client",
    "Platform",
    "Ad Format",
    "Budget",
    "Campaign Type",
    "Status",
    "Start Date",
    "End Date",
    "Remarks",
    "Guide Link",
];

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Fixed "now" for every test: mid-October 2026.
pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap(),
    ))
}

pub fn header_row() -> Vec<RawCell> {
    HEADER.iter().map(|h| RawCell::from(*h)).collect()
}

/// A source row in header order.
#[allow(clippy::too_many_arguments)]
pub fn row(
    id: &str,
    client: &str,
    platform: &str,
    ad_format: &str,
    budget: RawCell,
    campaign_type: &str,
    status: &str,
    start: RawCell,
    end: RawCell,
) -> Vec<RawCell> {
    vec![
        id.into(),
        client.into(),
        platform.into(),
        ad_format.into(),
        budget,
        campaign_type.into(),
        status.into(),
        start,
        end,
        "".into(),
        "".into(),
    ]
}

pub fn permissions_sheet() -> MemorySheet {
    MemorySheet::from_rows(vec![
        vec!["Email".into(), "Role".into()],
        vec!["Admin@Example.com".into(), "admin".into()],
        vec!["viewer@example.com".into(), "viewer".into()],
        vec!["shouty@example.com".into(), "ADMIN".into()],
    ])
}

pub fn workbook_with(rows: Vec<Vec<RawCell>>) -> Arc<MemoryWorkbook> {
    let config = DashConfig::default();
    let workbook = MemoryWorkbook::new();
    let mut all = vec![header_row()];
    all.extend(rows);
    workbook.insert_sheet(config.source_sheet.clone(), MemorySheet::from_rows(all));
    workbook.insert_sheet(config.permissions_sheet.clone(), permissions_sheet());
    Arc::new(workbook)
}

pub fn record(client: Option<&str>, platform: Option<&str>, budget: Option<f64>) -> CampaignRecord {
    CampaignRecord {
        campaign_id: String::new(),
        client: client.map(str::to_string),
        platform: platform.map(str::to_string),
        ad_format: None,
        budget,
        campaign_type: None,
        status: None,
        start_date: None,
        end_date: None,
        remarks: String::new(),
        guide_link: String::new(),
    }
}

/// Counts every call that reaches the wrapped backend.
pub struct CountingBackend {
    inner: MemoryCacheBackend,
    pub calls: AtomicUsize,
}

impl CountingBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        CountingBackend {
            inner: MemoryCacheBackend::new(clock),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CacheBackend for CountingBackend {
    fn get(&self, key: &str) -> DashResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: String, ttl_secs: u64) -> DashResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, value, ttl_secs)
    }

    fn remove(&self, key: &str) -> DashResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key)
    }
}

/// Counts table lookups against the wrapped workbook.
pub struct CountingWorkbook {
    pub inner: Arc<MemoryWorkbook>,
    pub lookups: AtomicUsize,
}

impl CountingWorkbook {
    pub fn new(inner: Arc<MemoryWorkbook>) -> Self {
        CountingWorkbook {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Workbook for CountingWorkbook {
    fn table(&self, name: &str) -> Option<Arc<dyn SourceTable>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.table(name)
    }
}

pub struct Harness {
    pub service: DashboardService,
    pub workbook: Arc<CountingWorkbook>,
    pub backend: Arc<CountingBackend>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(rows: Vec<Vec<RawCell>>) -> Harness {
    harness_with_config(rows, DashConfig::default())
}

pub fn harness_with_config(rows: Vec<Vec<RawCell>>, config: DashConfig) -> Harness {
    let clock = test_clock();
    let workbook = Arc::new(CountingWorkbook::new(workbook_with(rows)));
    let backend = Arc::new(CountingBackend::new(clock.clone()));
    let cache = DashboardCache::new(backend.clone(), clock.clone());
    let service = DashboardService::new(workbook.clone(), cache, clock.clone(), config);
    Harness {
        service,
        workbook,
        backend,
        clock,
    }
}
