#![cfg(not(tarpaulin_include))]

use campaign_dash::app;
use campaign_dash::cache::{DashboardCache, MemoryCacheBackend};
use campaign_dash::clock::{Clock, SystemClock};
use campaign_dash::config::DashConfig;
use campaign_dash::dashboard::DashboardService;
use campaign_dash::loader::workbook_from_csv;
use campaign_dash::saving::load_workbook;
use campaign_dash::spreadsheet::{MemoryWorkbook, Workbook};
use std::env;
use std::path::Path;
use std::sync::Arc;

fn load_source(
    config: &DashConfig,
    data: &str,
    permissions: Option<&str>,
) -> Result<MemoryWorkbook, Box<dyn std::error::Error>> {
    if data.ends_with(".gz") {
        Ok(load_workbook(data)?)
    } else {
        Ok(workbook_from_csv(config, data, permissions.map(Path::new))?)
    }
}

/// Main entry point for the dashboard web server
///
/// Usage: `campaign-dash <campaigns.csv|workbook.bin.gz> [permissions.csv] [config.json]`
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <campaigns.csv|workbook.bin.gz> [permissions.csv] [config.json]",
            args[0]
        );
        return Ok(());
    }

    let config = match args.get(3) {
        Some(path) => DashConfig::from_file(path)?,
        None => DashConfig::default(),
    }
    .apply_env();

    let workbook: Arc<dyn Workbook> =
        Arc::new(load_source(&config, &args[1], args.get(2).map(String::as_str))?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let backend = Arc::new(MemoryCacheBackend::new(Arc::clone(&clock)));
    let cache = DashboardCache::new(backend, Arc::clone(&clock));

    let service = Arc::new(DashboardService::new(workbook, cache, clock, config));
    service.validate()?;
    app::run(service).await
}
