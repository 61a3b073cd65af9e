#![cfg(not(tarpaulin_include))]

use campaign_dash::access::FixedIdentity;
use campaign_dash::cache::{DashboardCache, MemoryCacheBackend};
use campaign_dash::clock::{Clock, SystemClock};
use campaign_dash::config::DashConfig;
use campaign_dash::dashboard::DashboardService;
use campaign_dash::loader::workbook_from_csv;
use campaign_dash::saving::save_workbook;
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

fn usage(program: &str) {
    eprintln!(
        "Usage: {} <campaigns.csv> <permissions.csv> <identity> <command> [arg]",
        program
    );
    println!("Commands:");
    println!("  dashboard: Print charts, clients, name and role");
    println!("  search <term>: Campaigns whose type contains <term>");
    println!("  submit <code>: Record a code (admin only)");
    println!("  access: Whether <identity> has any role");
    println!("  snapshot <file.bin.gz>: Save both sheets as a workbook snapshot");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let s = Instant::now();
    let args: Vec<String> = env::args().collect();
    if args.len() < 5 {
        usage(&args[0]);
        return Ok(());
    }

    let config = DashConfig::default().apply_env();
    let workbook = Arc::new(workbook_from_csv(
        &config,
        &args[1],
        Some(Path::new(&args[2])),
    )?);
    let who = FixedIdentity::new(args[3].as_str());
    let arg = args.get(5).map(String::as_str).unwrap_or_default();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let backend = Arc::new(MemoryCacheBackend::new(Arc::clone(&clock)));
    let cache = DashboardCache::new(backend, Arc::clone(&clock));
    let service = DashboardService::new(workbook.clone(), cache, clock, config);
    service.validate()?;

    match args[4].as_str() {
        "dashboard" => {
            let data = service.get_dashboard_data(&who);
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        "search" => {
            let results = service.search_campaign_by_type(arg);
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        "submit" => match service.submit_entry(&who, arg) {
            Ok(outcome) => println!("{}", serde_json::to_string_pretty(&outcome)?),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        "access" => {
            println!("{}", service.has_access(&who));
        }
        "snapshot" if !arg.is_empty() => {
            save_workbook(&workbook, arg)?;
            println!("Saved {} sheets to {}", workbook.sheet_names().len(), arg);
        }
        _ => usage(&args[0]),
    }

    eprintln!("[{:.3}s]", s.elapsed().as_secs_f64());
    Ok(())
}
