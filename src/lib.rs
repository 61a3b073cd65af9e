/*!
# Campaign Dashboard Core

Aggregation and caching behind a campaign-log dashboard, built in Rust.

## Overview

A flat "campaign log" sheet (one row per campaign: client, platform, ad
format, budget, campaign type, status, start and end dates) is read, each
cell is sanitized into a typed value, and the rows are folded into a handful
of independent chart buckets. Results are served through a short-lived cache
that is invalidated whenever the log is written to.

## Architecture

### Data Layer
- **cell**: `RawCell`, the untyped value held by a sheet cell
- **spreadsheet**: `SourceTable` / `Workbook` traits and their in-memory implementations
- **sanitizer**: date, number and presence rules for raw cells
- **column**: column references by header name, letter or index
- **table**: `CampaignRecord` and `CampaignTable`

### Core
- **aggregator**: single pass producing every chart bucket
- **cache**: `CacheBackend` trait, TTL-checked envelopes, `DashboardCache`
- **access**: identity lookup and role gate over the permissions sheet
- **dashboard**: the query surface (`get_dashboard_data`, `search_campaign_by_type`,
  `submit_entry`, `has_access`)

### Supporting
- **clock**: injectable time source
- **config**: runtime settings
- **error**: `DashError`
- **loader**: CSV import
- **saving**: gzip + bincode workbook snapshots
- **app** (feature `web`): axum HTTP routes

## REST API Endpoints (feature `web`)

- `GET /api/dashboard` - Charts, client list, caller name and role
- `GET /api/search?q=` - Campaigns by type, newest first
- `POST /api/submit` - Record a code (admin only)
- `GET /api/access` - Whether the caller has any role
*/

pub mod access;
pub mod aggregator;
#[cfg(feature = "web")]
pub mod app;
pub mod cache;
pub mod cell;
pub mod clock;
pub mod column;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod loader;
pub mod sanitizer;
pub mod saving;
pub mod spreadsheet;
pub mod table;

pub use access::*;
pub use aggregator::*;
pub use cache::*;
pub use cell::*;
pub use clock::*;
pub use column::*;
pub use config::*;
pub use dashboard::*;
pub use error::*;
pub use spreadsheet::*;
pub use table::*;
