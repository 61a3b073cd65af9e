use crate::access::{AccessGate, IdentityProvider};
use crate::aggregator::{AggregationResult, aggregate, distinct_clients};
use crate::cache::{DashboardCache, dashboard_key, search_key};
use crate::cell::RawCell;
use crate::clock::Clock;
use crate::config::DashConfig;
use crate::error::{DashError, DashResult};
use crate::spreadsheet::{SourceTable, Workbook};
use crate::table::{CampaignRecord, CampaignTable, resolve_columns};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::{Arc, Mutex};

/// The identity-independent part of the dashboard; this is what gets cached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardPayload {
    pub charts: AggregationResult,
    pub clients: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub charts: AggregationResult,
    pub clients: Vec<String>,
    pub user_name: String,
    pub user_role: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DashboardResponse {
    Data(DashboardData),
    Error { error: String },
}

/// A campaign row as returned by search, dates rendered as `YYYY-MM-DD`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignView {
    pub campaign_id: String,
    pub client: Option<String>,
    pub platform: Option<String>,
    pub ad_format: Option<String>,
    pub budget: Option<f64>,
    pub campaign_type: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub remarks: String,
    pub guide_link: String,
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

impl From<CampaignRecord> for CampaignView {
    fn from(record: CampaignRecord) -> Self {
        CampaignView {
            campaign_id: record.campaign_id,
            client: record.client,
            platform: record.platform,
            ad_format: record.ad_format,
            budget: record.budget,
            campaign_type: record.campaign_type,
            status: record.status,
            start_date: format_date(record.start_date),
            end_date: format_date(record.end_date),
            remarks: record.remarks,
            guide_link: record.guide_link,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Results(Vec<CampaignView>),
    Error { error: String },
}

impl SearchResponse {
    pub fn results(&self) -> Option<&[CampaignView]> {
        match self {
            SearchResponse::Results(views) => Some(views),
            SearchResponse::Error { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub success: bool,
    pub message: String,
}

/// `jane.doe@example.com` becomes `Jane Doe`.
pub fn display_name(identity: &str) -> String {
    let local = identity.split('@').next().unwrap_or_default();
    local
        .split(['.', '_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The dashboard query surface: cached reads over the campaign log plus the
/// gated submission path.
pub struct DashboardService {
    workbook: Arc<dyn Workbook>,
    cache: DashboardCache,
    gate: AccessGate,
    clock: Arc<dyn Clock>,
    config: DashConfig,
    append_lock: Mutex<()>,
}

impl DashboardService {
    pub fn new(
        workbook: Arc<dyn Workbook>,
        cache: DashboardCache,
        clock: Arc<dyn Clock>,
        config: DashConfig,
    ) -> Self {
        let gate = AccessGate::new(Arc::clone(&workbook), config.permissions_sheet.clone());
        DashboardService {
            workbook,
            cache,
            gate,
            clock,
            config,
            append_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &DashConfig {
        &self.config
    }

    /// Checks that the campaign sheet exists and that every configured column
    /// reference resolves against its header. Run once before serving.
    pub fn validate(&self) -> DashResult<()> {
        let source = self.source()?;
        let columns = resolve_columns(source.as_ref(), &self.config.columns)?;
        debug!(
            "'{}' columns resolved, campaign id in column {}",
            self.config.source_sheet, columns.campaign_id
        );
        Ok(())
    }

    fn source(&self) -> DashResult<Arc<dyn SourceTable>> {
        self.workbook
            .table(&self.config.source_sheet)
            .ok_or_else(|| DashError::SourceNotFound(self.config.source_sheet.clone()))
    }

    fn load_records(&self) -> DashResult<Vec<CampaignRecord>> {
        let source = self.source()?;
        Ok(CampaignTable::load(source.as_ref(), &self.config.columns)?.into_records())
    }

    fn compute_dashboard(&self) -> DashResult<DashboardPayload> {
        let records = self.load_records()?;
        let today = self.clock.now().date_naive();
        Ok(DashboardPayload {
            charts: aggregate(&records, today),
            clients: distinct_clients(&records),
        })
    }

    /// Charts and client list (cached), plus the caller's display name and
    /// role (always fresh).
    pub fn get_dashboard_data(&self, who: &dyn IdentityProvider) -> DashboardResponse {
        // epoch is read before the sheet, so a result computed across a
        // submission lands under the epoch that submission retired
        let key = dashboard_key(self.cache.search_epoch());
        let payload = match self.cache.get::<DashboardPayload>(&key) {
            Some(payload) => payload,
            None => match self.compute_dashboard() {
                Ok(payload) => {
                    self.cache
                        .put(&key, &payload, self.config.dashboard_ttl_secs);
                    payload
                }
                Err(e) => {
                    warn!("dashboard read failed: {}", e);
                    return DashboardResponse::Error {
                        error: e.to_string(),
                    };
                }
            },
        };

        let identity = who.current_identity().unwrap_or_default();
        DashboardResponse::Data(DashboardData {
            charts: payload.charts,
            clients: payload.clients,
            user_name: display_name(&identity),
            user_role: self.gate.resolve_role(&identity),
        })
    }

    /// Campaigns whose type contains `query` (case-insensitive), newest start
    /// date first, capped at the configured limit. A blank query returns no
    /// rows without touching the cache or the sheet.
    pub fn search_campaign_by_type(&self, query: &str) -> SearchResponse {
        let term = query.trim().to_uppercase();
        if term.is_empty() {
            return SearchResponse::Results(Vec::new());
        }

        let key = search_key(self.cache.search_epoch(), &term);
        if let Some(views) = self.cache.get::<Vec<CampaignView>>(&key) {
            return SearchResponse::Results(views);
        }

        let records = match self.load_records() {
            Ok(records) => records,
            Err(e) => {
                warn!("search for '{}' failed: {}", term, e);
                return SearchResponse::Error {
                    error: e.to_string(),
                };
            }
        };

        let mut matches: Vec<CampaignRecord> = records
            .into_iter()
            .filter(|r| {
                r.campaign_type
                    .as_ref()
                    .is_some_and(|t| t.to_uppercase().contains(&term))
            })
            .collect();
        // None sorts below every date, so undated rows land last
        matches.sort_by_key(|r| Reverse(r.start_date));
        matches.truncate(self.config.search_limit);

        let views: Vec<CampaignView> = matches.into_iter().map(CampaignView::from).collect();
        self.cache.put(&key, &views, self.config.search_ttl_secs);
        SearchResponse::Results(views)
    }

    /// Appends `code` to the campaign-id column of the source sheet.
    ///
    /// The caller must hold the configured admin role. Nothing is written
    /// and the cache is left alone when authorization or validation fails.
    pub fn submit_entry(&self, who: &dyn IdentityProvider, code: &str) -> DashResult<SubmitOutcome> {
        let identity = who
            .current_identity()
            .ok_or_else(|| DashError::PermissionDenied("no signed-in identity".to_string()))?;
        if !self.gate.authorize(&identity, &self.config.admin_role) {
            return Err(DashError::PermissionDenied(format!(
                "{} does not have the '{}' role",
                identity, self.config.admin_role
            )));
        }

        let code = code.trim();
        if code.is_empty() {
            return Err(DashError::InvalidInput("code must not be blank".to_string()));
        }

        let source = self.source()?;
        let columns = resolve_columns(source.as_ref(), &self.config.columns)?;

        let row = {
            let _guard = self.append_lock.lock().unwrap_or_else(|e| e.into_inner());
            let row = source.last_row_index().max(1) + 1;
            source.write_cell(row, columns.campaign_id, RawCell::text(code))?;
            row
        };

        self.cache.invalidate_source();
        info!("{} submitted code '{}' into row {}", identity, code, row);

        Ok(SubmitOutcome {
            success: true,
            message: format!("Code {} recorded in row {}", code, row),
        })
    }

    pub fn has_access(&self, who: &dyn IdentityProvider) -> bool {
        who.current_identity()
            .is_some_and(|identity| self.gate.has_any_access(&identity))
    }
}
