use crate::cache::SEARCH_EPOCH_TTL_SECS;
use crate::column::CampaignColumns;
use crate::error::{DashError, DashResult};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime settings. Every field has a default, so a config file only needs
/// the values it changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub source_sheet: String,
    pub permissions_sheet: String,
    pub columns: CampaignColumns,
    pub dashboard_ttl_secs: u64,
    pub search_ttl_secs: u64,
    pub search_limit: usize,
    pub admin_role: String,
    pub bind_addr: String,
}

impl Default for DashConfig {
    fn default() -> Self {
        DashConfig {
            source_sheet: "Campaign Log".to_string(),
            permissions_sheet: "Permissions".to_string(),
            columns: CampaignColumns::default(),
            dashboard_ttl_secs: 600,
            search_ttl_secs: 300,
            search_limit: 300,
            admin_role: "admin".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl DashConfig {
    pub fn from_json(text: &str) -> DashResult<Self> {
        let config: DashConfig =
            serde_json::from_str(text).map_err(|e| DashError::Config(e.to_string()))?;
        Ok(config.clamp_ttls())
    }

    pub fn from_file(path: impl AsRef<Path>) -> DashResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Applies `CAMPAIGN_DASH_*` overrides that are set and parse cleanly.
    pub fn apply_env(mut self) -> Self {
        if let Ok(addr) = std::env::var("CAMPAIGN_DASH_BIND") {
            self.bind_addr = addr;
        }
        if let Some(ttl) = env_u64("CAMPAIGN_DASH_DASHBOARD_TTL") {
            self.dashboard_ttl_secs = ttl;
        }
        if let Some(ttl) = env_u64("CAMPAIGN_DASH_SEARCH_TTL") {
            self.search_ttl_secs = ttl;
        }
        self.clamp_ttls()
    }

    /// Cached entries must expire before the epoch marker does, otherwise a
    /// lapsed marker would make epoch 0 entries reachable again.
    fn clamp_ttls(mut self) -> Self {
        let max = SEARCH_EPOCH_TTL_SECS - 1;
        if self.dashboard_ttl_secs > max {
            warn!("dashboard_ttl_secs {} capped at {}", self.dashboard_ttl_secs, max);
            self.dashboard_ttl_secs = max;
        }
        if self.search_ttl_secs > max {
            warn!("search_ttl_secs {} capped at {}", self.search_ttl_secs, max);
            self.search_ttl_secs = max;
        }
        self
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.trim().parse().ok()
}
