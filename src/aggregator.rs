use crate::table::CampaignRecord;
use chrono::{Datelike, Months, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How many campaign types the duration chart keeps.
pub const TOP_CAMPAIGN_TYPES: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    pub label: String,
    pub values: Vec<f64>,
}

/// A header row plus labelled data rows, ready to hand to a chart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartTable {
    pub header: Vec<String>,
    pub rows: Vec<ChartRow>,
}

impl ChartTable {
    pub fn new<S: Into<String>>(header: impl IntoIterator<Item = S>) -> Self {
        ChartTable {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, values: Vec<f64>) {
        self.rows.push(ChartRow {
            label: label.into(),
            values,
        });
    }

    pub fn is_header_only(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First value of the row labelled `label`.
    pub fn value(&self, label: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.label == label)
            .and_then(|r| r.values.first().copied())
    }

    /// Value at (`label`, `column`), where `column` names a header entry.
    pub fn cell(&self, label: &str, column: &str) -> Option<f64> {
        let col = self.header.iter().skip(1).position(|h| h == column)?;
        self.rows
            .iter()
            .find(|r| r.label == label)
            .and_then(|r| r.values.get(col).copied())
    }

    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.label.as_str()).collect()
    }
}

/// Every chart bucket of the dashboard, computed together in one pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    /// Budget by client (rows) and platform (columns).
    pub client_platform: ChartTable,
    /// Budget keyed `"{client} - {platform}"`.
    pub client_platform_budget: ChartTable,
    /// Current-month budget by ad format.
    pub ad_format_budget: ChartTable,
    /// Current-month budget by client.
    pub client_budget: ChartTable,
    /// Total campaign days by campaign type, top five.
    pub campaign_type_duration: ChartTable,
    pub status_counts: ChartTable,
}

/// Sums keyed by label, remembering the order labels were first seen.
#[derive(Default)]
struct Tally {
    order: Vec<String>,
    totals: HashMap<String, f64>,
}

impl Tally {
    fn add(&mut self, key: &str, amount: f64) {
        match self.totals.get_mut(key) {
            Some(total) => *total += amount,
            None => {
                self.order.push(key.to_string());
                self.totals.insert(key.to_string(), amount);
            }
        }
    }

    fn into_entries(self) -> Vec<(String, f64)> {
        let mut totals = self.totals;
        self.order
            .into_iter()
            .map(|key| {
                let total = totals.remove(&key).unwrap_or_default();
                (key, total)
            })
            .collect()
    }

    fn into_chart<S: Into<String>>(
        self,
        header: impl IntoIterator<Item = S>,
        drop_zero: bool,
    ) -> ChartTable {
        let mut chart = ChartTable::new(header);
        for (key, total) in self.into_entries() {
            if drop_zero && total == 0.0 {
                continue;
            }
            chart.push(key, vec![total]);
        }
        chart
    }
}

/// First and last day of the calendar month containing `today`.
pub fn month_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = today.with_day(1).unwrap_or(today);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(today);
    (first, last)
}

/// Inclusive overlap of the record's dates with `[first, last]`.
fn overlaps(record: &CampaignRecord, first: NaiveDate, last: NaiveDate) -> bool {
    match record.date_range() {
        Some((start, end)) => start <= last && end >= first,
        None => false,
    }
}

/// Folds the records into every dashboard bucket in one pass. `today` picks
/// the calendar month used by the windowed buckets.
pub fn aggregate(records: &[CampaignRecord], today: NaiveDate) -> AggregationResult {
    let (month_first, month_last) = month_bounds(today);

    let mut statuses = Tally::default();
    let mut pair_budget = Tally::default();
    let mut format_budget = Tally::default();
    let mut client_budget = Tally::default();
    let mut type_days = Tally::default();

    let mut client_order: Vec<String> = Vec::new();
    let mut grid: HashMap<String, HashMap<String, f64>> = HashMap::new();
    let mut platforms: Vec<String> = Vec::new();

    for record in records {
        if let Some(status) = &record.status {
            statuses.add(status, 1.0);
        }

        if let (Some(client), Some(platform), Some(budget)) =
            (&record.client, &record.platform, record.budget)
        {
            let row = grid.entry(client.clone()).or_insert_with(|| {
                client_order.push(client.clone());
                HashMap::new()
            });
            *row.entry(platform.clone()).or_insert(0.0) += budget;
            if !platforms.contains(platform) {
                platforms.push(platform.clone());
            }
            pair_budget.add(&format!("{} - {}", client, platform), budget);
        }

        if overlaps(record, month_first, month_last) {
            if let (Some(format), Some(budget)) = (&record.ad_format, record.budget) {
                format_budget.add(format, budget);
            }
            if let (Some(client), Some(budget)) = (&record.client, record.budget) {
                client_budget.add(client, budget);
            }
        }

        if let (Some(kind), Some((start, end))) = (&record.campaign_type, record.date_range()) {
            type_days.add(kind, (end - start).num_days() as f64);
        }
    }

    platforms.sort();
    let mut client_platform = ChartTable::new(
        std::iter::once("Client".to_string()).chain(platforms.iter().cloned()),
    );
    for client in client_order {
        let row = grid.remove(&client).unwrap_or_default();
        let values: Vec<f64> = platforms
            .iter()
            .map(|p| row.get(p).copied().unwrap_or(0.0))
            .collect();
        if values.iter().all(|v| *v == 0.0) {
            continue;
        }
        client_platform.push(client, values);
    }

    let mut durations = type_days.into_entries();
    // sort_by is stable: equal totals keep first-seen order
    durations.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    durations.truncate(TOP_CAMPAIGN_TYPES);
    let mut campaign_type_duration = ChartTable::new(["Campaign Type", "Total Days"]);
    for (kind, days) in durations {
        campaign_type_duration.push(kind, vec![days]);
    }

    debug!(
        "aggregated {} records across {} clients and {} platforms",
        records.len(),
        client_platform.len(),
        platforms.len()
    );

    AggregationResult {
        client_platform,
        client_platform_budget: pair_budget.into_chart(["Client - Platform", "Budget"], false),
        ad_format_budget: format_budget.into_chart(["Ad Format", "Budget"], true),
        client_budget: client_budget.into_chart(["Client", "Budget"], true),
        campaign_type_duration,
        status_counts: statuses.into_chart(["Status", "Count"], false),
    }
}

/// Sorted, de-duplicated client names.
pub fn distinct_clients(records: &[CampaignRecord]) -> Vec<String> {
    let mut clients: Vec<String> = records.iter().filter_map(|r| r.client.clone()).collect();
    clients.sort();
    clients.dedup();
    clients
}
