use crate::cell::RawCell;
use crate::column::{CampaignColumns, ColumnMap};
use crate::error::DashResult;
use crate::sanitizer::{parse_date, parse_number, present_text};
use crate::spreadsheet::SourceTable;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

/// One sanitized row of the campaign log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub campaign_id: String,
    pub client: Option<String>,
    pub platform: Option<String>,
    pub ad_format: Option<String>,
    pub budget: Option<f64>,
    pub campaign_type: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub remarks: String,
    pub guide_link: String,
}

impl CampaignRecord {
    /// Both dates, when both parsed.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.start_date?, self.end_date?))
    }
}

/// Reads the header row and resolves every configured column against it.
pub fn resolve_columns(
    source: &dyn SourceTable,
    columns: &CampaignColumns,
) -> DashResult<ColumnMap> {
    let width = source.last_column_index();
    let header = source
        .read_range(1, 1, 1, width)?
        .into_iter()
        .next()
        .unwrap_or_default();
    ColumnMap::resolve(columns, &header, width)
}

/// The campaign log, typed. Rows keep their source order.
#[derive(Clone, Debug, Default)]
pub struct CampaignTable {
    records: Vec<CampaignRecord>,
}

impl CampaignTable {
    /// Resolves columns and reads every data row (header excluded) through the
    /// sanitizer. Only the span between the leftmost and rightmost referenced
    /// column is read.
    pub fn load(source: &dyn SourceTable, columns: &CampaignColumns) -> DashResult<Self> {
        let map = resolve_columns(source, columns)?;
        let last_row = source.last_row_index();
        if last_row < 2 {
            return Ok(CampaignTable::default());
        }

        let (first_col, last_col) = map.span();
        let rows = source.read_range(2, first_col, last_row - 1, last_col - first_col + 1)?;
        let records: Vec<CampaignRecord> = rows
            .iter()
            .map(|row| Self::record_from_row(row, &map, first_col))
            .collect();

        debug!("loaded {} campaign rows", records.len());
        Ok(CampaignTable { records })
    }

    fn record_from_row(row: &[RawCell], map: &ColumnMap, first_col: usize) -> CampaignRecord {
        static EMPTY: RawCell = RawCell::Empty;
        let cell = |col: usize| row.get(col - first_col).unwrap_or(&EMPTY);
        let opaque = |col: Option<usize>| col.map(|c| cell(c).display()).unwrap_or_default();

        CampaignRecord {
            campaign_id: cell(map.campaign_id).display(),
            client: present_text(cell(map.client)),
            platform: present_text(cell(map.platform)),
            ad_format: present_text(cell(map.ad_format)),
            budget: parse_number(cell(map.budget)),
            campaign_type: present_text(cell(map.campaign_type)),
            status: present_text(cell(map.status)),
            start_date: parse_date(cell(map.start_date)),
            end_date: parse_date(cell(map.end_date)),
            remarks: opaque(map.remarks),
            guide_link: opaque(map.guide_link),
        }
    }

    pub fn rows(&self) -> &[CampaignRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CampaignRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
