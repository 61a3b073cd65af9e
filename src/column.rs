use crate::cell::RawCell;
use crate::error::{DashError, DashResult};
use serde::{Deserialize, Serialize};

/// How a logical field points at a physical column.
///
/// In configuration files a bare string is a header name, a bare number is a
/// 1-based column index and `{"letter": "C"}` is a column letter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    ByName(String),
    ByIndex(usize),
    ByLetter { letter: String },
}

impl ColumnRef {
    pub fn name(name: impl Into<String>) -> Self {
        ColumnRef::ByName(name.into())
    }

    pub fn letter(letter: impl Into<String>) -> Self {
        ColumnRef::ByLetter {
            letter: letter.into(),
        }
    }

    /// Resolves to a 1-based column index within a table `width` columns wide.
    pub fn resolve(&self, header: &[RawCell], width: usize) -> DashResult<usize> {
        let col = match self {
            ColumnRef::ByName(name) => header
                .iter()
                .position(|cell| cell.display() == *name)
                .map(|idx| idx + 1)
                .ok_or_else(|| {
                    DashError::UnresolvedColumn(format!("header '{}' not found", name))
                })?,
            ColumnRef::ByIndex(idx) => *idx,
            ColumnRef::ByLetter { letter } => letter_to_col(letter).ok_or_else(|| {
                DashError::UnresolvedColumn(format!("'{}' is not a column letter", letter))
            })?,
        };

        if col == 0 || col > width {
            return Err(DashError::UnresolvedColumn(format!(
                "column {} is outside the source range A:{}",
                col,
                col_to_letter(width)
            )));
        }
        Ok(col)
    }
}

pub fn col_to_letter(col: usize) -> String {
    let mut col = col;
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.push(((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result.chars().rev().collect()
}

/// Base-26 column letters, `A` = 1. Case-insensitive; `None` for anything
/// that is not purely alphabetic.
pub fn letter_to_col(letters: &str) -> Option<usize> {
    let letters = letters.trim();
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    letters.to_ascii_uppercase().chars().try_fold(0usize, |acc, c| {
        acc.checked_mul(26)?
            .checked_add((c as u8 - b'A' + 1) as usize)
    })
}

/// Column references for every field of a campaign record.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignColumns {
    pub campaign_id: ColumnRef,
    pub client: ColumnRef,
    pub platform: ColumnRef,
    pub ad_format: ColumnRef,
    pub budget: ColumnRef,
    pub campaign_type: ColumnRef,
    pub status: ColumnRef,
    pub start_date: ColumnRef,
    pub end_date: ColumnRef,
    pub remarks: Option<ColumnRef>,
    pub guide_link: Option<ColumnRef>,
}

impl Default for CampaignColumns {
    fn default() -> Self {
        CampaignColumns {
            campaign_id: ColumnRef::name("Campaign ID"),
            client: ColumnRef::name("Client"),
            platform: ColumnRef::name("Platform"),
            ad_format: ColumnRef::name("Ad Format"),
            budget: ColumnRef::name("Budget"),
            campaign_type: ColumnRef::name("Campaign Type"),
            status: ColumnRef::name("Status"),
            start_date: ColumnRef::name("Start Date"),
            end_date: ColumnRef::name("End Date"),
            remarks: Some(ColumnRef::name("Remarks")),
            guide_link: Some(ColumnRef::name("Guide Link")),
        }
    }
}

/// `CampaignColumns` with every reference turned into a 1-based index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnMap {
    pub campaign_id: usize,
    pub client: usize,
    pub platform: usize,
    pub ad_format: usize,
    pub budget: usize,
    pub campaign_type: usize,
    pub status: usize,
    pub start_date: usize,
    pub end_date: usize,
    pub remarks: Option<usize>,
    pub guide_link: Option<usize>,
}

impl ColumnMap {
    pub fn resolve(columns: &CampaignColumns, header: &[RawCell], width: usize) -> DashResult<Self> {
        let optional = |col: &Option<ColumnRef>| -> DashResult<Option<usize>> {
            col.as_ref().map(|c| c.resolve(header, width)).transpose()
        };

        Ok(ColumnMap {
            campaign_id: columns.campaign_id.resolve(header, width)?,
            client: columns.client.resolve(header, width)?,
            platform: columns.platform.resolve(header, width)?,
            ad_format: columns.ad_format.resolve(header, width)?,
            budget: columns.budget.resolve(header, width)?,
            campaign_type: columns.campaign_type.resolve(header, width)?,
            status: columns.status.resolve(header, width)?,
            start_date: columns.start_date.resolve(header, width)?,
            end_date: columns.end_date.resolve(header, width)?,
            remarks: optional(&columns.remarks)?,
            guide_link: optional(&columns.guide_link)?,
        })
    }

    fn all(&self) -> impl Iterator<Item = usize> + '_ {
        [
            self.campaign_id,
            self.client,
            self.platform,
            self.ad_format,
            self.budget,
            self.campaign_type,
            self.status,
            self.start_date,
            self.end_date,
        ]
        .into_iter()
        .chain(self.remarks)
        .chain(self.guide_link)
    }

    /// Smallest column span covering every referenced column, as `(first, last)`.
    pub fn span(&self) -> (usize, usize) {
        let first = self.all().min().unwrap_or(1);
        let last = self.all().max().unwrap_or(1);
        (first, last)
    }
}
