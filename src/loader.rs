use crate::cell::RawCell;
use crate::config::DashConfig;
use crate::error::{DashError, DashResult};
use crate::spreadsheet::{MemorySheet, MemoryWorkbook};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

/// Load a sheet from a CSV file
///
/// Row 1 of the file becomes row 1 of the sheet, so the file is expected to
/// start with its header line. Each record must sit on one line; quoted
/// fields may contain commas and doubled quotes but not line breaks.
///
/// # Examples
/// ```no_run
/// use campaign_dash::loader::sheet_from_csv;
///
/// match sheet_from_csv("campaigns.csv") {
///     Ok(_) => println!("Loaded campaign log"),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn sheet_from_csv(filepath: impl AsRef<Path>) -> DashResult<MemorySheet> {
    let text = fs::read_to_string(filepath)?;
    sheet_from_csv_str(&text)
}

pub fn sheet_from_csv_str(text: &str) -> DashResult<MemorySheet> {
    let rows: Vec<Vec<RawCell>> = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            parse_csv_row(line)
                .map(|fields| fields.iter().map(|f| infer_cell(f)).collect())
                .map_err(|e| DashError::InvalidInput(format!("line {}: {}", idx + 1, e)))
        })
        .collect::<DashResult<_>>()?;

    if rows.is_empty() {
        return Err(DashError::InvalidInput("CSV file is empty".to_string()));
    }
    Ok(MemorySheet::from_rows(rows))
}

/// Plain numbers become numbers and ISO dates become dates; everything else
/// stays text for the sanitizer to deal with.
fn infer_cell(field: &str) -> RawCell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return RawCell::Empty;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_finite() {
            return RawCell::Number(n);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return RawCell::Date(d);
    }
    RawCell::Text(field.to_string())
}

// Parse a CSV row into a vector of strings
fn parse_csv_row(line: &str) -> Result<Vec<String>, String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            _ => {
                current_field.push(c);
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    result.push(current_field);

    Ok(result)
}

/// Builds a workbook holding the campaign log and, when given, the
/// permissions sheet, under the sheet names the config expects.
pub fn workbook_from_csv(
    config: &DashConfig,
    campaigns: impl AsRef<Path>,
    permissions: Option<&Path>,
) -> DashResult<MemoryWorkbook> {
    let workbook = MemoryWorkbook::new();
    workbook.insert_sheet(config.source_sheet.clone(), sheet_from_csv(campaigns)?);
    if let Some(path) = permissions {
        workbook.insert_sheet(config.permissions_sheet.clone(), sheet_from_csv(path)?);
    }
    Ok(workbook)
}
