//! Cell sanitizing: turns heterogeneous raw cells into typed values, or
//! nothing at all when a cell cannot be read as the wanted type.

use crate::cell::RawCell;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_NUMERIC_REGEX: Regex = Regex::new(r"[^0-9+\-.]").unwrap();
}

/// Serial numbers below this are read as spreadsheet day serials,
/// anything at or above as epoch milliseconds.
const SERIAL_DAY_LIMIT: f64 = 100_000_000.0;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

fn serial_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// Reads a calendar date out of a cell.
///
/// Dates pass through. Numbers are either spreadsheet day serials
/// (days since 1899-12-30) or epoch milliseconds. Strings are tried against a
/// fixed list of common layouts; no timezone conversion is applied.
pub fn parse_date(value: &RawCell) -> Option<NaiveDate> {
    match value {
        RawCell::Date(d) => Some(*d),
        RawCell::Number(n) => date_from_number(*n),
        RawCell::Text(s) => date_from_str(s.trim()),
        _ => None,
    }
}

fn date_from_number(n: f64) -> Option<NaiveDate> {
    if !n.is_finite() {
        return None;
    }
    if n.abs() < SERIAL_DAY_LIMIT {
        let days = n.floor() as i64;
        serial_epoch()?.checked_add_signed(Duration::try_days(days)?)
    } else {
        DateTime::from_timestamp_millis(n as i64).map(|dt| dt.date_naive())
    }
}

fn date_from_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Reads a number out of a cell.
///
/// Strings lose every character other than digits, `+`, `-` and `.` before
/// parsing, so `"$1,234.56"` reads as `1234.56`. Non-finite results are
/// rejected.
pub fn parse_number(value: &RawCell) -> Option<f64> {
    let n = match value {
        RawCell::Number(n) => *n,
        RawCell::Text(s) => {
            let stripped = NON_NUMERIC_REGEX.replace_all(s, "");
            stripped.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// True when a cell carries a usable value.
///
/// Strings count only if they are non-blank and not the literal `N/A`
/// (any case). Every other non-empty value counts, including numeric zero.
pub fn is_present(value: &RawCell) -> bool {
    match value {
        RawCell::Empty => false,
        RawCell::Text(s) => {
            let trimmed = s.trim();
            !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("N/A")
        }
        _ => true,
    }
}

/// The display text of a cell, or `None` when [`is_present`] rejects it.
pub fn present_text(value: &RawCell) -> Option<String> {
    if !is_present(value) {
        return None;
    }
    Some(value.display().trim().to_string())
}
