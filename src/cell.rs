use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A raw value as it sits in a source table cell, before any sanitizing.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub enum RawCell {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl RawCell {
    pub fn text(s: impl Into<String>) -> Self {
        RawCell::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Renders the cell the way a sheet would show it in plain text.
    /// Whole numbers drop their fractional part, dates use `YYYY-MM-DD`.
    pub fn display(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Bool(b) => b.to_string(),
            RawCell::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            RawCell::Text(s) => s.clone(),
            RawCell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        RawCell::Text(s.to_string())
    }
}

impl From<String> for RawCell {
    fn from(s: String) -> Self {
        RawCell::Text(s)
    }
}

impl From<f64> for RawCell {
    fn from(n: f64) -> Self {
        RawCell::Number(n)
    }
}

impl From<NaiveDate> for RawCell {
    fn from(d: NaiveDate) -> Self {
        RawCell::Date(d)
    }
}
