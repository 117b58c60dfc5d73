//! Cell Coercion Module
//! One parse function per logical column. Every function returns a tagged
//! `Field` and never fails the load; callers record a warning for anything
//! that did not parse.

use crate::data::record::Field;
use crate::data::schema::LogicalColumn;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

/// Numeric date layouts, tried in order. ISO first, then day-first, then
/// month-first, so an ambiguous `03/04/1960` reads as 3 April.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// `%Y` takes one to four digits, so `12/05/58` would otherwise read as year 58.
const EARLIEST_BIRTH_YEAR: i32 = 1900;

/// Currency markers allowed in front of an amount, longest first.
const CURRENCY_CODES: [&str; 2] = ["GHS", "GH"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

const MONTH_NAMES: [(&str, &str); 12] = [
    ("january", "jan"),
    ("february", "feb"),
    ("march", "mar"),
    ("april", "apr"),
    ("may", "may"),
    ("june", "jun"),
    ("july", "jul"),
    ("august", "aug"),
    ("september", "sep"),
    ("october", "oct"),
    ("november", "nov"),
    ("december", "dec"),
];

/// A cell that degraded during coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCoercionWarning {
    pub row: usize,
    pub column: LogicalColumn,
    pub raw: String,
}

/// All degraded cells of one load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoercionReport {
    pub warnings: Vec<FieldCoercionWarning>,
}

impl CoercionReport {
    pub fn record(&mut self, row: usize, column: LogicalColumn, raw: &str) {
        self.warnings.push(FieldCoercionWarning {
            row,
            column,
            raw: raw.to_string(),
        });
    }

    /// Record a warning if the field is `Invalid`.
    pub fn check<T>(&mut self, row: usize, column: LogicalColumn, field: &Field<T>) {
        if let Field::Invalid(raw) = field {
            self.record(row, column, raw);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Degraded-cell count per column.
    pub fn counts(&self) -> BTreeMap<LogicalColumn, usize> {
        let mut counts = BTreeMap::new();
        for w in &self.warnings {
            *counts.entry(w.column).or_insert(0) += 1;
        }
        counts
    }
}

/// Trim whitespace and one pair of outer quotes.
fn trim_cell(raw: &str) -> &str {
    let s = raw.trim();
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map(str::trim)
        .unwrap_or(s)
}

/// Trimmed typed cell, with blanks and spreadsheet null markers as absent.
fn clean(raw: Option<&str>) -> Option<&str> {
    let s = trim_cell(raw?);
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(s)
    }
}

/// Plain text cell, trimmed.
pub fn parse_text(raw: Option<&str>) -> String {
    raw.map(trim_cell).unwrap_or_default().to_string()
}

/// Social security numbers: separators dropped, uppercased. Valid numbers are
/// an optional single letter followed by 9 to 12 digits (e.g. `C018001090012`).
pub fn parse_ssn(raw: Option<&str>) -> Field<String> {
    let Some(s) = clean(raw) else {
        return Field::Missing;
    };

    if s.chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c.is_whitespace() || "-./_".contains(c)))
    {
        return Field::Invalid(s.to_string());
    }

    let compact: String = s
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let digits = compact
        .strip_prefix(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(&compact);
    if (9..=12).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Field::Parsed(compact)
    } else {
        Field::Invalid(s.to_string())
    }
}

/// Dates of birth in any of the accepted layouts; first match wins.
pub fn parse_date_of_birth(raw: Option<&str>) -> Field<NaiveDate> {
    let Some(s) = clean(raw) else {
        return Field::Missing;
    };

    let plausible = |d: &NaiveDate| d.year() >= EARLIEST_BIRTH_YEAR;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok().filter(plausible))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| {
                    NaiveDateTime::parse_from_str(s, fmt)
                        .ok()
                        .map(|dt| dt.date())
                        .filter(plausible)
                })
        })
        .map(Field::Parsed)
        .unwrap_or_else(|| Field::Invalid(s.to_string()))
}

/// Integral value from text such as `2021` or `2021.0`.
fn parse_integral(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

pub fn parse_year(raw: Option<&str>) -> Field<i32> {
    let Some(s) = clean(raw) else {
        return Field::Missing;
    };
    parse_integral(s)
        .and_then(|v| i32::try_from(v).ok())
        .map(Field::Parsed)
        .unwrap_or_else(|| Field::Invalid(s.to_string()))
}

/// Months as numbers 1-12 or English names (full or abbreviated).
pub fn parse_month(raw: Option<&str>) -> Field<u32> {
    let Some(s) = clean(raw) else {
        return Field::Missing;
    };

    let by_number = parse_integral(s)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|m| (1..=12).contains(m));
    if let Some(m) = by_number {
        return Field::Parsed(m);
    }

    let lower = s.trim_end_matches('.').to_lowercase();
    let by_name = MONTH_NAMES
        .iter()
        .position(|(full, abbr)| lower == *full || lower == *abbr)
        .or_else(|| (lower == "sept").then_some(8));
    match by_name {
        Some(idx) => Field::Parsed(idx as u32 + 1),
        None => Field::Invalid(s.to_string()),
    }
}

fn strip_currency(s: &str) -> &str {
    CURRENCY_CODES
        .iter()
        .find(|code| s.get(..code.len()).is_some_and(|p| p.eq_ignore_ascii_case(code)))
        .map_or(s, |code| &s[code.len()..])
}

/// Withdrawal amounts. Blank is zero. Anything unparseable or negative also
/// becomes zero, and the raw text is handed back so it can be reported.
pub fn parse_withdrawal(raw: Option<&str>) -> (f64, Option<String>) {
    let Some(s) = clean(raw) else {
        return (0.0, None);
    };

    let stripped: String = strip_currency(s)
        .chars()
        .filter(|c| !matches!(c, ',' | '₵' | ' '))
        .collect();

    match stripped.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => (v, None),
        _ => (0.0, Some(s.to_string())),
    }
}
