//! Contributor Record Module
//! Typed rows of the canonical table.

use crate::data::coerce::CoercionReport;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;

/// Outcome of coercing one cell to its expected type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Field<T> {
    Parsed(T),
    /// The cell had text that could not be coerced; the text is kept as-is.
    Invalid(String),
    Missing,
}

impl<T> Field<T> {
    pub fn parsed(&self) -> Option<&T> {
        match self {
            Field::Parsed(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Display> Field<T> {
    /// Text written back out on export.
    pub fn as_cell(&self) -> Option<String> {
        match self {
            Field::Parsed(v) => Some(v.to_string()),
            Field::Invalid(raw) => Some(raw.clone()),
            Field::Missing => None,
        }
    }
}

/// One row of the source table.
#[derive(Debug, Clone, Serialize)]
pub struct ContributorRecord {
    /// 0-based position in the source file.
    pub row: usize,
    pub unit_holder_id: String,
    pub contributor_name: String,
    pub social_security_number: Field<String>,
    pub date_of_birth: Field<NaiveDate>,
    pub withdrawal_amount: f64,
    pub year: Field<i32>,
    pub month: Field<u32>,
    /// Month exactly as written in the source.
    pub month_label: String,
    /// Values of the non-logical columns, aligned with `ContributorTable::extra_columns`.
    pub extra: Vec<Option<String>>,
}

impl ContributorRecord {
    /// Chronological key; `None` when year or month did not coerce.
    pub fn period(&self) -> Option<(i32, u32)> {
        match (&self.year, &self.month) {
            (Field::Parsed(y), Field::Parsed(m)) => Some((*y, *m)),
            _ => None,
        }
    }

    /// Whole years lived on `today`; `None` for an unknown birth date.
    ///
    /// The current year only counts once the birthday has been reached, so a
    /// contributor gains a year exactly on their month/day.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let dob = self.date_of_birth.parsed()?;
        let mut years = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}

/// The canonical, read-only table produced by the loader.
#[derive(Debug, Clone)]
pub struct ContributorTable {
    pub source: PathBuf,
    pub records: Vec<ContributorRecord>,
    /// Headers of the columns carried through untouched.
    pub extra_columns: Vec<String>,
    pub report: CoercionReport,
}

impl ContributorTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Value of an extra column for a record, by header name.
    pub fn extra_value<'a>(&self, record: &'a ContributorRecord, column: &str) -> Option<&'a str> {
        let idx = self.extra_columns.iter().position(|c| c == column)?;
        record.extra.get(idx)?.as_deref()
    }
}
