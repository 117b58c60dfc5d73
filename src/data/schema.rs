//! Column Resolution Module
//! Maps the logical contributor columns onto whatever headers a file uses.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("missing required column(s): {}", join_headers(.missing))]
pub struct SchemaError {
    pub missing: Vec<LogicalColumn>,
}

fn join_headers(columns: &[LogicalColumn]) -> String {
    columns
        .iter()
        .map(|c| c.header())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Columns the core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LogicalColumn {
    UnitHolderId,
    ContributorName,
    SocialSecurityNumber,
    DateOfBirth,
    Withdrawals,
    Year,
    Month,
}

impl LogicalColumn {
    pub const ALL: [LogicalColumn; 7] = [
        LogicalColumn::UnitHolderId,
        LogicalColumn::ContributorName,
        LogicalColumn::SocialSecurityNumber,
        LogicalColumn::DateOfBirth,
        LogicalColumn::Withdrawals,
        LogicalColumn::Year,
        LogicalColumn::Month,
    ];

    /// Header written on export.
    pub fn header(self) -> &'static str {
        match self {
            LogicalColumn::UnitHolderId => "Unit Holder ID",
            LogicalColumn::ContributorName => "Contributor Name",
            LogicalColumn::SocialSecurityNumber => "Social Security #",
            LogicalColumn::DateOfBirth => "Date_of_Birth",
            LogicalColumn::Withdrawals => "Withdrawals",
            LogicalColumn::Year => "Year",
            LogicalColumn::Month => "Month",
        }
    }

    /// Accepted header spellings, already normalized, in order of preference.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            LogicalColumn::UnitHolderId => &["unitholderid", "unitholder", "holderid"],
            LogicalColumn::ContributorName => &["contributorname", "name", "fullname"],
            LogicalColumn::SocialSecurityNumber => &[
                "socialsecurity",
                "socialsecuritynumber",
                "socialsecurityno",
                "ssnitnumber",
                "ssnitno",
                "ssn",
            ],
            LogicalColumn::DateOfBirth => &["dateofbirth", "combined", "dob", "birthdate"],
            LogicalColumn::Withdrawals => &["withdrawals", "withdrawal"],
            LogicalColumn::Year => &["year"],
            LogicalColumn::Month => &["month"],
        }
    }
}

impl fmt::Display for LogicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Lowercase and drop everything that is not a letter or digit.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Result of resolving a header row: where each logical column lives, and
/// which other columns are carried along.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    logical: Vec<(LogicalColumn, usize)>,
    extra: Vec<usize>,
    headers: Vec<String>,
}

impl ColumnMap {
    pub fn resolve(headers: &[String]) -> Result<Self, SchemaError> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        let mut logical = Vec::with_capacity(LogicalColumn::ALL.len());
        let mut missing = Vec::new();
        for column in LogicalColumn::ALL {
            let found = column
                .aliases()
                .iter()
                .find_map(|alias| normalized.iter().position(|n| n == alias));
            match found {
                Some(idx) => logical.push((column, idx)),
                None => missing.push(column),
            }
        }

        if !missing.is_empty() {
            return Err(SchemaError { missing });
        }

        let extra = (0..headers.len())
            .filter(|idx| !logical.iter().any(|(_, used)| used == idx))
            .collect();

        Ok(Self {
            logical,
            extra,
            headers: headers.to_vec(),
        })
    }

    /// Index of the header backing a logical column.
    pub fn index_of(&self, column: LogicalColumn) -> usize {
        self.logical
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, idx)| *idx)
            .unwrap_or_default()
    }

    /// Actual header name backing a logical column.
    pub fn header_of(&self, column: LogicalColumn) -> &str {
        &self.headers[self.index_of(column)]
    }

    /// Indices of the carried-through columns, in file order.
    pub fn extra_indices(&self) -> &[usize] {
        &self.extra
    }

    pub fn extra_headers(&self) -> Vec<String> {
        self.extra.iter().map(|&i| self.headers[i].clone()).collect()
    }
}
