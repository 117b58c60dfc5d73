//! CSV Data Loader Module
//! Locates the source file, reads it with Polars and coerces every row into
//! a `ContributorRecord`.

use crate::data::coerce::{self, CoercionReport};
use crate::data::record::{ContributorRecord, ContributorTable};
use crate::data::schema::{ColumnMap, LogicalColumn, SchemaError};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// File picked over any other CSV in the data directory.
pub const DEFAULT_SOURCE_FILE: &str = "Combined.csv";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("No CSV source found at {}", .path.display())]
    SourceNotFound { path: PathBuf },
    #[error("{}: {source}", .file.display())]
    Schema {
        file: PathBuf,
        #[source]
        source: SchemaError,
    },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
}

/// Pick the input file in `dir`: `preferred` if it exists, otherwise the
/// first other `.csv` file in name order.
pub fn discover_source(dir: &Path, preferred: &str) -> Result<PathBuf, LoaderError> {
    let not_found = || LoaderError::SourceNotFound {
        path: dir.to_path_buf(),
    };

    let entries = std::fs::read_dir(dir).map_err(|_| not_found())?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    candidates.sort();

    if let Some(path) = candidates
        .iter()
        .find(|path| path.file_name().is_some_and(|name| name == preferred))
    {
        return Ok(path.clone());
    }

    candidates.into_iter().next().ok_or_else(not_found)
}

/// Handles CSV file loading with Polars.
pub struct DataLoader {
    preferred_file: String,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_FILE)
    }
}

impl DataLoader {
    pub fn new(preferred_file: impl Into<String>) -> Self {
        Self {
            preferred_file: preferred_file.into(),
        }
    }

    /// Discover the source file in `dir` and load it.
    pub fn load_from_dir(&self, dir: &Path) -> Result<ContributorTable, LoaderError> {
        let path = discover_source(dir, &self.preferred_file)?;
        self.load_csv(&path)
    }

    /// Load a CSV file into the canonical table.
    pub fn load_csv(&self, path: &Path) -> Result<ContributorTable, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }

        // Every column as text; coercion happens per cell below
        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;

        let headers: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let columns = ColumnMap::resolve(&headers).map_err(|source| LoaderError::Schema {
            file: path.to_path_buf(),
            source,
        })?;

        for column in LogicalColumn::ALL {
            debug!("'{}' read from column '{}'", column, columns.header_of(column));
        }

        let table = Self::build_table(&df, &headers, &columns, path)?;

        let contributors: HashSet<&str> = table
            .records
            .iter()
            .map(|r| r.unit_holder_id.as_str())
            .collect();
        info!(
            "Data loaded from {}: {} rows, {} contributors",
            path.display(),
            table.len(),
            contributors.len()
        );
        if table.is_empty() {
            warn!("{} has a header row but no records", path.display());
        }
        if !table.report.is_clean() {
            for (column, count) in table.report.counts() {
                warn!("{} value(s) in '{}' could not be coerced", count, column);
            }
        }

        Ok(table)
    }

    fn build_table(
        df: &DataFrame,
        headers: &[String],
        columns: &ColumnMap,
        path: &Path,
    ) -> Result<ContributorTable, LoaderError> {
        let text_columns: Vec<Column> = headers
            .iter()
            .map(|name| df.column(name).and_then(|c| c.cast(&DataType::String)))
            .collect::<PolarsResult<_>>()?;
        let cells: Vec<&StringChunked> = text_columns
            .iter()
            .map(|c| c.str())
            .collect::<PolarsResult<_>>()?;

        let cell = |column: LogicalColumn, row: usize| cells[columns.index_of(column)].get(row);

        let mut report = CoercionReport::default();
        let mut records = Vec::with_capacity(df.height());

        for row in 0..df.height() {
            let social_security_number =
                coerce::parse_ssn(cell(LogicalColumn::SocialSecurityNumber, row));
            let date_of_birth = coerce::parse_date_of_birth(cell(LogicalColumn::DateOfBirth, row));
            let year = coerce::parse_year(cell(LogicalColumn::Year, row));
            let month = coerce::parse_month(cell(LogicalColumn::Month, row));
            let (withdrawal_amount, bad_withdrawal) =
                coerce::parse_withdrawal(cell(LogicalColumn::Withdrawals, row));

            report.check(row, LogicalColumn::SocialSecurityNumber, &social_security_number);
            report.check(row, LogicalColumn::DateOfBirth, &date_of_birth);
            report.check(row, LogicalColumn::Year, &year);
            report.check(row, LogicalColumn::Month, &month);
            if let Some(raw) = bad_withdrawal {
                report.record(row, LogicalColumn::Withdrawals, &raw);
            }

            records.push(ContributorRecord {
                row,
                unit_holder_id: coerce::parse_text(cell(LogicalColumn::UnitHolderId, row)),
                contributor_name: coerce::parse_text(cell(LogicalColumn::ContributorName, row)),
                social_security_number,
                date_of_birth,
                withdrawal_amount,
                year,
                month,
                month_label: coerce::parse_text(cell(LogicalColumn::Month, row)),
                extra: columns
                    .extra_indices()
                    .iter()
                    .map(|&idx| cells[idx].get(row).map(str::to_string))
                    .collect(),
            });
        }

        for w in &report.warnings {
            debug!("row {}: '{}' kept as \"{}\"", w.row, w.column, w.raw);
        }

        Ok(ContributorTable {
            source: path.to_path_buf(),
            records,
            extra_columns: columns.extra_headers(),
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::Field;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str =
        "Unit Holder ID,Contributor Name,Social Security #,Date_of_Birth,Withdrawals,Year,Month,Address";

    fn write_csv(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut body = String::from(HEADER);
        for row in rows {
            body.push('\n');
            body.push_str(row);
        }
        body.push('\n');
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn prefers_combined_csv() {
        let dir = tempdir().unwrap();
        write_csv(dir.path(), "a_first.csv", &[]);
        write_csv(dir.path(), "Combined.csv", &[]);

        let found = discover_source(dir.path(), DEFAULT_SOURCE_FILE).unwrap();
        assert_eq!(found.file_name().unwrap(), "Combined.csv");
    }

    #[test]
    fn falls_back_to_first_csv_by_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "not a table").unwrap();
        write_csv(dir.path(), "march.CSV", &[]);
        write_csv(dir.path(), "january.csv", &[]);

        let found = discover_source(dir.path(), DEFAULT_SOURCE_FILE).unwrap();
        assert_eq!(found.file_name().unwrap(), "january.csv");
    }

    #[test]
    fn empty_directory_is_source_not_found() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "not a table").unwrap();

        let err = discover_source(dir.path(), DEFAULT_SOURCE_FILE).unwrap_err();
        assert!(matches!(err, LoaderError::SourceNotFound { .. }));

        let missing = dir.path().join("nope");
        let err = DataLoader::default().load_from_dir(&missing).unwrap_err();
        assert!(matches!(err, LoaderError::SourceNotFound { .. }));

        let err = DataLoader::default()
            .load_csv(&dir.path().join("Combined.csv"))
            .unwrap_err();
        assert!(err.to_string().contains("Combined.csv"));
    }

    #[test]
    fn missing_column_is_schema_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Combined.csv");
        fs::write(&path, "Unit Holder ID,Contributor Name,Year,Month\nUH001,Ama,2021,1\n").unwrap();

        let err = DataLoader::default().load_csv(&path).unwrap_err();
        match err {
            LoaderError::Schema { file, source } => {
                assert_eq!(file, path);
                assert!(source.missing.contains(&LogicalColumn::Withdrawals));
                assert!(source.missing.contains(&LogicalColumn::DateOfBirth));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn coerces_cells_and_keeps_bad_values() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "Combined.csv",
            &[
                "UH001,Ama Mensah,C018-0010-90012,12/05/1958,\"1,500.00\",2021,June,Accra",
                "UH002,Kofi Boateng,unknown,not a date,,2020,Smarch,",
                " UH003 ,Yaw Asante,D018001090013,1990-01-31,-20,2022.0,3,Kumasi",
            ],
        );

        let table = DataLoader::default().load_csv(&path).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.extra_columns, vec!["Address".to_string()]);

        let ama = &table.records[0];
        assert_eq!(ama.unit_holder_id, "UH001");
        assert_eq!(ama.social_security_number, Field::Parsed("C018001090012".into()));
        assert_eq!(
            ama.date_of_birth,
            Field::Parsed(NaiveDate::from_ymd_opt(1958, 5, 12).unwrap())
        );
        assert_eq!(ama.withdrawal_amount, 1500.0);
        assert_eq!(ama.period(), Some((2021, 6)));
        assert_eq!(ama.month_label, "June");
        assert_eq!(table.extra_value(ama, "Address"), Some("Accra"));

        let kofi = &table.records[1];
        assert_eq!(kofi.social_security_number, Field::Invalid("unknown".into()));
        assert_eq!(kofi.date_of_birth, Field::Invalid("not a date".into()));
        assert_eq!(kofi.withdrawal_amount, 0.0);
        assert_eq!(kofi.period(), None);

        let yaw = &table.records[2];
        assert_eq!(yaw.unit_holder_id, "UH003");
        assert_eq!(yaw.withdrawal_amount, 0.0);
        assert_eq!(yaw.period(), Some((2022, 3)));

        let counts = table.report.counts();
        assert_eq!(counts.get(&LogicalColumn::SocialSecurityNumber), Some(&1));
        assert_eq!(counts.get(&LogicalColumn::DateOfBirth), Some(&1));
        assert_eq!(counts.get(&LogicalColumn::Month), Some(&1));
        assert_eq!(counts.get(&LogicalColumn::Withdrawals), Some(&1));
        assert_eq!(counts.get(&LogicalColumn::Year), None);
    }
}
