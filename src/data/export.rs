//! CSV Export Module
//! Writes a result set back out with the same column semantics as the input.

use crate::data::record::{ContributorRecord, ContributorTable};
use crate::data::schema::LogicalColumn;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Header of the computed age column.
pub const AGE_COLUMN: &str = "Age";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Cannot create {}: {source}", .path.display())]
    Create {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("{ages} ages given for {records} records")]
    AgeMismatch { records: usize, ages: usize },
}

/// Build the export frame: logical columns under their canonical headers,
/// then the carried-through columns, then `Age` when given.
pub fn to_dataframe(
    table: &ContributorTable,
    records: &[&ContributorRecord],
    ages: Option<&[u32]>,
) -> Result<DataFrame, ExportError> {
    if let Some(ages) = ages {
        if ages.len() != records.len() {
            return Err(ExportError::AgeMismatch {
                records: records.len(),
                ages: ages.len(),
            });
        }
    }

    let text = |f: fn(&ContributorRecord) -> Option<String>| -> Vec<Option<String>> {
        records.iter().map(|r| f(*r)).collect()
    };

    let mut columns = vec![
        Column::new(
            LogicalColumn::UnitHolderId.header().into(),
            text(|r| Some(r.unit_holder_id.clone())),
        ),
        Column::new(
            LogicalColumn::ContributorName.header().into(),
            text(|r| Some(r.contributor_name.clone())),
        ),
        Column::new(
            LogicalColumn::SocialSecurityNumber.header().into(),
            text(|r| r.social_security_number.as_cell()),
        ),
        Column::new(
            LogicalColumn::DateOfBirth.header().into(),
            text(|r| r.date_of_birth.as_cell()),
        ),
        Column::new(
            LogicalColumn::Withdrawals.header().into(),
            records.iter().map(|r| r.withdrawal_amount).collect::<Vec<f64>>(),
        ),
        Column::new(LogicalColumn::Year.header().into(), text(|r| r.year.as_cell())),
        Column::new(
            LogicalColumn::Month.header().into(),
            text(|r| Some(r.month_label.clone()).filter(|m| !m.is_empty())),
        ),
    ];

    for (idx, name) in table.extra_columns.iter().enumerate() {
        let values: Vec<Option<String>> = records
            .iter()
            .map(|r| r.extra.get(idx).cloned().flatten())
            .collect();
        columns.push(Column::new(name.as_str().into(), values));
    }

    if let Some(ages) = ages {
        columns.push(Column::new(AGE_COLUMN.into(), ages.to_vec()));
    }

    Ok(DataFrame::new(columns)?)
}

/// Write `records` to `path` as CSV. Returns the number of rows written.
pub fn export_records(
    path: &Path,
    table: &ContributorTable,
    records: &[&ContributorRecord],
    ages: Option<&[u32]>,
) -> Result<usize, ExportError> {
    let mut df = to_dataframe(table, records, ages)?;

    let mut file = File::create(path).map_err(|source| ExportError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    info!("Exported {} rows to {}", df.height(), path.display());
    Ok(df.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::DataLoader;
    use crate::data::processor::{AgeRange, Consolidator, WithdrawalRange};
    use crate::data::record::Field;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;

    const SOURCE: &str = "\
Unit Holder ID,Contributor Name,Social Security #,Date_of_Birth,Withdrawals,Year,Month,Employer Code,Address
UH001,Ama Mensah,C018001090012,12/05/1958,500,2021,June,E100,\"Accra, Osu\"
UH001,Ama Mensah,C018001090012,12/05/1958,0,2020,Jan,E100,\"Accra, Osu\"
UH002,Kofi Boateng,pending,not a date,125.5,2022,3,E200,
UH003,Yaw Asante,D018001090013,1990-01-31,0,2022,Smarch,E300,Kumasi
";

    #[test]
    fn withdrawal_export_round_trips_identifiers() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Combined.csv");
        fs::write(&source, SOURCE).unwrap();

        let table = DataLoader::default().load_csv(&source).unwrap();
        let consolidator = Consolidator::build(&table);
        let view = consolidator.filter_withdrawals(WithdrawalRange::default());

        let out = dir.path().join("withdrawals.csv");
        let written = export_records(&out, &table, &view.records, None).unwrap();
        assert_eq!(written, 2);

        let reloaded = DataLoader::default().load_csv(&out).unwrap();
        let ids: BTreeSet<&str> = reloaded
            .records
            .iter()
            .map(|r| r.unit_holder_id.as_str())
            .collect();
        assert_eq!(ids, BTreeSet::from(["UH001", "UH002"]));

        // Bad cells come back exactly as they went out.
        let kofi = &reloaded.records[1];
        assert_eq!(kofi.social_security_number, Field::Invalid("pending".into()));
        assert_eq!(kofi.date_of_birth, Field::Invalid("not a date".into()));
        assert_eq!(kofi.withdrawal_amount, 125.5);

        let ama = &reloaded.records[0];
        assert_eq!(
            ama.date_of_birth,
            Field::Parsed(NaiveDate::from_ymd_opt(1958, 5, 12).unwrap())
        );
        assert_eq!(ama.month_label, "June");
        assert_eq!(reloaded.extra_value(ama, "Address"), Some("Accra, Osu"));
        assert_eq!(reloaded.extra_value(ama, "Employer Code"), Some("E100"));
    }

    #[test]
    fn age_export_appends_age_column() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Combined.csv");
        fs::write(&source, SOURCE).unwrap();

        let table = DataLoader::default().load_csv(&source).unwrap();
        let consolidator = Consolidator::build(&table);
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let view = consolidator.filter_by_age_range(AgeRange { min: 30, max: None }, today);

        let records: Vec<&ContributorRecord> = view.records.iter().map(|r| r.record).collect();
        let ages: Vec<u32> = view.records.iter().map(|r| r.age).collect();
        assert_eq!(ages, vec![66, 34]);

        let df = to_dataframe(&table, &records, Some(&ages)).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names().last().unwrap().as_str(), AGE_COLUMN);

        let out = dir.path().join("retirees.csv");
        export_records(&out, &table, &records, Some(&ages)).unwrap();
        let reloaded = DataLoader::default().load_csv(&out).unwrap();
        assert_eq!(reloaded.extra_columns.last().unwrap(), AGE_COLUMN);
        assert_eq!(reloaded.extra_value(&reloaded.records[1], AGE_COLUMN), Some("34"));
    }

    #[test]
    fn mismatched_ages_are_rejected() {
        let err = to_dataframe(&crate::data::record::fixtures::table(vec![]), &[], Some(&[61]))
            .unwrap_err();
        assert!(matches!(err, ExportError::AgeMismatch { records: 0, ages: 1 }));
    }
}
