//! Data Processor Module
//! Consolidates rows into per-contributor histories and answers the lookup,
//! withdrawal and age queries against the current records.

use crate::data::record::{ContributorRecord, ContributorTable};
use crate::stats::{AgeSummary, StatsCalculator, WithdrawalSummary};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Default retiree threshold, in whole years.
pub const RETIREMENT_AGE: u32 = 60;

/// All records of one contributor, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ContributorHistory<'a> {
    pub unit_holder_id: &'a str,
    pub current: &'a ContributorRecord,
    pub history: Vec<&'a ContributorRecord>,
}

impl ContributorHistory<'_> {
    /// Sort key: valid periods in order, invalid ones after them.
    fn order(mut records: Vec<&ContributorRecord>) -> Vec<&ContributorRecord> {
        // `sort_by_key` is stable, so equal periods stay in file order
        records.sort_by_key(|r| match r.period() {
            Some(period) => (false, period),
            None => (true, (0, 0)),
        });
        records
    }
}

/// Inclusive bounds on the withdrawal amount; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WithdrawalRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl WithdrawalRange {
    fn contains(&self, amount: f64) -> bool {
        self.min.map_or(true, |min| amount >= min) && self.max.map_or(true, |max| amount <= max)
    }
}

/// Inclusive age bounds; `max: None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeRange {
    pub min: u32,
    pub max: Option<u32>,
}

impl AgeRange {
    fn contains(&self, age: u32) -> bool {
        age >= self.min && self.max.map_or(true, |max| age <= max)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalView<'a> {
    pub records: Vec<&'a ContributorRecord>,
    pub summary: WithdrawalSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgedRecord<'a> {
    pub age: u32,
    pub record: &'a ContributorRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgeView<'a> {
    pub records: Vec<AgedRecord<'a>>,
    pub summary: AgeSummary,
}

/// Shape of the loaded data set.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetOverview {
    pub rows: usize,
    pub contributors: usize,
    pub contributors_with_history: usize,
    pub years: Vec<i32>,
    pub degraded_cells: usize,
}

/// Current-record index over a borrowed table. Built once, then queried.
pub struct Consolidator<'a> {
    table: &'a ContributorTable,
    contributors: BTreeMap<&'a str, ContributorHistory<'a>>,
}

impl<'a> Consolidator<'a> {
    /// Group rows by unit holder, order each group chronologically and take
    /// the last dated entry as the current record. A contributor with no
    /// valid period at all gets the last row of the file instead.
    pub fn build(table: &'a ContributorTable) -> Self {
        let mut groups: BTreeMap<&'a str, Vec<&'a ContributorRecord>> = BTreeMap::new();
        for record in &table.records {
            groups
                .entry(record.unit_holder_id.as_str())
                .or_default()
                .push(record);
        }

        let contributors = groups
            .into_par_iter()
            .filter_map(|(id, records)| {
                let history = ContributorHistory::order(records);
                // Invalid periods sit at the end; prefer the latest dated record
                let current = history
                    .iter()
                    .rev()
                    .find(|r| r.period().is_some())
                    .or_else(|| history.last())
                    .copied()?;
                Some((
                    id,
                    ContributorHistory {
                        unit_holder_id: id,
                        current,
                        history,
                    },
                ))
            })
            .collect();

        Self {
            table,
            contributors,
        }
    }

    pub fn table(&self) -> &'a ContributorTable {
        self.table
    }

    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    /// Every contributor, in unit holder order.
    pub fn contributors(&self) -> impl Iterator<Item = &ContributorHistory<'a>> {
        self.contributors.values()
    }

    /// Current records, in unit holder order.
    pub fn current_records(&self) -> impl Iterator<Item = &'a ContributorRecord> + '_ {
        self.contributors.values().map(|h| h.current)
    }

    /// Exact match on the unit holder ID. `None` is a normal outcome.
    pub fn lookup_by_id(&self, id: &str) -> Option<&ContributorHistory<'a>> {
        self.contributors.get(id)
    }

    /// Current records with a non-zero withdrawal inside `range`.
    pub fn filter_withdrawals(&self, range: WithdrawalRange) -> WithdrawalView<'a> {
        let records: Vec<&'a ContributorRecord> = self
            .current_records()
            .filter(|r| r.withdrawal_amount > 0.0 && range.contains(r.withdrawal_amount))
            .collect();

        let amounts: Vec<f64> = records.iter().map(|r| r.withdrawal_amount).collect();
        let summary = StatsCalculator::withdrawal_summary(&amounts);

        WithdrawalView { records, summary }
    }

    /// Current records whose age on `today` falls inside `range`. Unknown
    /// birth dates never match.
    pub fn filter_by_age_range(&self, range: AgeRange, today: NaiveDate) -> AgeView<'a> {
        let current: Vec<&'a ContributorRecord> = self.current_records().collect();
        let records: Vec<AgedRecord<'a>> = current
            .par_iter()
            .filter_map(|&record| {
                let age = record.age_on(today)?;
                range.contains(age).then_some(AgedRecord { age, record })
            })
            .collect();

        let ages: Vec<u32> = records.iter().map(|r| r.age).collect();
        let summary = StatsCalculator::age_summary(&ages);

        AgeView { records, summary }
    }

    pub fn overview(&self) -> DatasetOverview {
        let years: BTreeSet<i32> = self
            .table
            .records
            .iter()
            .filter_map(|r| r.year.parsed().copied())
            .collect();

        DatasetOverview {
            rows: self.table.len(),
            contributors: self.len(),
            contributors_with_history: self
                .contributors()
                .filter(|h| h.history.len() > 1)
                .count(),
            years: years.into_iter().collect(),
            degraded_cells: self.table.report.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::fixtures::{record, table};
    use crate::data::record::Field;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn periods(h: &ContributorHistory<'_>) -> Vec<Option<(i32, u32)>> {
        h.history.iter().map(|r| r.period()).collect()
    }

    #[test]
    fn latest_period_is_current_and_history_is_ordered() {
        let t = table(vec![
            record(0, "UH001", 2020, 1),
            record(1, "UH002", 2019, 3),
            record(2, "UH001", 2021, 6),
            record(3, "UH001", 2020, 12),
        ]);
        let c = Consolidator::build(&t);

        let h = c.lookup_by_id("UH001").unwrap();
        assert_eq!(h.current.period(), Some((2021, 6)));
        assert_eq!(
            periods(h),
            vec![Some((2020, 1)), Some((2020, 12)), Some((2021, 6))]
        );
        assert_eq!(c.lookup_by_id("UH002").unwrap().history.len(), 1);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn invalid_months_sort_last_in_file_order() {
        let mut bad_a = record(0, "UH001", 2023, 1);
        bad_a.month = Field::Invalid("Smarch".into());
        let mut bad_b = record(2, "UH001", 2019, 1);
        bad_b.month = Field::Missing;
        let t = table(vec![bad_a, record(1, "UH001", 2021, 6), bad_b, record(3, "UH001", 2020, 2)]);
        let c = Consolidator::build(&t);

        let h = c.lookup_by_id("UH001").unwrap();
        let rows: Vec<usize> = h.history.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![3, 1, 0, 2]);
        assert_eq!(h.current.row, 1);
    }

    #[test]
    fn undated_contributor_falls_back_to_last_row() {
        let mut a = record(0, "UH001", 2021, 1);
        a.month = Field::Invalid("Smarch".into());
        let mut b = record(1, "UH001", 2022, 1);
        b.year = Field::Missing;
        let t = table(vec![a, b]);
        let c = Consolidator::build(&t);

        assert_eq!(c.lookup_by_id("UH001").unwrap().current.row, 1);
    }

    #[test]
    fn equal_periods_keep_file_order() {
        let t = table(vec![
            record(0, "UH001", 2021, 6),
            record(1, "UH001", 2021, 6),
            record(2, "UH001", 2020, 6),
        ]);
        let c = Consolidator::build(&t);

        let h = c.lookup_by_id("UH001").unwrap();
        let rows: Vec<usize> = h.history.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![2, 0, 1]);
        assert_eq!(h.current.row, 1);
    }

    #[test]
    fn lookup_is_exact() {
        let t = table(vec![record(0, "UH001", 2021, 1)]);
        let c = Consolidator::build(&t);

        assert!(c.lookup_by_id("UH001").is_some());
        assert!(c.lookup_by_id("uh001").is_none());
        assert!(c.lookup_by_id("UH00").is_none());
        assert!(c.lookup_by_id("UH001 ").is_none());
    }

    #[test]
    fn withdrawals_use_current_records_only() {
        let mut old = record(0, "UH001", 2020, 1);
        old.withdrawal_amount = 900.0;
        let mut a = record(1, "UH001", 2021, 1);
        a.withdrawal_amount = 0.0;
        let mut b = record(2, "UH002", 2021, 1);
        b.withdrawal_amount = 250.0;
        let mut d = record(3, "UH003", 2021, 1);
        d.withdrawal_amount = 1000.0;
        let t = table(vec![old, a, b, d]);
        let c = Consolidator::build(&t);

        let view = c.filter_withdrawals(WithdrawalRange::default());
        let ids: Vec<&str> = view.records.iter().map(|r| r.unit_holder_id.as_str()).collect();
        assert_eq!(ids, vec!["UH002", "UH003"]);
        assert_eq!(view.summary.count, 2);
        assert_eq!(view.summary.total, 1250.0);
        assert_eq!(view.summary.mean, Some(625.0));

        let narrowed = c.filter_withdrawals(WithdrawalRange {
            min: Some(250.0),
            max: Some(500.0),
        });
        assert_eq!(narrowed.records.len(), 1);
        assert_eq!(narrowed.summary.total, 250.0);

        let none = c.filter_withdrawals(WithdrawalRange {
            min: Some(5000.0),
            max: None,
        });
        assert!(none.records.is_empty());
        assert_eq!(none.summary.mean, None);
    }

    #[test]
    fn age_filter_excludes_unknown_birth_dates() {
        let today = ymd(2024, 10, 16);
        let mut turns_sixty_today = record(0, "UH001", 2024, 1);
        turns_sixty_today.date_of_birth = Field::Parsed(ymd(1964, 10, 16));
        let mut turns_sixty_tomorrow = record(1, "UH002", 2024, 1);
        turns_sixty_tomorrow.date_of_birth = Field::Parsed(ymd(1964, 10, 17));
        let mut unknown = record(2, "UH003", 2024, 1);
        unknown.date_of_birth = Field::Invalid("not a date".into());
        unknown.withdrawal_amount = 10.0;
        let mut old = record(3, "UH004", 2024, 1);
        old.date_of_birth = Field::Parsed(ymd(1940, 1, 1));
        let t = table(vec![turns_sixty_today, turns_sixty_tomorrow, unknown, old]);
        let c = Consolidator::build(&t);

        let view = c.filter_by_age_range(AgeRange { min: RETIREMENT_AGE, max: None }, today);
        let found: Vec<(&str, u32)> = view
            .records
            .iter()
            .map(|r| (r.record.unit_holder_id.as_str(), r.age))
            .collect();
        assert_eq!(found, vec![("UH001", 60), ("UH004", 84)]);
        assert_eq!(view.summary.count, 2);
        assert_eq!(view.summary.aged_60_to_65, 1);

        let bounded = c.filter_by_age_range(AgeRange { min: 0, max: Some(70) }, today);
        let ids: Vec<&str> = bounded
            .records
            .iter()
            .map(|r| r.record.unit_holder_id.as_str())
            .collect();
        assert_eq!(ids, vec!["UH001", "UH002"]);

        // Unknown birth dates still show up everywhere else.
        assert!(c.lookup_by_id("UH003").is_some());
        assert_eq!(c.filter_withdrawals(WithdrawalRange::default()).records.len(), 1);
    }

    #[test]
    fn overview_counts_contributors_and_years() {
        let t = table(vec![
            record(0, "UH001", 2020, 1),
            record(1, "UH001", 2021, 1),
            record(2, "UH002", 2021, 1),
        ]);
        let o = Consolidator::build(&t).overview();
        assert_eq!(o.rows, 3);
        assert_eq!(o.contributors, 2);
        assert_eq!(o.contributors_with_history, 1);
        assert_eq!(o.years, vec![2020, 2021]);
    }
}
