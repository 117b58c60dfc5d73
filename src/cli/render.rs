//! Text and JSON rendering of query results.

use crate::data::coerce::CoercionReport;
use crate::data::{
    AgeView, ContributorHistory, ContributorRecord, ContributorTable, DatasetOverview, Field,
    WithdrawalView,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::io::{self, Write};

const NOT_AVAILABLE: &str = "N/A";

/// `1234.5` as `1,234.50`.
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}

fn field_text<T: Display>(field: &Field<T>) -> String {
    match field {
        Field::Parsed(v) => v.to_string(),
        Field::Invalid(raw) => format!("{raw} (unverified)"),
        Field::Missing => NOT_AVAILABLE.to_string(),
    }
}

fn or_na(text: &str) -> &str {
    if text.is_empty() {
        NOT_AVAILABLE
    } else {
        text
    }
}

fn age_text(record: &ContributorRecord, today: NaiveDate) -> String {
    record
        .age_on(today)
        .map(|a| a.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

pub fn overview<W: Write>(
    out: &mut W,
    table: &ContributorTable,
    overview: &DatasetOverview,
) -> io::Result<()> {
    writeln!(out, "Data loaded from: {}", table.source.display())?;
    writeln!(out, "Rows:                      {}", overview.rows)?;
    writeln!(out, "Contributors:              {}", overview.contributors)?;
    writeln!(out, "With several records:      {}", overview.contributors_with_history)?;
    let years: Vec<String> = overview.years.iter().map(|y| y.to_string()).collect();
    writeln!(out, "Years:                     {}", or_na(&years.join(", ")))?;
    if !table.extra_columns.is_empty() {
        writeln!(out, "Other columns:             {}", table.extra_columns.join(", "))?;
    }
    coercion_report(out, &table.report)
}

fn coercion_report<W: Write>(out: &mut W, report: &CoercionReport) -> io::Result<()> {
    if report.is_clean() {
        return writeln!(out, "All cells parsed cleanly.");
    }
    writeln!(out, "Cells kept unparsed:       {}", report.len())?;
    for (column, count) in report.counts() {
        writeln!(out, "  {:<24}{}", column.header(), count)?;
    }
    Ok(())
}

pub fn not_found<W: Write>(out: &mut W, id: &str) -> io::Result<()> {
    writeln!(out, "No record found for Unit Holder ID: {id}")?;
    writeln!(out, "Please check the Unit Holder ID and try again.")
}

/// Current record of one contributor, optionally with the full history.
pub fn lookup<W: Write>(
    out: &mut W,
    table: &ContributorTable,
    found: &ContributorHistory<'_>,
    show_history: bool,
    today: NaiveDate,
) -> io::Result<()> {
    let current = found.current;
    writeln!(out, "Record found for Unit Holder ID: {}", found.unit_holder_id)?;

    if found.history.len() > 1 {
        writeln!(
            out,
            "Multiple records found ({} total) - showing the most recent record from {}",
            found.history.len(),
            field_text(&current.year)
        )?;
        let years: BTreeSet<i32> = found
            .history
            .iter()
            .filter_map(|r| r.year.parsed().copied())
            .collect();
        let years: Vec<String> = years.iter().map(|y| y.to_string()).collect();
        writeln!(out, "Available years: {}", years.join(", "))?;
    }

    writeln!(out)?;
    writeln!(out, "Personal Information")?;
    writeln!(out, "  Name:            {}", or_na(&current.contributor_name))?;
    writeln!(out, "  Unit Holder ID:  {}", current.unit_holder_id)?;
    writeln!(out, "  SSNIT Number:    {}", field_text(&current.social_security_number))?;
    writeln!(out, "  Date of Birth:   {}", field_text(&current.date_of_birth))?;
    writeln!(out, "  Age:             {}", age_text(current, today))?;
    writeln!(out, "  Year:            {}", field_text(&current.year))?;
    writeln!(out, "  Month:           {}", or_na(&current.month_label))?;
    writeln!(out, "  Withdrawals:     {}", format_amount(current.withdrawal_amount))?;

    let extras: Vec<(&String, &str)> = table
        .extra_columns
        .iter()
        .map(|name| (name, table.extra_value(current, name).unwrap_or(NOT_AVAILABLE)))
        .collect();
    if !extras.is_empty() {
        writeln!(out)?;
        writeln!(out, "Other Information")?;
        for (name, value) in extras {
            writeln!(out, "  {:<17}{}", format!("{name}:"), value)?;
        }
    }

    if show_history {
        writeln!(out)?;
        writeln!(out, "History (oldest first)")?;
        writeln!(out, "  {:<6} {:<10} {:>14}", "Year", "Month", "Withdrawals")?;
        for r in &found.history {
            writeln!(
                out,
                "  {:<6} {:<10} {:>14}",
                r.year.as_cell().unwrap_or_else(|| NOT_AVAILABLE.into()),
                or_na(&r.month_label),
                format_amount(r.withdrawal_amount)
            )?;
        }
    }
    Ok(())
}

pub fn withdrawals<W: Write>(
    out: &mut W,
    view: &WithdrawalView<'_>,
    today: NaiveDate,
) -> io::Result<()> {
    let s = &view.summary;
    if s.count == 0 {
        return writeln!(out, "No withdrawal records found.");
    }

    writeln!(out, "Withdrawal Records Summary")?;
    writeln!(out, "  Total Records:     {}", s.count)?;
    writeln!(out, "  Total Withdrawals: ₵{}", format_amount(s.total))?;
    if let Some(mean) = s.mean {
        writeln!(out, "  Average:           ₵{}", format_amount(mean))?;
    }
    if let Some(median) = s.median {
        writeln!(out, "  Median:            ₵{}", format_amount(median))?;
    }
    if let Some(largest) = s.largest {
        writeln!(out, "  Largest:           ₵{}", format_amount(largest))?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "{:<14} {:<28} {:<6} {:<10} {:>14} {:>4}",
        "Unit Holder ID", "Name", "Year", "Month", "Withdrawals", "Age"
    )?;
    for r in &view.records {
        writeln!(
            out,
            "{:<14} {:<28} {:<6} {:<10} {:>14} {:>4}",
            r.unit_holder_id,
            or_na(&r.contributor_name),
            r.year.as_cell().unwrap_or_else(|| NOT_AVAILABLE.into()),
            or_na(&r.month_label),
            format_amount(r.withdrawal_amount),
            age_text(r, today)
        )?;
    }
    Ok(())
}

pub fn ages<W: Write>(out: &mut W, view: &AgeView<'_>, min_age: u32) -> io::Result<()> {
    let s = &view.summary;
    if s.count == 0 {
        return writeln!(out, "No records found (age {min_age}+).");
    }

    writeln!(out, "Retiree Records Summary")?;
    writeln!(out, "  Total:        {}", s.count)?;
    if let Some(mean) = s.mean_age {
        writeln!(out, "  Average Age:  {mean:.1} years")?;
    }
    if let Some(oldest) = s.oldest {
        writeln!(out, "  Oldest:       {oldest} years")?;
    }
    writeln!(out, "  Ages 60-65:   {}", s.aged_60_to_65)?;
    writeln!(out)?;

    writeln!(
        out,
        "{:<14} {:<28} {:<12} {:>4} {:>14}",
        "Unit Holder ID", "Name", "Born", "Age", "Withdrawals"
    )?;
    for aged in &view.records {
        let r = aged.record;
        writeln!(
            out,
            "{:<14} {:<28} {:<12} {:>4} {:>14}",
            r.unit_holder_id,
            or_na(&r.contributor_name),
            field_text(&r.date_of_birth),
            aged.age,
            format_amount(r.withdrawal_amount)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_are_grouped_in_thousands() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.999), "1,000.00");
        assert_eq!(format_amount(1234567.5), "1,234,567.50");
        assert_eq!(format_amount(-1500.0), "-1,500.00");
    }

    #[test]
    fn fields_render_their_state() {
        assert_eq!(field_text(&Field::Parsed(2021)), "2021");
        assert_eq!(field_text::<i32>(&Field::Invalid("FY21".into())), "FY21 (unverified)");
        assert_eq!(field_text::<i32>(&Field::Missing), "N/A");
    }

    #[test]
    fn lookup_lists_carried_columns_by_name() {
        use crate::data::fixtures::{record, table};
        use crate::data::Consolidator;

        let mut r = record(0, "UH001", 2021, 6);
        r.extra = vec![Some("Accra".into()), None];
        let mut t = table(vec![r]);
        t.extra_columns = vec!["Address".into(), "Employer Code".into()];

        let consolidator = Consolidator::build(&t);
        let found = consolidator.lookup_by_id("UH001").unwrap();
        let mut out = Vec::new();
        lookup(&mut out, &t, found, false, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Other Information"));
        assert!(text.contains("  Address:         Accra"));
        assert!(text.contains("  Employer Code:   N/A"));
    }
}
