//! Command-line front end: argument parsing, command dispatch and the
//! interactive prompt.

mod args;
mod render;
mod shell;

pub use args::{Cli, Command};
pub use shell::run_shell;

use crate::config::{OutputFormat, Settings};
use crate::data::{
    export_records, AgeRange, Consolidator, ContributorRecord, ContributorTable, WithdrawalRange,
};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Shortest ID worth searching for.
const MIN_ID_LEN: usize = 3;

/// Trim user input and reject IDs too short to be real.
pub fn validate_unit_holder_id(input: &str) -> Result<&str, String> {
    let id = input.trim();
    if id.is_empty() {
        return Err("Please enter a Unit Holder ID".to_string());
    }
    let len = id.chars().count();
    if len < MIN_ID_LEN {
        return Err(format!(
            "Unit Holder ID seems too short (currently {len} characters)"
        ));
    }
    Ok(id)
}

#[derive(Serialize)]
struct LookupOutput<'a> {
    unit_holder_id: &'a str,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<&'a ContributorRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<&'a [&'a ContributorRecord]>,
}

/// A loaded table plus its consolidated view; every command runs against it.
pub struct Session<'a> {
    consolidator: Consolidator<'a>,
    settings: &'a Settings,
    today: NaiveDate,
}

impl<'a> Session<'a> {
    pub fn new(table: &'a ContributorTable, settings: &'a Settings, today: NaiveDate) -> Self {
        let consolidator = Consolidator::build(table);
        info!("{} contributors consolidated", consolidator.len());
        Self {
            consolidator,
            settings,
            today,
        }
    }

    fn table(&self) -> &'a ContributorTable {
        self.consolidator.table()
    }

    pub fn retirement_age(&self) -> u32 {
        self.settings.retirement_age
    }

    pub fn run<W: Write>(&self, out: &mut W, command: &Command) -> Result<()> {
        match command {
            Command::Info => self.info(out),
            Command::Lookup {
                unit_holder_id,
                history,
                export,
            } => self.lookup(out, unit_holder_id, *history, export.as_deref()),
            Command::Withdrawals { min, max, export } => self.withdrawals(
                out,
                WithdrawalRange {
                    min: *min,
                    max: *max,
                },
                export.as_deref(),
            ),
            Command::Retirees {
                min_age,
                max_age,
                export,
            } => self.retirees(
                out,
                AgeRange {
                    min: min_age.unwrap_or(self.retirement_age()),
                    max: *max_age,
                },
                export.as_deref(),
            ),
            Command::Shell => bail!("already in the interactive shell"),
        }
    }

    pub fn info<W: Write>(&self, out: &mut W) -> Result<()> {
        let overview = self.consolidator.overview();
        match self.settings.format {
            OutputFormat::Text => render::overview(out, self.table(), &overview)?,
            OutputFormat::Json => render::json(out, &overview)?,
        }
        Ok(())
    }

    pub fn lookup<W: Write>(
        &self,
        out: &mut W,
        input: &str,
        show_history: bool,
        export: Option<&Path>,
    ) -> Result<()> {
        let id = match validate_unit_holder_id(input) {
            Ok(id) => id,
            Err(msg) => bail!(msg),
        };

        let Some(found) = self.consolidator.lookup_by_id(id) else {
            match self.settings.format {
                OutputFormat::Text => render::not_found(out, id)?,
                OutputFormat::Json => render::json(
                    out,
                    &LookupOutput {
                        unit_holder_id: id,
                        found: false,
                        age: None,
                        current: None,
                        history: None,
                    },
                )?,
            }
            return Ok(());
        };

        match self.settings.format {
            OutputFormat::Text => {
                render::lookup(out, self.table(), found, show_history, self.today)?
            }
            OutputFormat::Json => render::json(
                out,
                &LookupOutput {
                    unit_holder_id: found.unit_holder_id,
                    found: true,
                    age: found.current.age_on(self.today),
                    current: Some(found.current),
                    history: show_history.then_some(found.history.as_slice()),
                },
            )?,
        }

        if let Some(path) = export {
            let records = if show_history {
                found.history.clone()
            } else {
                vec![found.current]
            };
            self.export(out, path, &records, None)?;
        }
        Ok(())
    }

    pub fn withdrawals<W: Write>(
        &self,
        out: &mut W,
        range: WithdrawalRange,
        export: Option<&Path>,
    ) -> Result<()> {
        let view = self.consolidator.filter_withdrawals(range);
        match self.settings.format {
            OutputFormat::Text => render::withdrawals(out, &view, self.today)?,
            OutputFormat::Json => render::json(out, &view)?,
        }

        if let Some(path) = export {
            self.export(out, path, &view.records, None)?;
        }
        Ok(())
    }

    pub fn retirees<W: Write>(
        &self,
        out: &mut W,
        range: AgeRange,
        export: Option<&Path>,
    ) -> Result<()> {
        let view = self.consolidator.filter_by_age_range(range, self.today);
        match self.settings.format {
            OutputFormat::Text => render::ages(out, &view, range.min)?,
            OutputFormat::Json => render::json(out, &view)?,
        }

        if let Some(path) = export {
            let records: Vec<&ContributorRecord> = view.records.iter().map(|r| r.record).collect();
            let ages: Vec<u32> = view.records.iter().map(|r| r.age).collect();
            self.export(out, path, &records, Some(&ages))?;
        }
        Ok(())
    }

    fn export<W: Write>(
        &self,
        out: &mut W,
        path: &Path,
        records: &[&ContributorRecord],
        ages: Option<&[u32]>,
    ) -> Result<()> {
        let written = export_records(path, self.table(), records, ages)
            .with_context(|| format!("exporting to {}", path.display()))?;
        if self.settings.format == OutputFormat::Text {
            writeln!(out, "\nExported {} record(s) to {}", written, path.display())?;
        }
        Ok(())
    }
}
