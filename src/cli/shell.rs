//! Interactive prompt: one query per line until `quit` or end of input.

use crate::cli::Session;
use crate::data::{AgeRange, WithdrawalRange};
use anyhow::Result;
use std::io::{BufRead, Write};
use tracing::debug;

const PROMPT: &str = "ssnit> ";

const HELP: &str = "\
Commands:
  lookup ID                   most recent record for a Unit Holder ID
  history ID                  most recent record plus every earlier one
  withdrawals [MIN [MAX]]     current records with a withdrawal
  retirees [MIN [MAX]]        current records by age (default: retirement age and up)
  info                        loaded file and data quality
  help                        this text
  quit                        leave";

fn parse_bounds<T: std::str::FromStr>(args: &str) -> Result<(Option<T>, Option<T>), String> {
    let mut parts = args.split_whitespace();
    let mut next = |name: &str| -> Result<Option<T>, String> {
        parts
            .next()
            .map(|s| s.parse::<T>().map_err(|_| format!("{name} '{s}' is not a number")))
            .transpose()
    };
    let min = next("minimum")?;
    let max = next("maximum")?;
    if parts.next().is_some() {
        return Err("expected at most two bounds".to_string());
    }
    Ok((min, max))
}

/// Run queries read from `input` until `quit` or end of input. Query errors
/// are printed and the loop carries on.
pub fn run_shell<R: BufRead, W: Write>(session: &Session<'_>, input: R, out: &mut W) -> Result<()> {
    writeln!(out, "Type 'help' for commands.")?;
    let mut lines = input.lines();

    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        let Some(line) = lines.next().transpose()? else {
            writeln!(out)?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map(|(c, r)| (c, r.trim()))
            .unwrap_or((line, ""));
        debug!("shell command '{}' args '{}'", command, rest);

        let outcome = match command.to_lowercase().as_str() {
            "quit" | "exit" | "q" => break,
            "help" | "?" => writeln!(out, "{HELP}").map_err(anyhow::Error::from),
            "info" => session.info(out),
            "lookup" => session.lookup(out, rest, false, None),
            "history" => session.lookup(out, rest, true, None),
            "withdrawals" => match parse_bounds::<f64>(rest) {
                Ok((min, max)) => session.withdrawals(out, WithdrawalRange { min, max }, None),
                Err(msg) => Err(anyhow::anyhow!(msg)),
            },
            "retirees" => match parse_bounds::<u32>(rest) {
                Ok((min, max)) => {
                    let range = AgeRange {
                        min: min.unwrap_or(session.retirement_age()),
                        max,
                    };
                    session.retirees(out, range, None)
                }
                Err(msg) => Err(anyhow::anyhow!(msg)),
            },
            other => {
                writeln!(out, "Unknown command '{other}'. Type 'help' for commands.")?;
                Ok(())
            }
        };

        if let Err(e) = outcome {
            writeln!(out, "ERROR: {e}")?;
        }
    }
    Ok(())
}
