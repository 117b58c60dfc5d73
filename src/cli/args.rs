//! Command-line arguments.

use crate::data::{DEFAULT_SOURCE_FILE, RETIREMENT_AGE};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ssnit-records",
    version,
    about = "Browse SSNIT contributor records from a CSV extract"
)]
pub struct Cli {
    /// Directory searched for the source CSV
    #[arg(long, env = "SSNIT_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// File preferred when several CSV files are present
    #[arg(long, env = "SSNIT_PREFERRED_FILE", default_value = DEFAULT_SOURCE_FILE)]
    pub preferred_file: String,

    /// Load this file instead of searching the data directory
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Age from which a contributor counts as a retiree
    #[arg(long, env = "SSNIT_RETIREMENT_AGE", default_value_t = RETIREMENT_AGE)]
    pub retirement_age: u32,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show the loaded file, its size and any cells that failed to parse
    Info,
    /// Show the most recent record of one contributor
    Lookup {
        unit_holder_id: String,
        /// Also list every record of the contributor, oldest first
        #[arg(long)]
        history: bool,
        /// Write the result to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// List contributors whose current record has a withdrawal
    Withdrawals {
        #[arg(long)]
        min: Option<f64>,
        #[arg(long)]
        max: Option<f64>,
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// List contributors by age (default: the retirement age and above)
    Retirees {
        #[arg(long)]
        min_age: Option<u32>,
        #[arg(long)]
        max_age: Option<u32>,
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Interactive prompt over the loaded data
    Shell,
}
