//! SSNIT Records - contributor record browser
//!
//! Loads a CSV extract of contributor records, cleans it, and answers
//! lookup, withdrawal and retiree queries from the command line.

mod cli;
mod config;
mod data;
mod stats;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use cli::{Cli, Command, Session};
use config::Settings;
use std::io;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);
    info!("Starting ssnit-records v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::from_cli(&args);
    let table = settings
        .load_table()
        .context("Could not load contributor records")?;

    let today = Local::now().date_naive();
    let session = Session::new(&table, &settings, today);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &args.command {
        Command::Shell => cli::run_shell(&session, io::stdin().lock(), &mut out),
        command => session.run(&mut out, command),
    }
}
