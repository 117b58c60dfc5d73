//! Runtime settings, resolved once from the command line and environment.

use crate::cli::Cli;
use crate::data::{ContributorTable, DataLoader, LoaderError};
use std::path::PathBuf;
use tracing::debug;

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory searched for the source file.
    pub data_dir: PathBuf,
    /// File name preferred during discovery.
    pub preferred_file: String,
    /// Explicit source file; skips discovery.
    pub source_file: Option<PathBuf>,
    pub retirement_age: u32,
    pub format: OutputFormat,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            data_dir: cli.data_dir.clone(),
            preferred_file: cli.preferred_file.clone(),
            source_file: cli.file.clone(),
            retirement_age: cli.retirement_age,
            format: if cli.json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
        }
    }

    /// Load the canonical table from the configured source.
    pub fn load_table(&self) -> Result<ContributorTable, LoaderError> {
        let loader = DataLoader::new(self.preferred_file.clone());
        match &self.source_file {
            Some(path) => {
                debug!("Using explicit source file {}", path.display());
                loader.load_csv(path)
            }
            None => {
                debug!("Searching {} for a CSV source", self.data_dir.display());
                loader.load_from_dir(&self.data_dir)
            }
        }
    }
}
