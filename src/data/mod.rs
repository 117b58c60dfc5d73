//! Data module - CSV loading, cleaning, consolidation and export

pub mod coerce;
mod export;
mod loader;
mod processor;
mod record;
pub mod schema;

pub use export::export_records;
pub use loader::{DataLoader, LoaderError, DEFAULT_SOURCE_FILE};
pub use processor::{
    AgeRange, AgeView, AgedRecord, Consolidator, ContributorHistory, DatasetOverview,
    WithdrawalRange, WithdrawalView, RETIREMENT_AGE,
};
pub use record::{ContributorRecord, ContributorTable, Field};

#[cfg(test)]
pub(crate) use record::fixtures;
