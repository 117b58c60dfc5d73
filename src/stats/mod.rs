//! Stats module - Summary statistics over query results

mod calculator;

pub use calculator::{AgeSummary, StatsCalculator, WithdrawalSummary};
