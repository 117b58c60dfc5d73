//! Statistics Calculator Module
//! Summaries shown next to the withdrawal and retiree result sets.

use serde::Serialize;
use statrs::statistics::Statistics;

/// Lower and upper bound of the "recently retired" age band.
pub const EARLY_RETIREE_BAND: (u32, u32) = (60, 65);

/// Summary of the withdrawal amounts in a result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WithdrawalSummary {
    pub count: usize,
    pub total: f64,
    /// `total / count`; absent for an empty set.
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub largest: Option<f64>,
    /// Sample standard deviation; needs at least two amounts.
    pub std_dev: Option<f64>,
}

/// Summary of the ages in a result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgeSummary {
    pub count: usize,
    pub mean_age: Option<f64>,
    pub oldest: Option<u32>,
    pub youngest: Option<u32>,
    pub aged_60_to_65: usize,
}

pub struct StatsCalculator;

impl StatsCalculator {
    pub fn withdrawal_summary(amounts: &[f64]) -> WithdrawalSummary {
        let count = amounts.len();
        if count == 0 {
            return WithdrawalSummary::default();
        }

        let total: f64 = amounts.iter().sum();
        let mut sorted = amounts.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        WithdrawalSummary {
            count,
            total,
            mean: Some(total / count as f64),
            median: Some(Self::median(&sorted)),
            largest: Some(Statistics::max(amounts)),
            std_dev: Some(Statistics::std_dev(amounts)).filter(|v| v.is_finite()),
        }
    }

    pub fn age_summary(ages: &[u32]) -> AgeSummary {
        if ages.is_empty() {
            return AgeSummary::default();
        }

        let values: Vec<f64> = ages.iter().map(|&a| f64::from(a)).collect();
        let (band_low, band_high) = EARLY_RETIREE_BAND;

        AgeSummary {
            count: ages.len(),
            mean_age: Some(Statistics::mean(&values)),
            oldest: ages.iter().copied().max(),
            youngest: ages.iter().copied().min(),
            aged_60_to_65: ages
                .iter()
                .filter(|&&a| (band_low..=band_high).contains(&a))
                .count(),
        }
    }

    /// Middle value of a sorted, non-empty slice.
    fn median(sorted: &[f64]) -> f64 {
        let n = sorted.len();
        if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        }
    }
}
