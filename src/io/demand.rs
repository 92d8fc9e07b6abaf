// src/io/demand.rs

use crate::model::cycle::HORIZON_DAYS;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, NormalError};
use thiserror::Error;

/// Days per month of a non-leap planning year.
const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Expected demand and its standard deviation for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonthlyDemand {
    pub demand: f64,
    pub std_dev: f64,
}

#[derive(Debug, Error)]
pub enum DemandError {
    #[error("demand standard deviation must be finite and non-negative, got {0}")]
    InvalidStdDev(f64),

    #[error(transparent)]
    Distribution(#[from] NormalError),
}

/// Daily demand series over the planning horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandProfile {
    pub daily_demand: Vec<f64>,
    pub daily_std_dev: Vec<f64>,
}

pub fn days_in_month(month: usize) -> u32 {
    DAYS_IN_MONTH[month]
}

/// Spreads twelve monthly figures evenly over the days of each month.
///
/// Daily demand is `demand / days`; daily deviation is `std_dev / √days`, so
/// the month's variance is preserved under independent days.
pub fn spread_monthly(months: &[MonthlyDemand; 12]) -> DemandProfile {
    let mut daily_demand = Vec::with_capacity(HORIZON_DAYS as usize);
    let mut daily_std_dev = Vec::with_capacity(HORIZON_DAYS as usize);

    for (month, figures) in months.iter().enumerate() {
        let days = days_in_month(month);
        let demand = figures.demand / days as f64;
        let std_dev = figures.std_dev / (days as f64).sqrt();
        for _ in 0..days {
            daily_demand.push(demand);
            daily_std_dev.push(std_dev);
        }
    }

    DemandProfile {
        daily_demand,
        daily_std_dev,
    }
}

/// Same demand every day. Useful for small scenarios and tests.
pub fn constant_profile(daily_demand: f64, daily_std_dev: f64) -> DemandProfile {
    DemandProfile {
        daily_demand: vec![daily_demand; HORIZON_DAYS as usize],
        daily_std_dev: vec![daily_std_dev; HORIZON_DAYS as usize],
    }
}

/// Draws twelve monthly demand figures from a normal distribution.
///
/// Negative draws are clamped to zero. Every month carries `std_dev` as its
/// forecast deviation.
pub fn generate_normal_months(mean: f64, std_dev: f64, seed: u64) -> Result<[MonthlyDemand; 12], DemandError> {
    if !(std_dev.is_finite() && std_dev >= 0.0) {
        return Err(DemandError::InvalidStdDev(std_dev));
    }
    let normal = Normal::new(mean, std_dev)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut months = [MonthlyDemand::default(); 12];
    for month in months.iter_mut() {
        let draw: f64 = normal.sample(&mut rng);
        *month = MonthlyDemand {
            demand: draw.max(0.0),
            std_dev,
        };
    }
    Ok(months)
}
