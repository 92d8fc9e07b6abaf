// src/model/cycle.rs

use crate::model::normal;
use serde::{Deserialize, Serialize};

/// Number of days in the planning horizon.
pub const HORIZON_DAYS: u32 = 365;

/// Settings for the Newton solve of the safety-stock system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonSettings {
    pub max_iterations: usize,
    /// Relative step size below which the iteration is considered converged.
    pub tolerance: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-9,
        }
    }
}

/// Solved stock figures for one cycle at one fill rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockLevels {
    pub safety_stock: f64,
    pub backorder_quantity: f64,
}

impl StockLevels {
    pub const ZERO: StockLevels = StockLevels {
        safety_stock: 0.0,
        backorder_quantity: 0.0,
    };
}

/// The Newton iteration gave up (iteration cap or a non-finite iterate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonConvergence {
    pub iterations: usize,
}

/// Solves the safety-stock system for one cycle.
///
/// Finds `(SS, BKG)` such that
///
/// ```text
/// (SS + SC) / (SS + SC + BKG) = fr
/// -SS·(1 - Φ(SS/σ)) + σ·φ(SS/σ) - BKG = 0
/// ```
///
/// using a two-dimensional Newton iteration started at `(0, 0)`.
///
/// With `σ = 0` there is no variability to buffer and both figures are zero.
/// When zero safety stock already reaches the requested fill rate the buffer
/// is held at `SS = 0` and the backorder is the expected shortfall `σ·φ(0)`.
pub fn solve_stock_levels(
    demand_std_dev: f64,
    expected_consumption: f64,
    fill_rate: f64,
    settings: &NewtonSettings,
) -> Result<StockLevels, NonConvergence> {
    let sigma = demand_std_dev;
    let sc = expected_consumption;
    let fr = fill_rate;

    if sigma == 0.0 {
        return Ok(StockLevels::ZERO);
    }

    // Reduced residual at SS = 0. The residual is convex and decreasing in SS,
    // so a non-positive value means the root lies below zero.
    let backorder_ratio = (1.0 - fr) / fr;
    if sigma * normal::loss(0.0) - backorder_ratio * sc <= 0.0 {
        return Ok(StockLevels {
            safety_stock: 0.0,
            backorder_quantity: sigma * normal::pdf(0.0),
        });
    }

    let mut ss = 0.0_f64;
    let mut bkg = 0.0_f64;

    for iteration in 1..=settings.max_iterations {
        let z = ss / sigma;
        let tail = normal::cdf(-z);

        // F1 is the fill-rate equation multiplied through by its denominator.
        let f1 = (1.0 - fr) * (ss + sc) - fr * bkg;
        let f2 = -ss * tail + sigma * normal::pdf(z) - bkg;

        // Jacobian [[1 - fr, -fr], [-tail, -1]], always non-singular.
        let det = -(1.0 - fr) - fr * tail;
        let d_ss = (f1 - fr * f2) / det;
        let d_bkg = (-(1.0 - fr) * f2 - tail * f1) / det;

        ss += d_ss;
        bkg += d_bkg;

        if !ss.is_finite() || !bkg.is_finite() {
            return Err(NonConvergence {
                iterations: iteration,
            });
        }

        let scale = 1.0 + ss.abs() + bkg.abs();
        if d_ss.abs() + d_bkg.abs() <= settings.tolerance * scale {
            return Ok(StockLevels {
                safety_stock: ss.max(0.0),
                backorder_quantity: bkg.max(0.0),
            });
        }
    }

    Err(NonConvergence {
        iterations: settings.max_iterations,
    })
}

/// One replenishment interval of a family.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    /// First day of the interval (1-based).
    pub start_day: u32,
    /// Nominal length of the interval in days (the family lead time).
    pub length: u32,
    /// SC: expected demand over the interval.
    pub expected_consumption: f64,
    /// σ: root-sum-of-squares of the daily standard deviations.
    pub demand_std_dev: f64,

    fill_rate: f64,
    levels: StockLevels,
}

impl Cycle {
    /// Builds the cycle covering `[start_day, start_day + length)` from daily series.
    ///
    /// Windows running past the end of the series keep whatever days remain.
    pub fn from_window(daily_demand: &[f64], daily_std_dev: &[f64], start_day: u32, length: u32) -> Self {
        let expected_consumption = window(daily_demand, start_day, length).iter().sum();
        let demand_std_dev = window(daily_std_dev, start_day, length)
            .iter()
            .map(|s| s * s)
            .sum::<f64>()
            .sqrt();

        Self {
            start_day,
            length,
            expected_consumption,
            demand_std_dev,
            fill_rate: 0.0,
            levels: StockLevels::ZERO,
        }
    }

    /// Last day covered by this cycle, clipped to the horizon.
    pub fn end_day(&self) -> u32 {
        (self.start_day + self.length - 1).min(HORIZON_DAYS)
    }

    pub fn fill_rate(&self) -> f64 {
        self.fill_rate
    }

    pub fn safety_stock(&self) -> f64 {
        self.levels.safety_stock
    }

    pub fn backorder_quantity(&self) -> f64 {
        self.levels.backorder_quantity
    }

    /// ST contribution of this cycle: SS + SC.
    pub fn service_tons(&self) -> f64 {
        self.levels.safety_stock + self.expected_consumption
    }

    /// Solves this cycle at `fill_rate` without changing it.
    pub fn solve(&self, fill_rate: f64, settings: &NewtonSettings) -> Result<StockLevels, NonConvergence> {
        solve_stock_levels(self.demand_std_dev, self.expected_consumption, fill_rate, settings)
    }

    /// Stores a solution produced by [`Cycle::solve`] for the same fill rate.
    pub(crate) fn commit(&mut self, fill_rate: f64, levels: StockLevels) {
        self.fill_rate = fill_rate;
        self.levels = levels;
    }
}

fn window(series: &[f64], start_day: u32, length: u32) -> &[f64] {
    let start = (start_day as usize).saturating_sub(1).min(series.len());
    let end = (start + length as usize).min(series.len());
    &series[start..end]
}
