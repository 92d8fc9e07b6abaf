// src/model/family.rs

use crate::error::{OptimizerError, Result};
use crate::model::cycle::{Cycle, NewtonSettings, HORIZON_DAYS};
use std::cmp::Ordering;

/// Static description of a product family, as delivered by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilySpec {
    pub id: String,
    /// Expected demand per day over the horizon (365 values).
    pub daily_demand: Vec<f64>,
    /// Demand standard deviation per day over the horizon (365 values).
    pub daily_std_dev: Vec<f64>,
    pub production_days: u32,
    pub lead_time: u32,
    pub target_fill_rate: f64,
    pub critical_fill_rate: f64,
    /// Holding cost per service ton.
    pub holding_cost: f64,
    /// Revenue (importance) used to rank families.
    pub revenue: f64,
    pub sales_price: f64,
}

/// A product family scheduled across the planning horizon.
///
/// The active fill rate is shared by every cycle of the family; changing it
/// goes through [`Family::apply_fill_rate`], which re-solves all cycles.
#[derive(Debug, Clone)]
pub struct Family {
    spec: FamilySpec,
    cycles: Vec<Cycle>,
    fill_rate: f64,
}

impl Family {
    /// Builds the family's cycles and solves them at the critical fill rate.
    pub fn new(spec: FamilySpec, settings: &NewtonSettings) -> Result<Self> {
        validate_spec(&spec)?;

        let mut cycles = Vec::new();
        let mut start_day = 1;
        while start_day <= HORIZON_DAYS {
            cycles.push(Cycle::from_window(
                &spec.daily_demand,
                &spec.daily_std_dev,
                start_day,
                spec.lead_time,
            ));
            start_day += spec.lead_time;
        }

        let critical = spec.critical_fill_rate;
        let mut family = Self {
            spec,
            cycles,
            fill_rate: critical,
        };
        family.apply_fill_rate(critical, settings)?;
        Ok(family)
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn spec(&self) -> &FamilySpec {
        &self.spec
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn revenue(&self) -> f64 {
        self.spec.revenue
    }

    pub fn fill_rate(&self) -> f64 {
        self.fill_rate
    }

    pub fn target_fill_rate(&self) -> f64 {
        self.spec.target_fill_rate
    }

    pub fn critical_fill_rate(&self) -> f64 {
        self.spec.critical_fill_rate
    }

    /// Sets the fill rate and re-solves every cycle at it.
    ///
    /// All cycles are solved before any is updated, so on error the family
    /// keeps its previous fill rate and stock figures.
    pub fn apply_fill_rate(&mut self, fill_rate: f64, settings: &NewtonSettings) -> Result<()> {
        if !(fill_rate > 0.0 && fill_rate < 1.0) {
            return Err(OptimizerError::InvalidFillRate {
                family: self.spec.id.clone(),
                value: fill_rate,
            });
        }

        let mut solved = Vec::with_capacity(self.cycles.len());
        for cycle in &self.cycles {
            let levels = cycle
                .solve(fill_rate, settings)
                .map_err(|failure| OptimizerError::SolveNonConvergence {
                    family: self.spec.id.clone(),
                    start_day: cycle.start_day,
                    iterations: failure.iterations,
                })?;
            solved.push(levels);
        }

        for (cycle, levels) in self.cycles.iter_mut().zip(solved) {
            cycle.commit(fill_rate, levels);
        }
        self.fill_rate = fill_rate;
        Ok(())
    }

    /// ST: sum of SS + SC over all cycles.
    pub fn total_service_tons(&self) -> f64 {
        self.cycles.iter().map(Cycle::service_tons).sum()
    }

    /// Holding cost of the family's service tons.
    pub fn total_cost(&self) -> f64 {
        self.total_service_tons() * self.spec.holding_cost
    }

    /// Expected backorder quantity of one cycle valued at the sales price.
    pub fn backorder_cost(&self, cycle: &Cycle) -> f64 {
        cycle.backorder_quantity() * self.spec.sales_price
    }

    /// Ranking used for every greedy decision.
    ///
    /// Higher revenue ranks higher. Among equal revenue the larger identifier
    /// ranks lower.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.spec
            .revenue
            .total_cmp(&other.spec.revenue)
            .then_with(|| other.spec.id.cmp(&self.spec.id))
    }
}

impl PartialEq for Family {
    fn eq(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Equal
    }
}

impl Eq for Family {}

impl PartialOrd for Family {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Family {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_cmp(other)
    }
}

fn validate_spec(spec: &FamilySpec) -> Result<()> {
    let invalid = |reason: String| OptimizerError::InvalidFamily {
        family: spec.id.clone(),
        reason,
    };

    if spec.lead_time == 0 {
        return Err(invalid("lead time must be at least one day".to_string()));
    }
    let horizon = HORIZON_DAYS as usize;
    if spec.daily_demand.len() != horizon || spec.daily_std_dev.len() != horizon {
        return Err(invalid(format!(
            "expected {} daily values, got {} demand and {} deviation values",
            horizon,
            spec.daily_demand.len(),
            spec.daily_std_dev.len()
        )));
    }
    if spec.daily_std_dev.iter().any(|s| *s < 0.0) || spec.daily_demand.iter().any(|d| *d < 0.0) {
        return Err(invalid("daily demand and deviation must be non-negative".to_string()));
    }
    for rate in [spec.critical_fill_rate, spec.target_fill_rate] {
        if !(rate > 0.0 && rate < 1.0) {
            return Err(OptimizerError::InvalidFillRate {
                family: spec.id.clone(),
                value: rate,
            });
        }
    }
    if spec.critical_fill_rate > spec.target_fill_rate {
        return Err(invalid(format!(
            "critical fill rate {} exceeds target fill rate {}",
            spec.critical_fill_rate, spec.target_fill_rate
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Family with flat daily demand, usable across test modules.
    pub(crate) fn flat_family(id: &str, revenue: f64, demand: f64, std_dev: f64, lead_time: u32) -> Family {
        let spec = FamilySpec {
            id: id.to_string(),
            daily_demand: vec![demand; 365],
            daily_std_dev: vec![std_dev; 365],
            production_days: 2,
            lead_time,
            target_fill_rate: 0.98,
            critical_fill_rate: 0.90,
            holding_cost: 1.0,
            revenue,
            sales_price: 10.0,
        };
        Family::new(spec, &NewtonSettings::default()).unwrap()
    }

    #[test]
    fn test_cycles_cover_horizon() {
        let family = flat_family("A", 1.0, 2.0, 1.0, 30);
        // 1, 31, ..., 361
        assert_eq!(family.cycles().len(), 13);
        let last = family.cycles().last().unwrap();
        assert_eq!(last.start_day, 361);
        assert_eq!(last.expected_consumption, 10.0);

        let total: f64 = family.cycles().iter().map(|c| c.expected_consumption).sum();
        assert!((total - 730.0).abs() < 1e-9);
    }

    #[test]
    fn test_starts_at_critical_fill_rate() {
        let family = flat_family("A", 1.0, 2.0, 1.0, 30);
        assert_eq!(family.fill_rate(), 0.90);
        assert!(family.cycles().iter().all(|c| c.fill_rate() == 0.90));
    }

    #[test]
    fn test_fill_rate_cascades_to_cycles() {
        let settings = NewtonSettings::default();
        let mut family = flat_family("A", 1.0, 2.0, 3.0, 10);
        let low = family.total_service_tons();

        family.apply_fill_rate(0.99, &settings).unwrap();
        assert!(family.cycles().iter().all(|c| c.fill_rate() == 0.99));
        assert!(family.total_service_tons() > low);
        assert_eq!(family.total_cost(), family.total_service_tons());
    }

    #[test]
    fn test_failed_solve_leaves_family_untouched() {
        let mut family = flat_family("A", 1.0, 2.0, 3.0, 10);
        let before = family.cycles().to_vec();

        let strict = NewtonSettings {
            max_iterations: 1,
            tolerance: 0.0,
        };
        let err = family.apply_fill_rate(0.99, &strict).unwrap_err();
        assert!(matches!(err, OptimizerError::SolveNonConvergence { start_day: 1, .. }));
        assert_eq!(family.fill_rate(), 0.90);
        assert_eq!(family.cycles(), &before[..]);
    }

    #[test]
    fn test_rejects_fill_rate_outside_unit_interval() {
        let mut family = flat_family("A", 1.0, 2.0, 3.0, 10);
        let settings = NewtonSettings::default();
        assert!(family.apply_fill_rate(1.0, &settings).is_err());
        assert!(family.apply_fill_rate(0.0, &settings).is_err());
    }

    #[test]
    fn test_rejects_zero_lead_time() {
        let spec = FamilySpec {
            lead_time: 0,
            ..flat_family("A", 1.0, 2.0, 1.0, 5).spec().clone()
        };
        let err = Family::new(spec, &NewtonSettings::default()).unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidFamily { .. }));
    }

    #[test]
    fn test_ordering_by_revenue_then_reverse_id() {
        let low = flat_family("Z", 10.0, 1.0, 0.0, 30);
        let high = flat_family("A", 20.0, 1.0, 0.0, 30);
        assert!(high > low);

        let a = flat_family("A", 10.0, 1.0, 0.0, 30);
        let b = flat_family("B", 10.0, 1.0, 0.0, 30);
        // equal revenue: larger identifier is lesser
        assert!(b < a);
        assert_eq!(a.cmp(&a), Ordering::Equal);
    }

    #[test]
    fn test_ordering_is_a_strict_total_order() {
        let families = vec![
            flat_family("C", 5.0, 1.0, 0.0, 30),
            flat_family("A", 5.0, 1.0, 0.0, 30),
            flat_family("B", 7.0, 1.0, 0.0, 30),
            flat_family("D", 1.0, 1.0, 0.0, 30),
            flat_family("E", 5.0, 1.0, 0.0, 30),
        ];

        for x in &families {
            for y in &families {
                assert_eq!(x.cmp(y), y.cmp(x).reverse());
                for z in &families {
                    if x < y && y < z {
                        assert!(x < z);
                    }
                }
            }
        }

        let mut refs: Vec<&Family> = families.iter().collect();
        refs.sort_by(|a, b| b.cmp(a));
        let sorted: Vec<&str> = refs.iter().map(|f| f.id()).collect();
        assert_eq!(sorted, vec!["B", "A", "C", "E", "D"]);
    }
}
