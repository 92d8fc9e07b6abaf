// src/strategy/constraints.rs

use crate::error::{OptimizerError, Result};
use crate::model::cycle::NewtonSettings;
use crate::model::family::Family;
use crate::model::plant::Plant;
use serde::Serialize;
use std::cell::Cell;
use tracing::trace;

/// Parameters of the greedy repair loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepairSettings {
    /// Fill-rate decrement applied per repair step.
    pub step: f64,
    /// Maximum number of fill-rate changes one `solve` may make.
    pub max_steps: usize,
    pub newton: NewtonSettings,
}

impl Default for RepairSettings {
    fn default() -> Self {
        Self {
            step: 0.01,
            max_steps: 100_000,
            newton: NewtonSettings::default(),
        }
    }
}

/// Feasibility check plus greedy repair over the descending family list.
///
/// `solve` walks a cursor from the least important governed family towards
/// the most important one. The family under the cursor is lowered one step at
/// a time until the constraint holds or the family reaches its critical fill
/// rate, at which point the cursor moves on via `next_index`.
pub trait Repairable {
    fn name(&self) -> String;

    /// True iff the constraint holds for the current fill rates.
    fn validate(&self, families: &[Family]) -> bool;

    /// Where the cursor starts: the last family the constraint can act on.
    fn start_index(&self, families: &[Family]) -> Result<usize>;

    /// The family examined after `index`.
    fn next_index(&self, index: usize) -> Result<usize>;

    /// Lowers fill rates until `validate` holds. Returns the number of
    /// fill-rate changes made.
    fn solve(&self, families: &mut [Family], settings: &RepairSettings) -> Result<usize> {
        if self.validate(families) {
            return Ok(0);
        }

        let mut cursor = self.start_index(families)?;
        let mut changes = 0;

        loop {
            let family = &mut families[cursor];
            let current = family.fill_rate();
            let floor = family.critical_fill_rate();

            if current > floor {
                if changes >= settings.max_steps {
                    return Err(OptimizerError::IterationLimit {
                        context: format!("repair of '{}'", self.name()),
                        limit: settings.max_steps,
                    });
                }

                let lowered = (current - settings.step).max(floor);
                family.apply_fill_rate(lowered, &settings.newton)?;
                changes += 1;
                trace!(
                    constraint = %self.name(),
                    family = family.id(),
                    fill_rate = lowered,
                    "lowered fill rate"
                );

                if self.validate(families) {
                    return Ok(changes);
                }
            } else {
                cursor = self.next_index(cursor)?;
            }
        }
    }
}

// =========================================================================
// 1. Budget Constraint
// =========================================================================

/// Summed holding cost of all families must stay within the budget.
#[derive(Debug)]
pub struct BudgetConstraint {
    pub budget: f64,
    last_validation: Cell<Option<bool>>,
}

impl BudgetConstraint {
    pub fn new(budget: f64) -> Self {
        Self {
            budget,
            last_validation: Cell::new(None),
        }
    }

    pub fn total_cost(&self, families: &[Family]) -> f64 {
        families.iter().map(Family::total_cost).sum()
    }

    pub fn last_validation(&self) -> Option<bool> {
        self.last_validation.get()
    }
}

impl Repairable for BudgetConstraint {
    fn name(&self) -> String {
        "budget".to_string()
    }

    fn validate(&self, families: &[Family]) -> bool {
        let ok = self.total_cost(families) <= self.budget;
        self.last_validation.set(Some(ok));
        ok
    }

    fn start_index(&self, families: &[Family]) -> Result<usize> {
        families
            .len()
            .checked_sub(1)
            .ok_or_else(|| OptimizerError::RepairExhausted {
                constraint: self.name(),
            })
    }

    fn next_index(&self, index: usize) -> Result<usize> {
        index
            .checked_sub(1)
            .ok_or_else(|| OptimizerError::RepairExhausted {
                constraint: self.name(),
            })
    }
}

// =========================================================================
// 2. Plant Capacity Constraint
// =========================================================================

/// A plant's allocated service tons must stay strictly below its capacity.
#[derive(Debug)]
pub struct PlantConstraint {
    pub plant: Plant,
    last_validation: Cell<Option<bool>>,
}

impl PlantConstraint {
    pub fn new(plant: Plant) -> Self {
        Self {
            plant,
            last_validation: Cell::new(None),
        }
    }

    /// Tons the plant must produce at the current fill rates.
    pub fn load(&self, families: &[Family]) -> f64 {
        self.plant.load(families.iter().map(Family::total_service_tons))
    }

    /// Allocated tons of the plant's families ranked strictly below `reference`.
    pub fn tons_below(&self, families: &[Family], reference: usize) -> f64 {
        let reference = &families[reference];
        self.plant
            .active_families()
            .iter()
            .map(|&index| (index, &families[index]))
            .filter(|(_, family)| *family < reference)
            .map(|(index, family)| family.total_service_tons() * self.plant.share(index))
            .sum()
    }

    pub fn last_validation(&self) -> Option<bool> {
        self.last_validation.get()
    }
}

impl Repairable for PlantConstraint {
    fn name(&self) -> String {
        format!("plant {}", self.plant.id)
    }

    fn validate(&self, families: &[Family]) -> bool {
        let ok = self.load(families) < self.plant.capacity;
        self.last_validation.set(Some(ok));
        ok
    }

    /// Families this plant does not produce are never lowered on its behalf,
    /// so the cursor starts at the last one it does produce.
    fn start_index(&self, _families: &[Family]) -> Result<usize> {
        self.plant
            .active_families()
            .iter()
            .next_back()
            .copied()
            .ok_or_else(|| OptimizerError::RepairExhausted {
                constraint: self.name(),
            })
    }

    fn next_index(&self, index: usize) -> Result<usize> {
        (0..index)
            .rev()
            .find(|&i| self.plant.produces(i))
            .ok_or_else(|| OptimizerError::RepairExhausted {
                constraint: self.name(),
            })
    }
}

// =========================================================================
// 3. Closed set of constraint variants
// =========================================================================

/// A borrowed view over one of the concrete constraints, so callers can
/// check, repair and report them uniformly.
#[derive(Debug, Clone, Copy)]
pub enum Constraint<'a> {
    Budget(&'a BudgetConstraint),
    PlantCapacity(&'a PlantConstraint),
}

/// Snapshot of one constraint for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintReport {
    pub constraint: String,
    pub satisfied: Option<bool>,
    pub load: f64,
    pub limit: f64,
}

impl<'a> Constraint<'a> {
    fn inner(&self) -> &'a dyn Repairable {
        match *self {
            Constraint::Budget(c) => c,
            Constraint::PlantCapacity(c) => c,
        }
    }

    pub fn last_validation(&self) -> Option<bool> {
        match self {
            Constraint::Budget(c) => c.last_validation(),
            Constraint::PlantCapacity(c) => c.last_validation(),
        }
    }

    pub fn report(&self, families: &[Family]) -> ConstraintReport {
        let (load, limit) = match self {
            Constraint::Budget(c) => (c.total_cost(families), c.budget),
            Constraint::PlantCapacity(c) => (c.load(families), c.plant.capacity),
        };
        ConstraintReport {
            constraint: self.name(),
            satisfied: self.last_validation(),
            load,
            limit,
        }
    }
}

impl Repairable for Constraint<'_> {
    fn name(&self) -> String {
        self.inner().name()
    }

    fn validate(&self, families: &[Family]) -> bool {
        self.inner().validate(families)
    }

    fn start_index(&self, families: &[Family]) -> Result<usize> {
        self.inner().start_index(families)
    }

    fn next_index(&self, index: usize) -> Result<usize> {
        self.inner().next_index(index)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::family::FamilySpec;

    /// Family whose daily demand is volatile enough that its service tons
    /// react to the fill rate between 0.90 and 0.98.
    pub(crate) fn volatile_family(id: &str, revenue: f64, holding_cost: f64) -> Family {
        let spec = FamilySpec {
            id: id.to_string(),
            daily_demand: vec![2.0; 365],
            daily_std_dev: vec![3.0; 365],
            production_days: 2,
            lead_time: 10,
            target_fill_rate: 0.98,
            critical_fill_rate: 0.90,
            holding_cost,
            revenue,
            sales_price: 10.0,
        };
        Family::new(spec, &NewtonSettings::default()).unwrap()
    }

    /// Same family with its holding cost scaled so the cost at the critical
    /// fill rate equals `floor_cost`.
    pub(crate) fn family_with_floor_cost(id: &str, revenue: f64, floor_cost: f64) -> Family {
        let sample = volatile_family(id, revenue, 1.0);
        volatile_family(id, revenue, floor_cost / sample.total_service_tons())
    }

    fn raise_to_target(families: &mut [Family]) {
        let settings = NewtonSettings::default();
        for family in families.iter_mut() {
            let target = family.target_fill_rate();
            family.apply_fill_rate(target, &settings).unwrap();
        }
    }

    fn fill_rates(families: &[Family]) -> Vec<f64> {
        families.iter().map(Family::fill_rate).collect()
    }

    #[test]
    fn test_budget_feasible_at_floor_then_repaired_from_the_back() {
        let mut families = vec![
            family_with_floor_cost("A", 3.0, 100.0),
            family_with_floor_cost("B", 2.0, 150.0),
            family_with_floor_cost("C", 1.0, 50.0),
        ];
        let floor_total: f64 = families.iter().map(Family::total_cost).sum();
        assert!((floor_total - 300.0).abs() < 1e-9);

        raise_to_target(&mut families);
        let target_total: f64 = families.iter().map(Family::total_cost).sum();
        let c_span = families[2].total_cost() - 50.0;
        assert!(target_total > floor_total);

        // Reachable by lowering C alone.
        let budget = target_total - 0.5 * c_span;
        let constraint = BudgetConstraint::new(budget);
        assert!(!constraint.validate(&families));

        let changes = constraint.solve(&mut families, &RepairSettings::default()).unwrap();
        assert!(changes > 0);
        assert!(constraint.validate(&families));
        assert_eq!(constraint.last_validation(), Some(true));
        assert_eq!(families[0].fill_rate(), 0.98);
        assert_eq!(families[1].fill_rate(), 0.98);
        assert!(families[2].fill_rate() < 0.98);
        assert!(families[2].fill_rate() >= 0.90);
    }

    #[test]
    fn test_budget_moves_cursor_once_family_hits_floor() {
        let mut families = vec![
            family_with_floor_cost("A", 3.0, 100.0),
            family_with_floor_cost("B", 2.0, 150.0),
            family_with_floor_cost("C", 1.0, 50.0),
        ];
        raise_to_target(&mut families);
        let b_span = families[1].total_cost() - 150.0;
        let budget = families[0].total_cost() + 150.0 + 0.5 * b_span + 50.0;

        let constraint = BudgetConstraint::new(budget);
        constraint.solve(&mut families, &RepairSettings::default()).unwrap();

        assert_eq!(families[2].fill_rate(), 0.90);
        assert!(families[1].fill_rate() > 0.90 && families[1].fill_rate() < 0.98);
        assert_eq!(families[0].fill_rate(), 0.98);
    }

    #[test]
    fn test_budget_exhaustion_is_an_error() {
        let mut families = vec![
            family_with_floor_cost("A", 3.0, 100.0),
            family_with_floor_cost("B", 2.0, 150.0),
        ];
        raise_to_target(&mut families);

        let constraint = BudgetConstraint::new(200.0);
        let err = constraint.solve(&mut families, &RepairSettings::default()).unwrap_err();
        assert_eq!(
            err,
            OptimizerError::RepairExhausted {
                constraint: "budget".to_string()
            }
        );
        assert!(families.iter().all(|f| f.fill_rate() == 0.90));
    }

    #[test]
    fn test_solve_when_feasible_changes_nothing() {
        let mut families = vec![family_with_floor_cost("A", 3.0, 100.0)];
        raise_to_target(&mut families);
        let before = fill_rates(&families);

        let constraint = BudgetConstraint::new(1e9);
        assert_eq!(constraint.solve(&mut families, &RepairSettings::default()).unwrap(), 0);
        assert_eq!(fill_rates(&families), before);
    }

    #[test]
    fn test_validate_does_not_mutate() {
        let families = vec![
            volatile_family("A", 2.0, 1.0),
            volatile_family("B", 1.0, 1.0),
        ];
        let before = fill_rates(&families);
        let plant = PlantConstraint::new(Plant::new("P1", 1.0, vec![0.5, 0.5]));
        assert_eq!(plant.last_validation(), None);
        assert!(!plant.validate(&families));
        assert!(!plant.validate(&families));
        assert_eq!(fill_rates(&families), before);
        assert_eq!(plant.last_validation(), Some(false));
    }

    #[test]
    fn test_plant_feasibility_is_strict() {
        let families = vec![volatile_family("A", 1.0, 1.0)];
        let tons = families[0].total_service_tons();

        let at_capacity = PlantConstraint::new(Plant::new("P1", tons, vec![1.0]));
        assert!(!at_capacity.validate(&families));

        let above = PlantConstraint::new(Plant::new("P1", tons + 1.0, vec![1.0]));
        assert!(above.validate(&families));
    }

    #[test]
    fn test_plant_repair_skips_families_it_does_not_produce() {
        let mut families = vec![
            volatile_family("A", 3.0, 1.0),
            volatile_family("B", 2.0, 1.0),
            volatile_family("C", 1.0, 1.0),
        ];
        raise_to_target(&mut families);

        let a_target = families[0].total_service_tons();
        let b_target = families[1].total_service_tons();
        let b_floor = volatile_family("B", 2.0, 1.0).total_service_tons();
        let capacity = 0.6 * a_target + 0.4 * (b_target + b_floor) / 2.0;
        let constraint = PlantConstraint::new(Plant::new("P1", capacity, vec![0.6, 0.4, 0.0]));

        assert_eq!(constraint.start_index(&families).unwrap(), 1);
        constraint.solve(&mut families, &RepairSettings::default()).unwrap();

        assert!(constraint.validate(&families));
        assert_eq!(families[2].fill_rate(), 0.98);
        assert_eq!(families[0].fill_rate(), 0.98);
        assert!(families[1].fill_rate() < 0.98);
    }

    #[test]
    fn test_plant_next_index_skips_and_exhausts() {
        let constraint = PlantConstraint::new(Plant::new("P1", 10.0, vec![0.5, 0.0, 1e-9, 0.5]));
        assert_eq!(constraint.next_index(3).unwrap(), 0);
        assert!(matches!(
            constraint.next_index(0),
            Err(OptimizerError::RepairExhausted { .. })
        ));
    }

    #[test]
    fn test_tons_below_counts_only_lower_ranked_participants() {
        let families = vec![
            volatile_family("A", 3.0, 1.0),
            volatile_family("B", 2.0, 1.0),
            volatile_family("C", 1.0, 1.0),
            volatile_family("D", 0.5, 1.0),
        ];
        let constraint = PlantConstraint::new(Plant::new("P1", 10.0, vec![1.0, 0.5, 0.0, 0.25]));

        let tons_c = families[2].total_service_tons();
        let tons_d = families[3].total_service_tons();
        let expected = 0.5 * families[1].total_service_tons() + 0.25 * tons_d;
        assert!((constraint.tons_below(&families, 0) - expected).abs() < 1e-9);
        assert!((constraint.tons_below(&families, 2) - 0.25 * tons_d).abs() < 1e-9);
        assert_eq!(constraint.tons_below(&families, 3), 0.0);
        assert!(tons_c > 0.0);
    }

    #[test]
    fn test_step_limit_is_enforced() {
        let mut families = vec![volatile_family("A", 1.0, 1.0)];
        raise_to_target(&mut families);
        let settings = RepairSettings {
            max_steps: 2,
            ..RepairSettings::default()
        };
        let constraint = BudgetConstraint::new(0.0);
        let err = constraint.solve(&mut families, &settings).unwrap_err();
        assert!(matches!(err, OptimizerError::IterationLimit { limit: 2, .. }));
    }

    #[test]
    fn test_constraint_report() {
        let families = vec![volatile_family("A", 1.0, 2.0)];
        let budget = BudgetConstraint::new(1e6);
        let constraint = Constraint::Budget(&budget);
        assert_eq!(constraint.last_validation(), None);
        assert!(constraint.validate(&families));

        let report = constraint.report(&families);
        assert_eq!(report.constraint, "budget");
        assert_eq!(report.satisfied, Some(true));
        assert!((report.load - 2.0 * families[0].total_service_tons()).abs() < 1e-9);
        assert_eq!(report.limit, 1e6);
    }
}
