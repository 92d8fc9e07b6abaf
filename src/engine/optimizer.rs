// src/engine/optimizer.rs

use crate::engine::config::{OptimizerConfig, SolverKind};
use crate::error::{OptimizerError, Result};
use crate::model::family::Family;
use crate::model::network::Network;
use crate::strategy::constraints::{
    BudgetConstraint, Constraint, ConstraintReport, PlantConstraint, Repairable,
};
use crate::strategy::implementations::{CombinatorialConstraintSolver, SequentialConstraintSolver};
use crate::strategy::traits::ConstraintSolver;
use serde::Serialize;
use tracing::{debug, info};

/// One cycle of one family after optimization.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    pub family: String,
    pub start_day: u32,
    pub end_day: u32,
    pub expected_consumption: f64,
    pub demand_std_dev: f64,
    pub fill_rate: f64,
    pub safety_stock: f64,
    pub backorder_quantity: f64,
    pub backorder_cost: f64,
}

/// Per-family result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct FamilySummary {
    pub family: String,
    pub revenue: f64,
    pub critical_fill_rate: f64,
    pub target_fill_rate: f64,
    pub fill_rate: f64,
    pub total_service_tons: f64,
    pub total_cost: f64,
}

/// Everything the reporting side needs from a finished run.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub families: Vec<FamilySummary>,
    pub cycles: Vec<CycleRecord>,
    pub constraints: Vec<ConstraintReport>,
    /// Number of fill-rate decrements made while repairing.
    pub fill_rate_changes: usize,
}

impl Outcome {
    pub fn total_cost(&self) -> f64 {
        self.families.iter().map(|f| f.total_cost).sum()
    }
}

/// Runs the fill-rate optimization over a [`Network`].
///
/// 1. every family is placed at its critical fill rate;
/// 2. the budget and every plant must hold there, otherwise the run stops;
/// 3. families are raised to their target fill rate;
/// 4. plant constraints are repaired by the configured solver;
/// 5. the budget constraint is repaired last.
#[derive(Debug, Clone, Default)]
pub struct FillRateOptimizer {
    config: OptimizerConfig,
}

impl FillRateOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn run(&self, network: &mut Network) -> Result<Outcome> {
        let newton = self.config.newton;
        let settings = self.config.repair_settings();

        let budget = BudgetConstraint::new(network.budget);
        let plants: Vec<PlantConstraint> = network
            .plants
            .iter()
            .cloned()
            .map(PlantConstraint::new)
            .collect();
        let constraints: Vec<Constraint> = std::iter::once(Constraint::Budget(&budget))
            .chain(plants.iter().map(Constraint::PlantCapacity))
            .collect();

        info!(
            families = network.families.len(),
            plants = plants.len(),
            budget = network.budget,
            "placing families at critical fill rate"
        );
        for family in network.families.iter_mut() {
            let floor = family.critical_fill_rate();
            family.apply_fill_rate(floor, &newton)?;
        }
        check_floor(&constraints, &network.families)?;

        info!("raising families to target fill rate");
        for family in network.families.iter_mut() {
            let target = family.target_fill_rate();
            family.apply_fill_rate(target, &newton)?;
        }

        let mut solver = self.build_solver();
        let plant_changes = solver.solve(&plants, &mut network.families, &settings)?;
        info!(changes = plant_changes, "plant constraints satisfied");

        let budget_changes = constraints[0].solve(&mut network.families, &settings)?;
        info!(
            changes = budget_changes,
            total_cost = budget.total_cost(&network.families),
            "budget constraint satisfied"
        );

        Ok(build_outcome(
            &network.families,
            &constraints,
            plant_changes + budget_changes,
        ))
    }

    fn build_solver(&self) -> Box<dyn ConstraintSolver> {
        match self.config.solver {
            SolverKind::Sequential if self.config.shuffle_constraints => {
                Box::new(SequentialConstraintSolver::shuffled(self.config.random_seed))
            }
            SolverKind::Sequential => Box::new(SequentialConstraintSolver::new()),
            SolverKind::Combinatorial => Box::new(CombinatorialConstraintSolver::new(
                self.config.max_solver_rounds,
            )),
        }
    }
}

/// Fails with `InfeasibleAtFloor` for the first constraint that does not hold.
fn check_floor(constraints: &[Constraint], families: &[Family]) -> Result<()> {
    if let Some(failing) = constraints.iter().find(|c| !c.validate(families)) {
        return Err(OptimizerError::InfeasibleAtFloor {
            constraint: failing.name(),
        });
    }
    debug!("all constraints hold at the critical fill rates");
    Ok(())
}

fn build_outcome(families: &[Family], constraints: &[Constraint], fill_rate_changes: usize) -> Outcome {
    let summaries = families
        .iter()
        .map(|family| FamilySummary {
            family: family.id().to_string(),
            revenue: family.revenue(),
            critical_fill_rate: family.critical_fill_rate(),
            target_fill_rate: family.target_fill_rate(),
            fill_rate: family.fill_rate(),
            total_service_tons: family.total_service_tons(),
            total_cost: family.total_cost(),
        })
        .collect();

    let cycles = families
        .iter()
        .flat_map(|family| {
            family.cycles().iter().map(move |cycle| CycleRecord {
                family: family.id().to_string(),
                start_day: cycle.start_day,
                end_day: cycle.end_day(),
                expected_consumption: cycle.expected_consumption,
                demand_std_dev: cycle.demand_std_dev,
                fill_rate: cycle.fill_rate(),
                safety_stock: cycle.safety_stock(),
                backorder_quantity: cycle.backorder_quantity(),
                backorder_cost: family.backorder_cost(cycle),
            })
        })
        .collect();

    Outcome {
        families: summaries,
        cycles,
        constraints: constraints.iter().map(|c| c.report(families)).collect(),
        fill_rate_changes,
    }
}
