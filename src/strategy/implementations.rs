// src/strategy/implementations.rs

use crate::error::{OptimizerError, Result};
use crate::model::family::Family;
use crate::strategy::constraints::{PlantConstraint, RepairSettings, Repairable};
use crate::strategy::traits::ConstraintSolver;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeSet;
use tracing::debug;

// =========================================================================
// 1. Sequential Solver
// =========================================================================

/// Solves each plant constraint on its own, in list order or shuffled.
///
/// Does not look at families shared between plants, so a plant repaired
/// early may give up more fill rate than needed.
#[derive(Debug, Clone)]
pub struct SequentialConstraintSolver {
    shuffle: bool,
    seed: Option<u64>,
}

impl SequentialConstraintSolver {
    /// Constraints are solved in the order given.
    pub fn new() -> Self {
        Self {
            shuffle: false,
            seed: None,
        }
    }

    /// Constraints are shuffled before solving. Without a seed the order
    /// differs between runs.
    pub fn shuffled(seed: Option<u64>) -> Self {
        Self {
            shuffle: true,
            seed,
        }
    }

    fn order(&self, count: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..count).collect();
        if self.shuffle {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            order.shuffle(&mut rng);
        }
        order
    }
}

impl Default for SequentialConstraintSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintSolver for SequentialConstraintSolver {
    fn solve(
        &mut self,
        constraints: &[PlantConstraint],
        families: &mut [Family],
        settings: &RepairSettings,
    ) -> Result<usize> {
        let mut changes = 0;
        for index in self.order(constraints.len()) {
            let constraint = &constraints[index];
            debug!(constraint = %constraint.name(), "solving constraint");
            changes += constraint.solve(families, settings)?;
        }
        Ok(changes)
    }
}

// =========================================================================
// 2. Combinatorial Solver
// =========================================================================

/// Group sizes examined when looking for shared families, largest first.
const GROUP_SIZES: [usize; 3] = [3, 2, 1];

/// Repairs the most entangled failing plant first.
///
/// Each round looks for families shared by groups of failing plants, picks a
/// reference family from the largest conflicting group and solves the failing
/// plant that carries the fewest tons ranked below that reference.
#[derive(Debug, Clone)]
pub struct CombinatorialConstraintSolver {
    max_rounds: usize,
}

impl CombinatorialConstraintSolver {
    pub fn new(max_rounds: usize) -> Self {
        Self { max_rounds }
    }

    /// Picks the reference family for the current set of failing plants.
    ///
    /// For every group size, each combination of failing plants contributes
    /// the lowest-ranked family they all produce; the bucket's candidate is
    /// the highest-ranked of those. The first non-empty bucket wins.
    pub fn reference_family(
        &self,
        failing: &[usize],
        constraints: &[PlantConstraint],
        families: &[Family],
    ) -> Option<usize> {
        let mut candidates = Vec::new();

        for size in GROUP_SIZES {
            let mut bucket = Vec::new();
            for group in combinations(failing, size) {
                let shared = shared_families(&group, constraints);
                if let Some(lowest) = shared.into_iter().min_by(|a, b| families[*a].cmp(&families[*b])) {
                    bucket.push(lowest);
                }
            }
            if let Some(highest) = bucket.into_iter().max_by(|a, b| families[*a].cmp(&families[*b])) {
                candidates.push(highest);
            }
        }

        candidates.first().copied()
    }

    /// Failing plant with the smallest `tons_below(reference)`; the first one
    /// wins ties.
    fn select_target(
        failing: &[usize],
        constraints: &[PlantConstraint],
        families: &[Family],
        reference: usize,
    ) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for &index in failing {
            let tons = constraints[index].tons_below(families, reference);
            match best {
                Some((_, lowest)) if tons >= lowest => {}
                _ => best = Some((index, tons)),
            }
        }
        best.map(|(index, _)| index)
    }
}

impl ConstraintSolver for CombinatorialConstraintSolver {
    fn solve(
        &mut self,
        constraints: &[PlantConstraint],
        families: &mut [Family],
        settings: &RepairSettings,
    ) -> Result<usize> {
        let mut changes = 0;
        let mut round = 0;

        loop {
            let failing: Vec<usize> = constraints
                .iter()
                .enumerate()
                .filter(|(_, c)| !c.validate(families))
                .map(|(index, _)| index)
                .collect();

            if failing.is_empty() {
                debug!(rounds = round, changes, "all plant constraints satisfied");
                return Ok(changes);
            }
            if round >= self.max_rounds {
                return Err(OptimizerError::IterationLimit {
                    context: "combinatorial plant repair".to_string(),
                    limit: self.max_rounds,
                });
            }

            // A failing plant that produces nothing cannot be repaired.
            let Some(reference) = self.reference_family(&failing, constraints, families) else {
                return Err(OptimizerError::RepairExhausted {
                    constraint: constraints[failing[0]].name(),
                });
            };
            let Some(target) = Self::select_target(&failing, constraints, families, reference) else {
                return Err(OptimizerError::RepairExhausted {
                    constraint: constraints[failing[0]].name(),
                });
            };

            debug!(
                round,
                failing = failing.len(),
                reference = families[reference].id(),
                constraint = %constraints[target].name(),
                "repairing most entangled plant"
            );
            changes += constraints[target].solve(families, settings)?;
            round += 1;
        }
    }
}

/// Families produced by every plant in `group`.
fn shared_families(group: &[usize], constraints: &[PlantConstraint]) -> BTreeSet<usize> {
    let mut plants = group.iter().map(|&index| constraints[index].plant.active_families());
    let Some(first) = plants.next() else {
        return BTreeSet::new();
    };
    plants.fold(first.clone(), |shared, active| shared.intersection(active).copied().collect())
}

/// All `size`-element combinations of `items`, in lexicographic order.
fn combinations(items: &[usize], size: usize) -> Vec<Vec<usize>> {
    if size == 0 {
        return vec![Vec::new()];
    }
    if items.len() < size {
        return Vec::new();
    }

    let mut result = Vec::new();
    for (position, &head) in items.iter().enumerate() {
        for mut tail in combinations(&items[position + 1..], size - 1) {
            tail.insert(0, head);
            result.push(tail);
        }
    }
    result
}
