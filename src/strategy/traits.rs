// src/strategy/traits.rs

use crate::error::Result;
use crate::model::family::Family;
use crate::strategy::constraints::{PlantConstraint, RepairSettings};
use std::fmt::Debug;

/// Drives a set of plant constraints back to feasibility.
///
/// Implementations only ever lower fill rates, one constraint at a time;
/// every step sees the state left behind by the previous one.
pub trait ConstraintSolver: Debug {
    /// Repairs `constraints` against `families`.
    ///
    /// Returns the number of fill-rate changes made.
    fn solve(
        &mut self,
        constraints: &[PlantConstraint],
        families: &mut [Family],
        settings: &RepairSettings,
    ) -> Result<usize>;
}
