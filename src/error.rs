// src/error.rs

use thiserror::Error;

/// Errors raised by the fill-rate optimization core.
///
/// Every variant is fatal for the run. There is no retryable class: a failure
/// means either the instance is structurally infeasible or a numerical solve
/// broke down.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizerError {
    /// A constraint fails with every family already at its critical fill rate.
    #[error("constraint '{constraint}' is infeasible even at the critical fill rates")]
    InfeasibleAtFloor { constraint: String },

    /// The repair cursor ran out of families that can still be lowered.
    #[error("constraint '{constraint}' has no repairable family left")]
    RepairExhausted { constraint: String },

    /// The safety-stock root-finder did not converge for one cycle.
    #[error("safety-stock solve for family '{family}' (cycle starting day {start_day}) did not converge after {iterations} iterations")]
    SolveNonConvergence {
        family: String,
        start_day: u32,
        iterations: usize,
    },

    #[error("fill rate {value} is not valid for family '{family}'")]
    InvalidFillRate { family: String, value: f64 },

    #[error("family '{family}' is invalid: {reason}")]
    InvalidFamily { family: String, reason: String },

    /// Families, plants and allocations do not line up.
    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    /// A bounded loop (repair steps or solver rounds) hit its limit.
    #[error("{context} exceeded the limit of {limit} iterations")]
    IterationLimit { context: String, limit: usize },
}

pub type Result<T> = std::result::Result<T, OptimizerError>;
