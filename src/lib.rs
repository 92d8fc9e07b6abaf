//! Fill-rate optimization for product families produced across plants.
//!
//! Finds, per family, the highest service fill rate that fits an aggregate
//! safety-stock holding budget and per-plant capacities, never dropping a
//! family below its critical fill rate.

pub mod engine;
pub mod error;
pub mod io;
pub mod logging;
pub mod model;
pub mod strategy;

pub use engine::config::{ConfigError, OptimizerConfig, SolverKind};
pub use engine::optimizer::{FillRateOptimizer, Outcome};
pub use error::{OptimizerError, Result};
pub use model::network::Network;
