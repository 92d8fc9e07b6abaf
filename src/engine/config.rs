// src/engine/config.rs

use crate::model::cycle::NewtonSettings;
use crate::strategy::constraints::RepairSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which strategy repairs the plant constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    Sequential,
    #[default]
    Combinatorial,
}

/// Tunables of an optimization run. Every field has a default, so an empty
/// TOML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OptimizerConfig {
    /// Fill-rate decrement per repair step.
    pub fill_rate_step: f64,
    /// Maximum fill-rate changes per constraint repair.
    pub max_repair_steps: usize,
    /// Maximum rounds of the combinatorial solver.
    pub max_solver_rounds: usize,
    pub solver: SolverKind,
    /// Shuffle plant constraints before the sequential solver runs them.
    pub shuffle_constraints: bool,
    /// Seed for the shuffle; `None` gives a different order each run.
    pub random_seed: Option<u64>,
    pub newton: NewtonSettings,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            fill_rate_step: 0.01,
            max_repair_steps: 100_000,
            max_solver_rounds: 10_000,
            solver: SolverKind::default(),
            shuffle_constraints: true,
            random_seed: None,
            newton: NewtonSettings::default(),
        }
    }
}

impl OptimizerConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fill_rate_step > 0.0 && self.fill_rate_step < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "fill_rate_step must lie in (0, 1), got {}",
                self.fill_rate_step
            )));
        }
        if self.max_repair_steps == 0 || self.max_solver_rounds == 0 {
            return Err(ConfigError::Invalid(
                "max_repair_steps and max_solver_rounds must be positive".to_string(),
            ));
        }
        if self.newton.max_iterations == 0 || !(self.newton.tolerance > 0.0) {
            return Err(ConfigError::Invalid(
                "newton.max_iterations and newton.tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn repair_settings(&self) -> RepairSettings {
        RepairSettings {
            step: self.fill_rate_step,
            max_steps: self.max_repair_steps,
            newton: self.newton,
        }
    }
}
