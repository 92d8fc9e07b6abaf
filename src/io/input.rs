// src/io/input.rs

use crate::error::OptimizerError;
use crate::io::demand::{spread_monthly, MonthlyDemand};
use crate::model::cycle::NewtonSettings;
use crate::model::family::{Family, FamilySpec};
use crate::model::network::Network;
use crate::model::plant::Plant;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Problems with the input tables. These are data errors, raised before the
/// optimization core sees anything.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{table}: unknown family '{family}'")]
    UnknownFamily { table: &'static str, family: String },

    #[error("allocation: unknown plant '{0}'")]
    UnknownPlant(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error(transparent)]
    Core(#[from] OptimizerError),
}

/// Row of `families.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct FamilyRow {
    pub family: String,
    pub target_fill_rate: f64,
    pub critical_fill_rate: f64,
    pub lead_time: u32,
    pub production_days: u32,
    pub variable_cost: f64,
    pub fixed_cost: f64,
    pub revenue: f64,
    pub sales_price: f64,
}

/// Row of `demand.csv`; `month` runs from 1 to 12.
#[derive(Debug, Clone, Deserialize)]
pub struct DemandRow {
    pub family: String,
    pub month: usize,
    pub demand: f64,
    pub std_dev: f64,
}

/// Row of `plants.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlantRow {
    pub plant: String,
    pub capacity: f64,
}

/// Row of `allocation.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct AllocationRow {
    pub family: String,
    pub plant: String,
    pub share: f64,
}

/// Row of `budget.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetRow {
    pub budget: f64,
}

/// The raw tables of one input set.
#[derive(Debug, Clone, Default)]
pub struct InputTables {
    pub families: Vec<FamilyRow>,
    pub demand: Vec<DemandRow>,
    pub plants: Vec<PlantRow>,
    pub allocation: Vec<AllocationRow>,
    pub budget: f64,
}

fn read_table<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, InputError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

impl InputTables {
    /// Reads `families.csv`, `demand.csv`, `plants.csv`, `allocation.csv`
    /// and `budget.csv` from `dir`.
    pub fn read_dir(dir: impl AsRef<Path>) -> Result<Self, InputError> {
        let dir = dir.as_ref();
        let budget_rows: Vec<BudgetRow> = read_table(&dir.join("budget.csv"))?;
        let budget = match budget_rows.as_slice() {
            [row] => row.budget,
            rows => {
                return Err(InputError::Invalid(format!(
                    "budget.csv must hold exactly one row, found {}",
                    rows.len()
                )))
            }
        };

        Ok(Self {
            families: read_table(&dir.join("families.csv"))?,
            demand: read_table(&dir.join("demand.csv"))?,
            plants: read_table(&dir.join("plants.csv"))?,
            allocation: read_table(&dir.join("allocation.csv"))?,
            budget,
        })
    }

    /// Reconciles the tables into a [`Network`] with families solved at
    /// their critical fill rate and sorted by descending rank.
    pub fn into_network(self, settings: &NewtonSettings) -> Result<Network, InputError> {
        if self.families.is_empty() {
            return Err(InputError::Invalid("families.csv has no rows".to_string()));
        }

        let mut monthly: HashMap<String, [MonthlyDemand; 12]> = self
            .families
            .iter()
            .map(|row| (row.family.clone(), [MonthlyDemand::default(); 12]))
            .collect();
        if monthly.len() != self.families.len() {
            return Err(InputError::Invalid("families.csv lists a family twice".to_string()));
        }

        let mut seen_months = HashSet::new();
        for row in &self.demand {
            let months = monthly
                .get_mut(&row.family)
                .ok_or_else(|| InputError::UnknownFamily {
                    table: "demand",
                    family: row.family.clone(),
                })?;
            if !(1..=12).contains(&row.month) {
                return Err(InputError::Invalid(format!(
                    "demand: month {} for family '{}' is outside 1..=12",
                    row.month, row.family
                )));
            }
            if !seen_months.insert((row.family.as_str(), row.month)) {
                return Err(InputError::Invalid(format!(
                    "demand: month {} for family '{}' is listed twice",
                    row.month, row.family
                )));
            }
            months[row.month - 1] = MonthlyDemand {
                demand: row.demand,
                std_dev: row.std_dev,
            };
        }

        let mut families = Vec::with_capacity(self.families.len());
        for row in self.families {
            let months = monthly.remove(&row.family).unwrap_or_default();
            if months.iter().all(|m| m.demand == 0.0) {
                warn!(family = %row.family, "family has no demand rows");
            }
            let profile = spread_monthly(&months);
            let spec = FamilySpec {
                id: row.family,
                daily_demand: profile.daily_demand,
                daily_std_dev: profile.daily_std_dev,
                production_days: row.production_days,
                lead_time: row.lead_time,
                target_fill_rate: row.target_fill_rate,
                critical_fill_rate: row.critical_fill_rate,
                holding_cost: row.variable_cost + row.fixed_cost,
                revenue: row.revenue,
                sales_price: row.sales_price,
            };
            families.push(Family::new(spec, settings)?);
        }
        Network::sort_families(&mut families);

        let family_index: HashMap<&str, usize> = families
            .iter()
            .enumerate()
            .map(|(index, family)| (family.id(), index))
            .collect();

        let mut shares: BTreeMap<&str, Vec<f64>> = self
            .plants
            .iter()
            .map(|row| (row.plant.as_str(), vec![0.0; families.len()]))
            .collect();
        if shares.len() != self.plants.len() {
            return Err(InputError::Invalid("plants.csv lists a plant twice".to_string()));
        }
        if let Some(row) = self
            .plants
            .iter()
            .find(|row| !(row.capacity.is_finite() && row.capacity >= 0.0))
        {
            return Err(InputError::Invalid(format!(
                "plants: capacity {} of plant '{}' must be finite and non-negative",
                row.capacity, row.plant
            )));
        }

        let mut seen_pairs = HashSet::new();
        for row in &self.allocation {
            let index = *family_index
                .get(row.family.as_str())
                .ok_or_else(|| InputError::UnknownFamily {
                    table: "allocation",
                    family: row.family.clone(),
                })?;
            let plant = shares
                .get_mut(row.plant.as_str())
                .ok_or_else(|| InputError::UnknownPlant(row.plant.clone()))?;
            if !(0.0..=1.0).contains(&row.share) {
                return Err(InputError::Invalid(format!(
                    "allocation: share {} of family '{}' at plant '{}' is outside [0, 1]",
                    row.share, row.family, row.plant
                )));
            }
            if !seen_pairs.insert((row.family.as_str(), row.plant.as_str())) {
                return Err(InputError::Invalid(format!(
                    "allocation: family '{}' at plant '{}' is listed twice",
                    row.family, row.plant
                )));
            }
            plant[index] = row.share;
        }

        let plants = self
            .plants
            .iter()
            .map(|row| {
                let allocation = shares.remove(row.plant.as_str()).unwrap_or_default();
                Plant::new(row.plant.clone(), row.capacity, allocation)
            })
            .collect();

        info!(families = families.len(), budget = self.budget, "input reconciled");
        Ok(Network::new(families, plants, self.budget)?)
    }
}

/// Reads and reconciles an input directory in one go.
pub fn load_network(dir: impl AsRef<Path>, settings: &NewtonSettings) -> Result<Network, InputError> {
    InputTables::read_dir(dir)?.into_network(settings)
}
