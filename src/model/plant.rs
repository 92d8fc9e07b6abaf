// src/model/plant.rs

use std::collections::BTreeSet;

/// Allocation shares below this value are treated as "not produced here".
pub const ALLOCATION_EPSILON: f64 = 1e-6;

/// A production facility.
///
/// `allocation` runs parallel to the network's family list: entry `i` is the
/// fraction of family `i`'s service tons produced in this plant.
#[derive(Debug, Clone, PartialEq)]
pub struct Plant {
    pub id: String,
    /// Annual capacity in tons.
    pub capacity: f64,
    pub allocation: Vec<f64>,
    active: BTreeSet<usize>,
}

impl Plant {
    pub fn new(id: impl Into<String>, capacity: f64, allocation: Vec<f64>) -> Self {
        let active = allocation
            .iter()
            .enumerate()
            .filter(|(_, share)| **share >= ALLOCATION_EPSILON)
            .map(|(index, _)| index)
            .collect();

        Self {
            id: id.into(),
            capacity,
            allocation,
            active,
        }
    }

    /// Share of family `index` in this plant (0 when out of range).
    pub fn share(&self, index: usize) -> f64 {
        self.allocation.get(index).copied().unwrap_or(0.0)
    }

    /// Whether family `index` has a non-negligible share here.
    pub fn produces(&self, index: usize) -> bool {
        self.active.contains(&index)
    }

    /// Indices of the families this plant actually produces.
    pub fn active_families(&self) -> &BTreeSet<usize> {
        &self.active
    }

    /// Tons this plant must produce given each family's service tons.
    pub fn load(&self, service_tons: impl IntoIterator<Item = f64>) -> f64 {
        self.allocation
            .iter()
            .zip(service_tons)
            .map(|(share, tons)| share * tons)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_families_skip_negligible_shares() {
        let plant = Plant::new("P1", 100.0, vec![0.5, 1e-7, 0.0, 1e-6]);
        let active: Vec<usize> = plant.active_families().iter().copied().collect();
        assert_eq!(active, vec![0, 3]);
        assert!(plant.produces(0));
        assert!(!plant.produces(1));
        assert_eq!(plant.share(9), 0.0);
    }

    #[test]
    fn test_load_is_dot_product() {
        let plant = Plant::new("P1", 100.0, vec![0.6, 0.4]);
        assert!((plant.load([80.0, 50.0]) - 68.0).abs() < 1e-12);
        assert!((plant.load([150.0, 50.0]) - 110.0).abs() < 1e-12);
    }
}
