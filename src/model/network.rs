// src/model/network.rs

use crate::error::{OptimizerError, Result};
use crate::model::family::Family;
use crate::model::plant::Plant;

/// Everything one optimization run works on.
///
/// Families are kept in descending rank order (most important first); plants
/// address them by index through their allocation vectors.
#[derive(Debug, Clone)]
pub struct Network {
    pub families: Vec<Family>,
    pub plants: Vec<Plant>,
    /// Ceiling on the summed holding cost of all families.
    pub budget: f64,
}

impl Network {
    pub fn new(families: Vec<Family>, plants: Vec<Plant>, budget: f64) -> Result<Self> {
        if families.is_empty() {
            return Err(OptimizerError::InvalidNetwork(
                "at least one family is required".to_string(),
            ));
        }
        if let Some(pair) = families.windows(2).find(|pair| pair[0] < pair[1]) {
            return Err(OptimizerError::InvalidNetwork(format!(
                "families must be sorted by descending rank, '{}' precedes '{}'",
                pair[0].id(),
                pair[1].id()
            )));
        }
        if let Some(plant) = plants.iter().find(|p| p.allocation.len() != families.len()) {
            return Err(OptimizerError::InvalidNetwork(format!(
                "plant '{}' has {} allocation shares for {} families",
                plant.id,
                plant.allocation.len(),
                families.len()
            )));
        }

        Ok(Self {
            families,
            plants,
            budget,
        })
    }

    /// Sorts families into descending rank order, as the constructor expects.
    pub fn sort_families(families: &mut [Family]) {
        families.sort_by(|a, b| b.cmp(a));
    }

    pub fn total_cost(&self) -> f64 {
        self.families.iter().map(Family::total_cost).sum()
    }

    pub fn family(&self, id: &str) -> Option<&Family> {
        self.families.iter().find(|f| f.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::family::tests::flat_family;

    #[test]
    fn test_rejects_unsorted_families() {
        let families = vec![flat_family("A", 1.0, 1.0, 0.0, 30), flat_family("B", 2.0, 1.0, 0.0, 30)];
        let err = Network::new(families, Vec::new(), 10.0).unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidNetwork(_)));
    }

    #[test]
    fn test_rejects_mismatched_allocation() {
        let families = vec![flat_family("A", 1.0, 1.0, 0.0, 30)];
        let plants = vec![Plant::new("P1", 10.0, vec![0.5, 0.5])];
        assert!(Network::new(families, plants, 10.0).is_err());
    }

    #[test]
    fn test_sort_families_descending() {
        let mut families = vec![
            flat_family("A", 1.0, 1.0, 0.0, 30),
            flat_family("B", 2.0, 1.0, 0.0, 30),
            flat_family("C", 1.0, 1.0, 0.0, 30),
        ];
        Network::sort_families(&mut families);
        let ids: Vec<&str> = families.iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);

        let network = Network::new(families, Vec::new(), 1e9).unwrap();
        assert!(network.family("C").is_some());
        assert!(network.total_cost() > 0.0);
    }
}
