// src/io/reporting.rs

use crate::engine::optimizer::Outcome;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes any serializable rows to a CSV file with a header line.
pub fn write_records<T: Serialize>(file_path: impl AsRef<Path>, data: &[T]) -> Result<(), csv::Error> {
    let path = file_path.as_ref();
    let mut wtr = csv::Writer::from_path(path)?;

    for record in data {
        wtr.serialize(record)?;
    }

    // Flush the buffer to ensure all data is written
    wtr.flush()?;

    info!(rows = data.len(), path = %path.display(), "exported records");
    Ok(())
}

/// Writes `families.csv`, `cycles.csv` and `constraints.csv` into `dir`.
///
/// Returns the paths written, in that order.
pub fn write_outcome(dir: impl AsRef<Path>, outcome: &Outcome) -> Result<Vec<PathBuf>, csv::Error> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let families = dir.join("families.csv");
    let cycles = dir.join("cycles.csv");
    let constraints = dir.join("constraints.csv");

    write_records(&families, &outcome.families)?;
    write_records(&cycles, &outcome.cycles)?;
    write_records(&constraints, &outcome.constraints)?;

    Ok(vec![families, cycles, constraints])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::optimizer::{CycleRecord, FamilySummary};
    use crate::strategy::constraints::ConstraintReport;

    fn outcome() -> Outcome {
        Outcome {
            families: vec![FamilySummary {
                family: "F1".to_string(),
                revenue: 10.0,
                critical_fill_rate: 0.9,
                target_fill_rate: 0.98,
                fill_rate: 0.95,
                total_service_tons: 120.5,
                total_cost: 241.0,
            }],
            cycles: vec![CycleRecord {
                family: "F1".to_string(),
                start_day: 1,
                end_day: 10,
                expected_consumption: 20.0,
                demand_std_dev: 9.5,
                fill_rate: 0.95,
                safety_stock: 3.2,
                backorder_quantity: 1.2,
                backorder_cost: 12.0,
            }],
            constraints: vec![ConstraintReport {
                constraint: "budget".to_string(),
                satisfied: Some(true),
                load: 241.0,
                limit: 300.0,
            }],
            fill_rate_changes: 3,
        }
    }

    #[test]
    fn test_write_outcome_creates_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report");
        let paths = write_outcome(&out, &outcome()).unwrap();

        assert_eq!(paths.len(), 3);
        let families = fs::read_to_string(&paths[0]).unwrap();
        let mut lines = families.lines();
        assert_eq!(
            lines.next().unwrap(),
            "family,revenue,critical_fill_rate,target_fill_rate,fill_rate,total_service_tons,total_cost"
        );
        assert!(lines.next().unwrap().starts_with("F1,10.0,0.9,0.98,0.95"));

        let cycles = fs::read_to_string(&paths[1]).unwrap();
        assert!(cycles.starts_with("family,start_day,end_day,expected_consumption"));
        assert_eq!(cycles.lines().count(), 2);

        let constraints = fs::read_to_string(&paths[2]).unwrap();
        assert!(constraints.contains("budget,true,241.0,300.0"));
    }
}
