use fill_rate_optimizer::io::demand::{self, MonthlyDemand};
use fill_rate_optimizer::io::{input, reporting};
use fill_rate_optimizer::model::family::{Family, FamilySpec};
use fill_rate_optimizer::model::plant::Plant;
use fill_rate_optimizer::{logging, FillRateOptimizer, Network, OptimizerConfig};
use std::env;
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

const CONFIG_FILE: &str = "optimizer.toml";

fn main() -> ExitCode {
    logging::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    println!("=== Fill Rate Optimization ===");

    // 1. CONFIGURATION
    let config = if Path::new(CONFIG_FILE).exists() {
        OptimizerConfig::load(CONFIG_FILE)?
    } else {
        OptimizerConfig::default()
    };

    // 2. INPUT
    // fill-rate-optimizer [INPUT_DIR] [OUTPUT_DIR]
    let args: Vec<String> = env::args().collect();
    let mut network = match args.get(1) {
        Some(dir) => input::load_network(dir, &config.newton)?,
        None => {
            println!("No input directory given, using the demo network.");
            demo_network(&config)?
        }
    };
    let output_dir = args.get(2).map(String::as_str).unwrap_or(".");

    // 3. OPTIMIZE
    let optimizer = FillRateOptimizer::new(config);
    let outcome = optimizer.run(&mut network)?;

    // 4. EXPORT RESULTS
    for path in reporting::write_outcome(output_dir, &outcome)? {
        println!("Written {}", path.display());
    }

    // 5. SUMMARY
    println!("\n=== Fill Rates ===");
    for family in &outcome.families {
        println!(
            "{:<12} {:>6.2}%  (critical {:>6.2}%, target {:>6.2}%)  cost ${:.2}",
            family.family,
            family.fill_rate * 100.0,
            family.critical_fill_rate * 100.0,
            family.target_fill_rate * 100.0,
            family.total_cost
        );
    }
    println!("\n=== Constraints ===");
    for constraint in &outcome.constraints {
        println!(
            "{:<12} load {:>12.2} / limit {:>12.2}",
            constraint.constraint, constraint.load, constraint.limit
        );
    }
    println!(
        "\nTotal holding cost: ${:.2} after {} fill-rate changes",
        outcome.total_cost(),
        outcome.fill_rate_changes
    );

    Ok(())
}

/// Four families over two plants with one shared family, tight enough that
/// both the plants and the budget need repair.
fn demo_network(config: &OptimizerConfig) -> Result<Network, Box<dyn Error>> {
    let definitions = [
        ("Coils", 900.0, 400.0, 10),
        ("Sheets", 700.0, 250.0, 14),
        ("Tubes", 400.0, 300.0, 7),
        ("Wire", 150.0, 120.0, 10),
    ];

    let mut families = Vec::new();
    for (seed, (id, revenue, monthly_mean, lead_time)) in definitions.into_iter().enumerate() {
        let months: [MonthlyDemand; 12] =
            demand::generate_normal_months(monthly_mean, monthly_mean * 0.3, seed as u64)?;
        let profile = demand::spread_monthly(&months);
        let spec = FamilySpec {
            id: id.to_string(),
            daily_demand: profile.daily_demand,
            daily_std_dev: profile.daily_std_dev,
            production_days: 3,
            lead_time,
            target_fill_rate: 0.98,
            critical_fill_rate: 0.90,
            holding_cost: 12.0,
            revenue,
            sales_price: 60.0,
        };
        families.push(Family::new(spec, &config.newton)?);
    }
    Network::sort_families(&mut families);

    let tons: Vec<f64> = families.iter().map(Family::total_service_tons).collect();
    let plant_a = vec![0.6, 0.0, 0.5, 1.0];
    let plant_b = vec![0.4, 1.0, 0.5, 0.0];
    let loads = |shares: &[f64]| shares.iter().zip(&tons).map(|(s, t)| s * t).sum::<f64>();

    // Capacities and budget leave a little room above the critical-rate load.
    let plants = vec![
        Plant::new("North", loads(&plant_a) * 1.08, plant_a),
        Plant::new("South", loads(&plant_b) * 1.10, plant_b),
    ];
    let budget = families.iter().map(Family::total_cost).sum::<f64>() * 1.12;

    Ok(Network::new(families, plants, budget)?)
}
