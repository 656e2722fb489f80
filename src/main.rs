//! Design Evo CLI - Optimize panel tilt from a JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use design_evo::{
    compute::{Optimizer, evolution::NoonIncidence},
    schema::{DesignVariable, EvolutionConfig, ObjectiveType},
};

/// Run configuration: the evolution settings plus the site description
/// consumed by the built-in noon-incidence objective.
#[derive(Debug, Serialize, Deserialize)]
struct RunConfig {
    #[serde(flatten)]
    evolution: EvolutionConfig,
    /// Site latitude in degrees (positive north).
    latitude_deg: f64,
    /// Tilts above this are rejected as infeasible.
    #[serde(default)]
    max_tilt_deg: Option<f64>,
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json>", args[0]);
        eprintln!();
        eprintln!("Optimize panel tilt from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to run configuration file");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: RunConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    let mut objective = NoonIncidence::new(config.latitude_deg, config.evolution.objective.clone());
    if let Some(max_tilt) = config.max_tilt_deg {
        objective = objective.with_max_tilt(max_tilt);
    }

    println!("Design Evo Optimization");
    println!("=======================");
    println!("Latitude: {:.2} deg", config.latitude_deg);
    println!("Objective: {:?}", config.evolution.objective);
    println!(
        "Population: {} ({:?})",
        config.evolution.population.size, config.evolution.population.selection
    );
    println!("Max generations: {}", config.evolution.max_generations);
    println!();

    let variables = config.evolution.variables.clone();
    let mut optimizer = Optimizer::new(config.evolution).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    println!("Running optimization...");
    let result = optimizer
        .run_with_callback(&objective, |progress| {
            println!(
                "  Generation {}/{}: best={:.6}, avg={:.6}{}",
                progress.generation,
                progress.total_generations,
                progress.best_fitness,
                progress.avg_fitness,
                if progress.converged { " (converged)" } else { "" }
            );
        })
        .unwrap_or_else(|e| {
            eprintln!("Optimization failed: {}", e);
            std::process::exit(1);
        });

    println!();
    println!("Best design:");
    for (variable, value) in variables.iter().zip(&result.best.values) {
        println!("  {}: {:.4} {}", variable.name, value, variable.unit);
    }
    println!("  Fitness: {:.6}", result.best.fitness);
    println!();
    println!(
        "Stopped after {} generations ({:?}), {} evaluations, {} rollbacks in {:.2}s",
        result.stats.generations,
        result.stats.stop_reason,
        result.stats.total_evaluations,
        result.stats.restored,
        result.stats.elapsed_seconds
    );
}

fn print_example_config() {
    let config = RunConfig {
        evolution: EvolutionConfig {
            objective: ObjectiveType::FullYear,
            variables: vec![DesignVariable::new("tilt", 0.0, 90.0).with_unit("deg")],
            random_seed: Some(42),
            ..Default::default()
        },
        latitude_deg: 47.6,
        max_tilt_deg: Some(60.0),
    };

    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
}
