//! Hand-written generation loop optimizing panel tilt and row spacing.
//!
//! Shows the per-generation protocol without the bundled driver, with
//! opt-in fitness sharing to keep the population spread out early on.

use design_evo::{
    compute::evolution::{GeneRng, NoonIncidence, Objective, Population},
    schema::{DesignVariable, ObjectiveType, SelectionMethod, decode_genes},
};

const GENERATIONS: usize = 60;
const SHARING_GENERATIONS: usize = 10;
const NICHE_RADIUS: f64 = 0.1;

fn main() {
    env_logger::init();

    let variables = vec![
        DesignVariable::new("tilt", 0.0, 90.0).with_unit("deg"),
        DesignVariable::new("row spacing", 2.0, 8.0).with_unit("m"),
    ];
    let incidence = NoonIncidence::new(47.6, ObjectiveType::FullYear).with_max_tilt(60.0);

    // Wider rows shade less but cost land; a simple penalty stands in for that.
    let objective = |values: &[f64]| {
        let shading = (-(values[1] - 2.0) / 1.5).exp() * (values[0] / 90.0);
        incidence.evaluate(values) * (1.0 - shading) - 0.02 * values[1]
    };

    let mut population = Population::new(
        30,
        variables.len(),
        SelectionMethod::Tournament,
        0.005,
        Some(360),
        GeneRng::new(2024),
    );

    println!("=== Tilt / Spacing Optimization ===\n");

    for generation in 0..GENERATIONS {
        for individual in population.individuals_mut() {
            let values = decode_genes(&variables, individual.genes());
            if incidence.is_feasible(&values) {
                individual.set_fitness(objective(values.as_slice()));
            } else {
                individual.invalidate();
            }
        }

        if generation < SHARING_GENERATIONS {
            let shared: Vec<f64> = population
                .individuals()
                .iter()
                .map(|i| population.shared_fitness(i, NICHE_RADIUS))
                .collect();
            for (individual, fitness) in population.individuals_mut().iter_mut().zip(shared) {
                individual.set_fitness(fitness);
            }
        }

        if let Some(best) = population.fittest() {
            let values = decode_genes(&variables, best.genes());
            println!(
                "Generation {:>2}: tilt={:6.2} deg, spacing={:5.2} m, fitness={:.5}, div={:.4}",
                generation,
                values[0],
                values[1],
                best.fitness(),
                population.diversity()
            );
        }

        if generation > 0 && population.is_nominally_converged() {
            println!("\nConverged after {} generations", generation);
            break;
        }

        population.select_survivors(0.5);
        population.save_genes();
        if let Err(e) = population.crossover(0.8) {
            eprintln!("Evolution failed: {}", e);
            return;
        }
        population.mutate(0.1);

        for index in 0..population.len() {
            let values = decode_genes(&variables, population.individuals()[index].genes());
            if !incidence.is_feasible(&values) {
                population.set_violation(index, true);
            }
        }
        population.restore_genes();
    }
}
