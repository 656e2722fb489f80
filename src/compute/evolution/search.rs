//! Generation loop driving a [`Population`] against an [`Objective`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::schema::{
    BestDesign, DesignVariable, EvolutionConfig, EvolutionHistory, OptimizationProgress,
    OptimizationResult, RunStats, StopReason, decode_genes,
};

use super::EvolutionError;
use super::genome::GeneRng;
use super::individual::Individual;
use super::objective::Objective;
use super::population::Population;

/// Runs evaluate → select → crossover → mutate → rollback until a stop
/// condition holds.
pub struct Optimizer {
    config: EvolutionConfig,
    population: Population,
    history: EvolutionHistory,
    generation: usize,
    best: Option<Individual>,
    evaluations: u64,
    restored: u64,
    cancelled: Arc<AtomicBool>,
}

impl Optimizer {
    /// Validate `config` and seed a random initial population.
    pub fn new(config: EvolutionConfig) -> Result<Self, EvolutionError> {
        config.validate()?;

        let rng = match config.random_seed {
            Some(seed) => GeneRng::new(seed),
            None => GeneRng::from_entropy(),
        };
        let population =
            Population::from_config(&config.population, config.chromosome_length(), rng);

        info!(
            "Optimizer ready: {} individuals, {} variables, {:?} selection",
            config.population.size,
            config.chromosome_length(),
            config.population.selection
        );

        Ok(Self {
            config,
            population,
            history: EvolutionHistory::default(),
            generation: 0,
            best: None,
            evaluations: 0,
            restored: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Evaluate every feasible individual against `objective`.
    ///
    /// Infeasible individuals are left unevaluated, so they never rank,
    /// survive or become the best design.
    fn evaluate_population<O: Objective>(&mut self, objective: &O) {
        let variables = &self.config.variables;
        let individuals = self.population.individuals_mut();

        let scored = if self.config.parallel_evaluation {
            individuals
                .par_iter_mut()
                .map(|individual| evaluate_individual(individual, variables, objective))
                .filter(|&scored| scored)
                .count()
        } else {
            individuals
                .iter_mut()
                .map(|individual| evaluate_individual(individual, variables, objective))
                .filter(|&scored| scored)
                .count()
        };

        self.evaluations += scored as u64;

        let ranked = individuals.iter().filter(|i| i.is_evaluated()).count();
        let infeasible = individuals.len() - scored;
        if infeasible > 0 {
            debug!(
                "Generation {}: {} infeasible individuals left unevaluated",
                self.generation, infeasible
            );
        }
        if scored > ranked {
            warn!(
                "Generation {}: {} individuals returned a non-numeric fitness",
                self.generation,
                scored - ranked
            );
        }
    }

    /// Append fitness statistics and track the best design seen so far.
    fn record_generation(&mut self) {
        let fitness: Vec<f64> = self
            .population
            .individuals()
            .iter()
            .filter(|i| i.is_evaluated())
            .map(Individual::fitness)
            .collect();

        let (avg, std) = mean_std(&fitness);
        let gen_best = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        self.history.best_fitness.push(gen_best);
        self.history.avg_fitness.push(avg);
        self.history.fitness_std.push(std);
        self.history.diversity.push(self.population.diversity());

        if let Some(fittest) = self.population.fittest() {
            let improved = self
                .best
                .as_ref()
                .is_none_or(|best| fittest.fitness() > best.fitness());
            if improved {
                self.best = Some(fittest.clone());
            }
        }

        info!(
            "Generation {}: best = {:.6}, avg = {:.6}, std = {:.6}",
            self.generation, gen_best, avg, std
        );
    }

    /// One evolutionary step with constraint rollback.
    ///
    /// The snapshot is taken after survivors are sorted into place, so a
    /// rolled-back slot gets back the design it held before crossover.
    fn step_generation<O: Objective>(&mut self, objective: &O) -> Result<(), EvolutionError> {
        let operators = &self.config.operators;

        self.population.select_survivors(operators.selection_rate);
        self.population.save_genes();
        self.population.crossover(operators.crossover_rate)?;
        self.population.mutate(operators.mutation_rate);

        for index in 0..self.population.len() {
            let values = decode_genes(
                &self.config.variables,
                self.population.individuals()[index].genes(),
            );
            if !objective.is_feasible(&values) {
                self.population.set_violation(index, true);
            }
        }
        let restored = self.population.restore_genes();
        if restored > 0 {
            debug!(
                "Generation {}: rolled back {} infeasible individuals",
                self.generation, restored
            );
        }
        self.restored += restored as u64;

        self.generation += 1;
        Ok(())
    }

    /// Nominal convergence, only meaningful once survivors exist.
    fn is_converged(&self) -> bool {
        self.generation > 0 && self.population.is_nominally_converged()
    }

    /// Check if optimization should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if let Some(target) = self.config.target_fitness
            && self.best_fitness() >= target
        {
            return Some(StopReason::TargetReached);
        }

        if self.config.stop_on_convergence && self.is_converged() {
            return Some(StopReason::Converged);
        }

        if self.generation >= self.config.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        None
    }

    fn best_fitness(&self) -> f64 {
        self.best
            .as_ref()
            .map_or(f64::NEG_INFINITY, Individual::fitness)
    }

    fn best_design(&self) -> Option<BestDesign> {
        self.best.as_ref().map(|best| BestDesign {
            genes: best.genes().to_vec(),
            values: decode_genes(&self.config.variables, best.genes()),
            fitness: best.fitness(),
        })
    }

    /// Get current progress.
    pub fn progress(&self) -> OptimizationProgress {
        OptimizationProgress {
            generation: self.generation,
            total_generations: self.config.max_generations,
            best_fitness: self.best_fitness(),
            avg_fitness: self.history.avg_fitness.last().copied().unwrap_or(f64::NAN),
            converged: self.is_converged(),
            best: self.best_design(),
        }
    }

    /// Run optimization with progress callback.
    pub fn run_with_callback<O, F>(
        &mut self,
        objective: &O,
        mut callback: F,
    ) -> Result<OptimizationResult, EvolutionError>
    where
        O: Objective,
        F: FnMut(&OptimizationProgress),
    {
        let start_time = Instant::now();

        let stop_reason = loop {
            self.evaluate_population(objective);
            self.record_generation();
            callback(&self.progress());

            if let Some(reason) = self.should_stop() {
                break reason;
            }

            match self.step_generation(objective) {
                Ok(()) => {}
                Err(EvolutionError::SelectionExhausted { attempts }) => {
                    warn!(
                        "Generation {}: no distinct mate after {} spins, keeping best so far",
                        self.generation, attempts
                    );
                    break StopReason::SelectionExhausted;
                }
                Err(e) => return Err(e),
            }
        };

        let best = self.best_design().ok_or(EvolutionError::NoEvaluatedIndividuals)?;
        let elapsed = start_time.elapsed().as_secs_f64();

        info!(
            "Stopped after {} generations ({:?}): best fitness {:.6}",
            self.generation, stop_reason, best.fitness
        );

        Ok(OptimizationResult {
            best,
            stats: RunStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                restored: self.restored,
                elapsed_seconds: elapsed,
                stop_reason,
            },
            history: self.history.clone(),
        })
    }

    /// Run optimization (blocking).
    pub fn run<O: Objective>(
        &mut self,
        objective: &O,
    ) -> Result<OptimizationResult, EvolutionError> {
        self.run_with_callback(objective, |_| {})
    }
}

/// Score `individual` if its design is feasible. Returns whether the
/// objective was called.
fn evaluate_individual<O: Objective>(
    individual: &mut Individual,
    variables: &[DesignVariable],
    objective: &O,
) -> bool {
    let values = decode_genes(variables, individual.genes());
    if !objective.is_feasible(&values) {
        individual.invalidate();
        return false;
    }
    individual.set_fitness(objective.evaluate(&values));
    true
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
