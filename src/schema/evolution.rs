//! Evolution configuration types for design optimization.
//!
//! This module provides the serializable configuration of an optimization
//! run (population, operator rates, termination) together with the progress
//! and result types reported by the driver.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ConfigError, DesignVariable};

/// Historical population size bounds exposed by calling UIs.
pub const POPULATION_SIZE_BOUNDS: (usize, usize) = (10, 100);

/// Historical convergence threshold upper bound.
pub const MAX_CONVERGENCE_THRESHOLD: f64 = 0.1;

/// Top-level configuration for an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Population settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Selection, crossover and mutation rates.
    #[serde(default)]
    pub operators: OperatorConfig,
    /// Generation budget.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stop as soon as the population is nominally converged.
    #[serde(default = "default_stop_on_convergence")]
    pub stop_on_convergence: bool,
    /// Stop once the best fitness reaches this value.
    #[serde(default)]
    pub target_fitness: Option<f64>,
    /// Search strategy.
    #[serde(default)]
    pub search: SearchMethod,
    /// Objective aggregation requested by the caller.
    #[serde(default)]
    pub objective: ObjectiveType,
    /// Design variables, one gene each.
    #[serde(default = "default_variables")]
    pub variables: Vec<DesignVariable>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Evaluate individuals in parallel.
    #[serde(default = "default_parallel_evaluation")]
    pub parallel_evaluation: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            operators: OperatorConfig::default(),
            max_generations: default_max_generations(),
            stop_on_convergence: default_stop_on_convergence(),
            target_fitness: None,
            search: SearchMethod::default(),
            objective: ObjectiveType::default(),
            variables: default_variables(),
            random_seed: None,
            parallel_evaluation: default_parallel_evaluation(),
        }
    }
}

fn default_max_generations() -> usize {
    50
}
fn default_stop_on_convergence() -> bool {
    true
}
fn default_variables() -> Vec<DesignVariable> {
    vec![DesignVariable::default()]
}
fn default_parallel_evaluation() -> bool {
    true
}

/// Population construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Parent selection method.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Relative gene tolerance for nominal convergence.
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,
    /// Snap genes to this many equally spaced levels.
    #[serde(default)]
    pub discretization_steps: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            selection: SelectionMethod::default(),
            convergence_threshold: default_convergence_threshold(),
            discretization_steps: None,
        }
    }
}

fn default_population_size() -> usize {
    20
}
fn default_convergence_threshold() -> f64 {
    0.01
}

/// Genetic operator rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Fraction of the population kept as survivors (0.0-1.0).
    #[serde(default = "default_selection_rate")]
    pub selection_rate: f64,
    /// Per-gene probability of the dad-weighted blend going to the first child.
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Fraction of the population mutated each generation (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            selection_rate: default_selection_rate(),
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
        }
    }
}

fn default_selection_rate() -> f64 {
    0.5
}
fn default_crossover_rate() -> f64 {
    0.8
}
fn default_mutation_rate() -> f64 {
    0.1
}

/// Selection method for choosing mating pairs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SelectionMethod {
    /// Fitness-proportionate selection over shifted survivor fitness.
    RouletteWheel,
    /// Pairwise tournament between random survivors.
    #[default]
    Tournament,
}

/// Search strategy offered by calling UIs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type")]
pub enum SearchMethod {
    /// Uniform exploration of the whole normalized domain.
    #[default]
    GlobalUniform,
    /// Randomized refinement around the current best. Not implemented.
    LocalRandomized {
        /// Normalized search radius.
        radius: f64,
    },
}

/// How the caller aggregates its objective over time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type")]
pub enum ObjectiveType {
    /// A single day of the year (1-365).
    SingleDay { day_of_year: u16 },
    /// Average over the full year.
    #[default]
    FullYear,
}

// ============================================================================
// Progress and results
// ============================================================================

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f64>,
    /// Average fitness per generation.
    pub avg_fitness: Vec<f64>,
    /// Standard deviation per generation.
    pub fitness_std: Vec<f64>,
    /// Mean pairwise gene distance per generation.
    pub diversity: Vec<f64>,
}

/// Best design found, in both gene and physical space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestDesign {
    /// Normalized genes.
    pub genes: Vec<f64>,
    /// Decoded physical values, one per design variable.
    pub values: Vec<f64>,
    /// Fitness of this design.
    pub fitness: f64,
}

/// Snapshot of a running optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationProgress {
    /// Current generation (0-based).
    pub generation: usize,
    /// Generation budget.
    pub total_generations: usize,
    /// Best fitness seen so far.
    pub best_fitness: f64,
    /// Average fitness of the evaluated population.
    pub avg_fitness: f64,
    /// Whether the population is nominally converged.
    pub converged: bool,
    /// Current best design.
    pub best: Option<BestDesign>,
}

/// Final result of an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Best design found.
    pub best: BestDesign,
    /// Statistics from the run.
    pub stats: RunStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

/// Statistics from an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// Generations evolved.
    pub generations: usize,
    /// Objective evaluations performed.
    pub total_evaluations: u64,
    /// Individuals rolled back after failing the feasibility check.
    pub restored: u64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason an optimization stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Population nominally converged.
    Converged,
    /// Reached target fitness.
    TargetReached,
    /// User cancelled.
    Cancelled,
    /// Roulette selection found no distinct mate; the best design so far is kept.
    SelectionExhausted,
}

// ============================================================================
// Validation
// ============================================================================

impl EvolutionConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Chromosome length implied by the variable table.
    pub fn chromosome_length(&self) -> usize {
        self.variables.len()
    }

    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = POPULATION_SIZE_BOUNDS;
        let size = self.population.size;
        if !(min..=max).contains(&size) {
            return Err(ConfigError::PopulationSize { size, min, max });
        }

        let check_rate = |name: &'static str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidRate { name, value })
            }
        };
        check_rate("Selection", self.operators.selection_rate)?;
        check_rate("Crossover", self.operators.crossover_rate)?;
        check_rate("Mutation", self.operators.mutation_rate)?;

        if (self.operators.selection_rate * size as f64).floor() < 2.0 {
            return Err(ConfigError::TooFewSurvivors(self.operators.selection_rate));
        }

        let threshold = self.population.convergence_threshold;
        if !(0.0..=MAX_CONVERGENCE_THRESHOLD).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold {
                value: threshold,
                max: MAX_CONVERGENCE_THRESHOLD,
            });
        }

        if let Some(steps) = self.population.discretization_steps
            && steps < 2
        {
            return Err(ConfigError::InvalidDiscretization(steps));
        }

        if self.max_generations == 0 {
            return Err(ConfigError::InvalidGenerations);
        }

        if self.variables.is_empty() {
            return Err(ConfigError::NoVariables);
        }
        for v in &self.variables {
            let ordered = v.min < v.max;
            if !ordered {
                return Err(ConfigError::InvalidBounds {
                    name: v.name.clone(),
                    min: v.min,
                    max: v.max,
                });
            }
        }

        if let SearchMethod::LocalRandomized { .. } = self.search {
            return Err(ConfigError::UnsupportedSearchMethod("LocalRandomized"));
        }

        Ok(())
    }
}
