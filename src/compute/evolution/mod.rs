//! Evolutionary search over normalized design variables.
//!
//! # Overview
//!
//! The evolutionary search system consists of:
//!
//! - **Individuals** (`individual`): normalized gene vectors with a scalar fitness
//! - **Gene operations** (`genome`): seeded random source and blend arithmetic
//! - **Population** (`population`): elitist selection, blend crossover,
//!   single-gene mutation, constraint rollback and nominal convergence
//! - **Niche sharing** (`niche`): opt-in crowding metrics for fitness sharing
//! - **Objectives** (`objective`): the caller-supplied fitness capability
//! - **Driver** (`search`): a complete generation loop built on the above
//!
//! # Example
//!
//! ```rust,no_run
//! use design_evo::compute::evolution::{GeneRng, Population};
//! use design_evo::schema::SelectionMethod;
//!
//! let mut population =
//!     Population::new(20, 2, SelectionMethod::Tournament, 0.01, None, GeneRng::new(42));
//!
//! for _ in 0..100 {
//!     for individual in population.individuals_mut() {
//!         let fitness = -individual.genes().iter().map(|g| (g - 0.3).powi(2)).sum::<f64>();
//!         individual.set_fitness(fitness);
//!     }
//!     if population.is_nominally_converged() {
//!         break;
//!     }
//!     population.evolve(0.5, 0.8).unwrap();
//!     population.mutate(0.1);
//! }
//! ```

mod genome;
mod individual;
mod niche;
mod objective;
mod population;
mod search;

pub use genome::{GeneRng, blend, quantize_level, snap_to_lattice};
pub use individual::{Individual, MatingPair};
pub use niche::{mean_pairwise_distance, niche_count, shared_fitness, sharing};
pub use objective::{NoonIncidence, Objective, declination_deg};
pub use population::{MAX_SELECTION_ATTEMPTS, Population, select_pair};
pub use search::Optimizer;

use crate::schema::ConfigError;

/// Error type for evolution operations.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Tournament selection needs at least 2 survivors, got {survivors}")]
    TooFewSurvivors { survivors: usize },

    #[error("Roulette wheel found no distinct mate after {attempts} spins")]
    SelectionExhausted { attempts: usize },

    #[error("No individual produced a numeric fitness")]
    NoEvaluatedIndividuals,

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
