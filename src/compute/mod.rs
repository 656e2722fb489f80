//! Compute module - Evolutionary search machinery.

pub mod evolution;

pub use evolution::{EvolutionError, GeneRng, Individual, Objective, Optimizer, Population};
