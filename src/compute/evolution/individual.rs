//! Decision vectors and mating pairs.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::genome::{GeneRng, assert_discretization};

/// One candidate solution: normalized genes plus a scalar fitness.
///
/// Fitness is `NaN` until the caller evaluates the individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    genes: Vec<f64>,
    fitness: f64,
}

impl Individual {
    /// All-zero chromosome of the given length, unevaluated.
    pub fn new(length: usize) -> Self {
        Self {
            genes: vec![0.0; length],
            fitness: f64::NAN,
        }
    }

    /// Random chromosome; genes are snapped to `discretization` levels when set.
    ///
    /// Panics when `discretization` is below 2 steps.
    pub fn random(length: usize, discretization: Option<usize>, rng: &mut GeneRng) -> Self {
        assert_discretization(discretization);
        Self {
            genes: (0..length).map(|_| rng.gene(discretization)).collect(),
            fitness: f64::NAN,
        }
    }

    /// Individual with known genes, unevaluated.
    pub fn from_genes(genes: Vec<f64>) -> Self {
        for &g in &genes {
            assert_gene_range(g);
        }
        Self {
            genes,
            fitness: f64::NAN,
        }
    }

    /// Chromosome length.
    #[inline]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    #[inline]
    pub fn genes(&self) -> &[f64] {
        &self.genes
    }

    /// Gene at `index`. Panics when out of range.
    #[inline]
    pub fn gene(&self, index: usize) -> f64 {
        self.genes[index]
    }

    /// Overwrite gene at `index`. Panics when out of range or outside [0, 1).
    pub fn set_gene(&mut self, index: usize, value: f64) {
        assert_gene_range(value);
        self.genes[index] = value;
    }

    #[inline]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    #[inline]
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    /// Mark as not yet evaluated.
    #[inline]
    pub fn invalidate(&mut self) {
        self.fitness = f64::NAN;
    }

    /// Whether a fitness value has been assigned.
    #[inline]
    pub fn is_evaluated(&self) -> bool {
        !self.fitness.is_nan()
    }

    /// Ordering for a descending-fitness sort. Unevaluated individuals sort last.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.is_evaluated(), other.is_evaluated()) {
            (true, true) => other.fitness.total_cmp(&self.fitness),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        }
    }

    /// Euclidean distance between the two gene vectors.
    pub fn distance(&self, other: &Self) -> f64 {
        assert_eq!(self.len(), other.len(), "chromosome length mismatch");
        self.genes
            .iter()
            .zip(&other.genes)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    /// Copy genes and fitness from `other`.
    pub fn copy_genes(&mut self, other: &Self) {
        assert_eq!(self.len(), other.len(), "chromosome length mismatch");
        self.genes.copy_from_slice(&other.genes);
        self.fitness = other.fitness;
    }

    /// Re-draw exactly one random gene. Returns its index.
    pub fn mutate_gene(&mut self, discretization: Option<usize>, rng: &mut GeneRng) -> usize {
        assert!(!self.is_empty(), "cannot mutate an empty chromosome");
        let index = rng.index(0..self.genes.len());
        self.genes[index] = rng.gene_other_than(self.genes[index], discretization);
        index
    }

    /// Mutable access for in-place recombination.
    #[inline]
    pub(crate) fn genes_mut(&mut self) -> &mut [f64] {
        &mut self.genes
    }
}

#[inline]
fn assert_gene_range(value: f64) {
    assert!(
        (0.0..1.0).contains(&value),
        "gene value {value} outside [0, 1)"
    );
}

/// Two distinct survivors chosen to produce offspring.
///
/// Pairs compare by identity regardless of which parent is `dad`.
#[derive(Debug, Clone, Copy, Eq)]
pub struct MatingPair {
    dad: usize,
    mom: usize,
}

impl MatingPair {
    /// Pair two survivor indices. Panics when they are the same individual.
    pub fn new(dad: usize, mom: usize) -> Self {
        assert_ne!(dad, mom, "an individual cannot mate with itself");
        Self { dad, mom }
    }

    #[inline]
    pub fn dad(&self) -> usize {
        self.dad
    }

    #[inline]
    pub fn mom(&self) -> usize {
        self.mom
    }

    #[inline]
    fn key(&self) -> (usize, usize) {
        (self.dad.min(self.mom), self.dad.max(self.mom))
    }
}

impl PartialEq for MatingPair {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Hash for MatingPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
