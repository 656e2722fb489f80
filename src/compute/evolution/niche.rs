//! Fitness sharing primitives.
//!
//! None of these are applied by [`Population::evolve`](super::Population::evolve);
//! callers that want niching penalize fitness themselves before the next
//! selection.

use super::individual::Individual;

/// Triangular sharing kernel: `1 - d/sigma` inside the niche radius, else 0.
#[inline]
pub fn sharing(distance: f64, sigma: f64) -> f64 {
    if distance < sigma {
        1.0 - distance / sigma
    } else {
        0.0
    }
}

/// Crowding of `target` within radius `sigma`, counting every member of
/// `individuals` (including `target` itself when present).
pub fn niche_count(individuals: &[Individual], target: &Individual, sigma: f64) -> f64 {
    assert!(sigma > 0.0, "niche radius must be positive");
    individuals
        .iter()
        .map(|other| sharing(target.distance(other), sigma))
        .sum()
}

/// Fitness of `target` divided by its niche count.
///
/// When any evaluated fitness is negative, every fitness is first shifted up
/// by the lowest one so that a larger niche count always lowers the result.
/// Returns `NaN` for unevaluated individuals.
pub fn shared_fitness(individuals: &[Individual], target: &Individual, sigma: f64) -> f64 {
    let lowest = individuals
        .iter()
        .chain(std::iter::once(target))
        .filter(|i| i.is_evaluated())
        .map(Individual::fitness)
        .fold(0.0, f64::min);
    let fitness = target.fitness() - lowest;

    let count = niche_count(individuals, target, sigma);
    if count > 0.0 { fitness / count } else { fitness }
}

/// Mean pairwise gene distance.
pub fn mean_pairwise_distance(individuals: &[Individual]) -> f64 {
    if individuals.len() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    let mut count = 0usize;
    for (i, a) in individuals.iter().enumerate() {
        for b in &individuals[i + 1..] {
            total += a.distance(b);
            count += 1;
        }
    }
    total / count as f64
}
