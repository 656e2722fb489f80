//! Random source and gene-level arithmetic for evolutionary search.
//!
//! All randomness used by a population flows through one [`GeneRng`], so a run
//! is reproducible from its seed.

use rand::prelude::*;

/// Random number generator wrapper for gene operations.
#[derive(Debug, Clone)]
pub struct GeneRng {
    rng: StdRng,
}

impl GeneRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform value in [0, 1).
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// Fresh gene value: uniform in [0, 1), or a uniform lattice level when
    /// `steps` is set.
    pub fn gene(&mut self, steps: Option<usize>) -> f64 {
        assert_discretization(steps);
        match steps {
            Some(steps) => quantize_level(self.rng.gen_range(0..steps), steps),
            None => self.unit(),
        }
    }

    /// Fresh gene value guaranteed to differ from `current`.
    ///
    /// Panics when `steps` is set below 2, since no other level exists.
    pub fn gene_other_than(&mut self, current: f64, steps: Option<usize>) -> f64 {
        assert_discretization(steps);
        match steps {
            Some(steps) => {
                // Draw among the other levels, then skip over the current one.
                let current_level = ((current * steps as f64).floor() as usize).min(steps - 1);
                let mut level = self.rng.gen_range(0..steps - 1);
                if level >= current_level {
                    level += 1;
                }
                quantize_level(level, steps)
            }
            None => loop {
                let value = self.unit();
                if value != current {
                    break value;
                }
            },
        }
    }

    /// Bernoulli trial with probability `p` (clamped into [0, 1]).
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Uniform index in `range`.
    #[inline]
    pub fn index(&mut self, range: std::ops::Range<usize>) -> usize {
        self.rng.gen_range(range)
    }

    /// `amount` distinct indices drawn uniformly from `0..length`.
    pub fn distinct_indices(&mut self, length: usize, amount: usize) -> Vec<usize> {
        rand::seq::index::sample(&mut self.rng, length, amount.min(length)).into_vec()
    }
}

/// Lattice level `level` of `steps` equally spaced values in [0, 1).
#[inline]
pub fn quantize_level(level: usize, steps: usize) -> f64 {
    level as f64 / steps as f64
}

/// Nearest lattice level to `value`, never rounding up past the top level.
#[inline]
pub fn snap_to_lattice(value: f64, steps: usize) -> f64 {
    let level = ((value * steps as f64).round() as usize).min(steps - 1);
    quantize_level(level, steps)
}

/// Panics unless `steps` leaves room for at least two lattice levels.
#[inline]
pub(crate) fn assert_discretization(steps: Option<usize>) {
    if let Some(steps) = steps {
        assert!(
            steps >= 2,
            "discretization needs at least 2 steps, got {}",
            steps
        );
    }
}

/// Linear blend `t * a + (1 - t) * b`, exact when `a == b`.
#[inline]
pub fn blend(a: f64, b: f64, t: f64) -> f64 {
    b + t * (a - b)
}
