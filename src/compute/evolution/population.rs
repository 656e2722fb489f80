//! Fixed-size population with elitist selection, blend crossover, single-gene
//! mutation and a nominal convergence test.
//!
//! The population never evaluates fitness itself. A driver assigns fitness to
//! every individual between generations, then calls [`Population::evolve`]
//! and [`Population::mutate`].

use log::{debug, warn};

use crate::schema::{PopulationConfig, SelectionMethod};

use super::EvolutionError;
use super::genome::{GeneRng, assert_discretization, blend, snap_to_lattice};
use super::individual::{Individual, MatingPair};
use super::niche;

/// Upper bound on re-draws when looking for a distinct mate or a fresh pair.
pub const MAX_SELECTION_ATTEMPTS: usize = 1000;

/// Largest representable gene value.
const MAX_GENE: f64 = 1.0 - f64::EPSILON / 2.0;

/// A generation of candidate solutions.
#[derive(Debug, Clone)]
pub struct Population {
    individuals: Vec<Individual>,
    saved_generation: Vec<Individual>,
    violations: Vec<bool>,
    survivor_count: usize,
    mutants: Vec<usize>,
    selection: SelectionMethod,
    convergence_threshold: f64,
    discretization: Option<usize>,
    rng: GeneRng,
}

impl Population {
    /// Create a population of random individuals.
    ///
    /// Panics when `discretization` is below 2 steps.
    pub fn new(
        size: usize,
        chromosome_length: usize,
        selection: SelectionMethod,
        convergence_threshold: f64,
        discretization: Option<usize>,
        mut rng: GeneRng,
    ) -> Self {
        assert_discretization(discretization);
        let individuals = (0..size)
            .map(|_| Individual::random(chromosome_length, discretization, &mut rng))
            .collect();
        Self::assemble(
            individuals,
            selection,
            convergence_threshold,
            discretization,
            rng,
        )
    }

    /// Create a population from configuration.
    pub fn from_config(config: &PopulationConfig, chromosome_length: usize, rng: GeneRng) -> Self {
        Self::new(
            config.size,
            chromosome_length,
            config.selection,
            config.convergence_threshold,
            config.discretization_steps,
            rng,
        )
    }

    /// Create a population around existing individuals.
    ///
    /// Panics when chromosome lengths differ.
    pub fn from_individuals(
        individuals: Vec<Individual>,
        selection: SelectionMethod,
        convergence_threshold: f64,
        rng: GeneRng,
    ) -> Self {
        if let Some(first) = individuals.first() {
            assert!(
                individuals.iter().all(|i| i.len() == first.len()),
                "chromosome length mismatch"
            );
        }
        Self::assemble(individuals, selection, convergence_threshold, None, rng)
    }

    fn assemble(
        individuals: Vec<Individual>,
        selection: SelectionMethod,
        convergence_threshold: f64,
        discretization: Option<usize>,
        rng: GeneRng,
    ) -> Self {
        let saved_generation = individuals.clone();
        let violations = vec![false; individuals.len()];
        Self {
            individuals,
            saved_generation,
            violations,
            survivor_count: 0,
            mutants: Vec::new(),
            selection,
            convergence_threshold,
            discretization,
            rng,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Genes per individual.
    pub fn chromosome_length(&self) -> usize {
        self.individuals.first().map_or(0, Individual::len)
    }

    #[inline]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Mutable view for assigning fitness. The slice length is fixed.
    #[inline]
    pub fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    /// Survivors of the most recent selection, best first.
    #[inline]
    pub fn survivors(&self) -> &[Individual] {
        &self.individuals[..self.survivor_count]
    }

    /// Indices mutated by the most recent [`mutate`](Self::mutate).
    #[inline]
    pub fn mutants(&self) -> &[usize] {
        &self.mutants
    }

    #[inline]
    pub fn saved_generation(&self) -> &[Individual] {
        &self.saved_generation
    }

    #[inline]
    pub fn violations(&self) -> &[bool] {
        &self.violations
    }

    #[inline]
    pub fn selection(&self) -> SelectionMethod {
        self.selection
    }

    #[inline]
    pub fn convergence_threshold(&self) -> f64 {
        self.convergence_threshold
    }

    /// Best evaluated individual, if any.
    pub fn fittest(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .filter(|i| i.is_evaluated())
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
    }

    // ------------------------------------------------------------------
    // Constraint rollback
    // ------------------------------------------------------------------

    /// Snapshot every slot's genes and fitness.
    pub fn save_genes(&mut self) {
        for (saved, current) in self.saved_generation.iter_mut().zip(&self.individuals) {
            saved.copy_genes(current);
        }
    }

    /// Flag slot `index` for rollback. Panics when out of range.
    pub fn set_violation(&mut self, index: usize, violated: bool) {
        self.violations[index] = violated;
    }

    pub fn clear_violations(&mut self) {
        self.violations.fill(false);
    }

    /// Roll flagged slots back to the last snapshot and clear their flags.
    /// Returns the number of restored slots.
    pub fn restore_genes(&mut self) -> usize {
        let mut restored = 0;
        for ((current, saved), flag) in self
            .individuals
            .iter_mut()
            .zip(&self.saved_generation)
            .zip(self.violations.iter_mut())
        {
            if *flag {
                current.copy_genes(saved);
                *flag = false;
                restored += 1;
            }
        }
        if restored > 0 {
            debug!("Restored {} constraint-violating individuals", restored);
        }
        restored
    }

    // ------------------------------------------------------------------
    // Evolution
    // ------------------------------------------------------------------

    /// Survivor selection followed by crossover.
    pub fn evolve(
        &mut self,
        selection_rate: f64,
        crossover_rate: f64,
    ) -> Result<(), EvolutionError> {
        self.select_survivors(selection_rate);
        self.crossover(crossover_rate)
    }

    /// Sort by descending fitness and keep the top `floor(rate * size)`.
    ///
    /// Unevaluated individuals never survive.
    pub fn select_survivors(&mut self, selection_rate: f64) -> usize {
        self.individuals.sort_by(Individual::compare);

        let size = self.individuals.len();
        let evaluated = self
            .individuals
            .iter()
            .take_while(|i| i.is_evaluated())
            .count();
        let wanted = (selection_rate.max(0.0) * size as f64).floor() as usize;
        self.survivor_count = wanted.min(size).min(evaluated);

        debug!(
            "Selected {} survivors of {} ({} evaluated)",
            self.survivor_count, size, evaluated
        );
        self.survivor_count
    }

    /// Fill every slot past the survivors with blend-crossover offspring.
    ///
    /// Offspring of a discretized population are snapped to the nearest
    /// lattice level. A no-op with fewer than two survivors.
    pub fn crossover(&mut self, crossover_rate: f64) -> Result<(), EvolutionError> {
        let survivors = self.survivor_count;
        if survivors < 2 {
            debug!("Skipping crossover with {} survivors", survivors);
            return Ok(());
        }

        let new_born = self.individuals.len() - survivors;
        let matings = new_born.div_ceil(2);
        let pairs = self.select_mating_pairs(matings)?;

        let length = self.chromosome_length();
        let discretization = self.discretization;
        let settle = |value: f64| match discretization {
            Some(steps) => snap_to_lattice(value, steps),
            None => value.min(MAX_GENE),
        };
        let rng = &mut self.rng;
        let (parents, children) = self.individuals.split_at_mut(survivors);
        let mut slots = children.iter_mut();

        for pair in &pairs {
            let dad = &parents[pair.dad()];
            let mom = &parents[pair.mom()];
            let beta = rng.unit();

            let mut first = slots.next();
            let mut second = slots.next();

            for i in 0..length {
                let (d, m) = (dad.gene(i), mom.gene(i));
                let dad_weighted = settle(blend(d, m, beta));
                let mom_weighted = settle(blend(m, d, beta));
                let (a, b) = if rng.chance(crossover_rate) {
                    (dad_weighted, mom_weighted)
                } else {
                    (mom_weighted, dad_weighted)
                };
                if let Some(child) = first.as_deref_mut() {
                    child.genes_mut()[i] = a;
                }
                if let Some(child) = second.as_deref_mut() {
                    child.genes_mut()[i] = b;
                }
            }

            for child in [first, second].into_iter().flatten() {
                child.invalidate();
            }
        }

        debug!(
            "Crossover produced {} offspring from {} matings",
            new_born,
            pairs.len()
        );
        Ok(())
    }

    /// Draw `matings` pairs, re-drawing duplicates while fresh pairs remain.
    fn select_mating_pairs(&mut self, matings: usize) -> Result<Vec<MatingPair>, EvolutionError> {
        let survivors = &self.individuals[..self.survivor_count];
        let distinct = reachable_pairs(survivors, self.selection);
        let mut pairs: Vec<MatingPair> = Vec::with_capacity(matings);

        for _ in 0..matings {
            let mut pair = select_pair(survivors, self.selection, &mut self.rng)?;
            if pairs.len() < distinct {
                let mut attempts = 1;
                while pairs.contains(&pair) {
                    if attempts >= MAX_SELECTION_ATTEMPTS {
                        warn!(
                            "Accepting duplicate mating pair ({}, {}) after {} draws",
                            pair.dad(),
                            pair.mom(),
                            attempts
                        );
                        break;
                    }
                    pair = select_pair(survivors, self.selection, &mut self.rng)?;
                    attempts += 1;
                }
            }
            pairs.push(pair);
        }
        Ok(pairs)
    }

    /// Re-draw one gene in `m = max(1, floor(rate * (size - 1)))` distinct
    /// individuals from `[1, size - 2]`. A no-op when the rate is zero.
    pub fn mutate(&mut self, mutation_rate: f64) {
        self.mutants.clear();
        if mutation_rate <= f64::EPSILON {
            return;
        }

        let size = self.individuals.len();
        if size < 3 {
            return;
        }
        let eligible = size - 2;
        let count = ((mutation_rate * (size - 1) as f64).floor() as usize)
            .max(1)
            .min(eligible);

        for offset in self.rng.distinct_indices(eligible, count) {
            let index = offset + 1;
            let individual = &mut self.individuals[index];
            individual.mutate_gene(self.discretization, &mut self.rng);
            individual.invalidate();
            self.mutants.push(index);
        }

        debug!("Mutated {} individuals: {:?}", count, self.mutants);
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Whether the top survivors agree on every gene within the relative
    /// convergence threshold.
    pub fn is_nominally_converged(&self) -> bool {
        if self.survivor_count < 2 {
            return true;
        }

        let checked = (self.survivor_count / 2).max(2);
        let top = &self.individuals[..checked];

        for gene in 0..self.chromosome_length() {
            let (min, max) = top.iter().map(|i| i.gene(gene)).fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), g| (lo.min(g), hi.max(g)),
            );
            // Exact agreement, including an all-zero gene.
            if min == max {
                continue;
            }

            let mean = top.iter().map(|i| i.gene(gene)).sum::<f64>() / checked as f64;
            let diverged = top
                .iter()
                .any(|i| (i.gene(gene) / mean - 1.0).abs() > self.convergence_threshold);
            if diverged {
                return false;
            }
        }
        true
    }

    /// Crowding of `individual` within radius `sigma` across the population.
    pub fn niche_count(&self, individual: &Individual, sigma: f64) -> f64 {
        niche::niche_count(&self.individuals, individual, sigma)
    }

    /// Fitness of `individual` discounted by its niche count.
    pub fn shared_fitness(&self, individual: &Individual, sigma: f64) -> f64 {
        niche::shared_fitness(&self.individuals, individual, sigma)
    }

    /// Mean pairwise gene distance.
    pub fn diversity(&self) -> f64 {
        niche::mean_pairwise_distance(&self.individuals)
    }
}

/// Choose a mating pair among `survivors` (sorted best first).
pub fn select_pair(
    survivors: &[Individual],
    method: SelectionMethod,
    rng: &mut GeneRng,
) -> Result<MatingPair, EvolutionError> {
    if survivors.len() < 2 {
        return Err(EvolutionError::TooFewSurvivors {
            survivors: survivors.len(),
        });
    }

    match method {
        SelectionMethod::Tournament => {
            // The weakest survivor only competes when there is no one else.
            let pool = if survivors.len() > 2 {
                survivors.len() - 1
            } else {
                survivors.len()
            };
            let dad = tournament(survivors, pool, None, rng);
            let mom = tournament(survivors, pool, Some(dad), rng);
            Ok(MatingPair::new(dad, mom))
        }
        SelectionMethod::RouletteWheel => {
            let wheel = RouletteWheel::new(survivors);
            let dad = wheel.spin(rng);
            for _ in 0..MAX_SELECTION_ATTEMPTS {
                let mom = wheel.spin(rng);
                if mom != dad {
                    return Ok(MatingPair::new(dad, mom));
                }
            }
            Err(EvolutionError::SelectionExhausted {
                attempts: MAX_SELECTION_ATTEMPTS,
            })
        }
    }
}

/// Number of distinct pairs `method` can ever draw from `survivors`.
fn reachable_pairs(survivors: &[Individual], method: SelectionMethod) -> usize {
    let candidates = match method {
        SelectionMethod::Tournament if survivors.len() > 2 => survivors.len() - 1,
        SelectionMethod::Tournament => survivors.len(),
        SelectionMethod::RouletteWheel => RouletteWheel::new(survivors).reachable(),
    };
    candidates * candidates.saturating_sub(1) / 2
}

/// Winner of a two-contestant tournament over `survivors[..pool]`, skipping
/// `exclude`.
fn tournament(
    survivors: &[Individual],
    pool: usize,
    exclude: Option<usize>,
    rng: &mut GeneRng,
) -> usize {
    let candidates = pool - usize::from(exclude.is_some_and(|e| e < pool));
    let resolve = |k: usize| match exclude {
        Some(e) if k >= e => k + 1,
        _ => k,
    };

    if candidates == 1 {
        return resolve(0);
    }

    let a = rng.index(0..candidates);
    let mut b = rng.index(0..candidates - 1);
    if b >= a {
        b += 1;
    }
    let (a, b) = (resolve(a), resolve(b));

    if survivors[b].fitness() > survivors[a].fitness() {
        b
    } else {
        a
    }
}

/// Fitness-proportionate wheel over survivor fitness shifted by the minimum.
struct RouletteWheel {
    weights: Vec<f64>,
    total: f64,
}

impl RouletteWheel {
    fn new(survivors: &[Individual]) -> Self {
        let lowest = survivors
            .iter()
            .map(Individual::fitness)
            .fold(f64::INFINITY, f64::min);
        let weights: Vec<f64> = survivors.iter().map(|s| s.fitness() - lowest).collect();
        let total = weights.iter().sum();
        Self { weights, total }
    }

    /// Weighted spins need a positive, finite total; otherwise spins are uniform.
    fn is_weighted(&self) -> bool {
        self.total.is_finite() && self.total > 0.0
    }

    /// Survivors a spin can land on.
    fn reachable(&self) -> usize {
        if self.is_weighted() {
            self.weights.iter().filter(|&&w| w > 0.0).count()
        } else {
            self.weights.len()
        }
    }

    fn spin(&self, rng: &mut GeneRng) -> usize {
        if !self.is_weighted() {
            return rng.index(0..self.weights.len());
        }

        let target = rng.unit() * self.total;
        let mut cumulative = 0.0;
        let mut last_weighted = 0;
        for (i, &w) in self.weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            cumulative += w;
            last_weighted = i;
            if cumulative > target {
                return i;
            }
        }
        last_weighted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn uniform_population(
        size: usize,
        gene: f64,
        fitness: f64,
        selection: SelectionMethod,
    ) -> Population {
        let individuals = (0..size)
            .map(|_| {
                let mut ind = Individual::from_genes(vec![gene]);
                ind.set_fitness(fitness);
                ind
            })
            .collect();
        Population::from_individuals(individuals, selection, 0.01, GeneRng::new(7))
    }

    fn evaluated_population(size: usize, length: usize, seed: u64) -> Population {
        let mut pop = Population::new(
            size,
            length,
            SelectionMethod::Tournament,
            0.01,
            None,
            GeneRng::new(seed),
        );
        for (i, ind) in pop.individuals_mut().iter_mut().enumerate() {
            // Fitness in slot order is deliberately unsorted.
            ind.set_fitness(((i * 7) % size) as f64);
        }
        pop
    }

    #[test]
    fn test_population_creation() {
        let pop = Population::new(
            12,
            3,
            SelectionMethod::RouletteWheel,
            0.05,
            None,
            GeneRng::new(1),
        );
        assert_eq!(pop.len(), 12);
        assert_eq!(pop.chromosome_length(), 3);
        assert_eq!(pop.saved_generation().len(), 12);
        assert_eq!(pop.violations().len(), 12);
        assert!(pop.fittest().is_none());
    }

    #[test]
    fn test_survivor_count() {
        let mut pop = evaluated_population(20, 2, 3);
        assert_eq!(pop.select_survivors(0.5), 10);
        assert_eq!(pop.survivors().len(), 10);
    }

    #[test]
    fn test_sort_invariant() {
        let mut pop = evaluated_population(20, 2, 3);
        pop.individuals_mut()[4].invalidate();
        pop.select_survivors(0.5);

        let best = pop.individuals()[0].fitness();
        assert!(
            pop.individuals()
                .iter()
                .filter(|i| i.is_evaluated())
                .all(|i| i.fitness() <= best)
        );
        assert!(!pop.individuals()[19].is_evaluated());
    }

    #[test]
    fn test_unevaluated_never_survive() {
        let mut pop = evaluated_population(10, 1, 5);
        for ind in &mut pop.individuals_mut()[3..] {
            ind.invalidate();
        }
        assert_eq!(pop.select_survivors(0.5), 3);
        assert!(pop.survivors().iter().all(Individual::is_evaluated));
    }

    #[test]
    fn test_crossover_fills_new_born_slots() {
        let mut pop = evaluated_population(20, 4, 11);
        pop.select_survivors(0.5);
        let elite: Vec<Individual> = pop.individuals()[..10].to_vec();

        pop.crossover(0.8).unwrap();

        assert_eq!(pop.len(), 20);
        assert_eq!(&pop.individuals()[..10], elite.as_slice());
        assert!(pop.individuals()[10..].iter().all(|i| !i.is_evaluated()));
    }

    #[test]
    fn test_crossover_odd_new_born() {
        let mut pop = evaluated_population(10, 2, 13);
        pop.select_survivors(0.5);
        assert_eq!(pop.survivors().len(), 5);
        pop.crossover(0.5).unwrap();
        assert_eq!(pop.len(), 10);
        assert!(pop.individuals()[5..].iter().all(|i| !i.is_evaluated()));
    }

    #[test]
    fn test_crossover_single_survivor_is_noop() {
        let mut pop = evaluated_population(10, 2, 17);
        pop.select_survivors(0.1);
        let before = pop.individuals().to_vec();
        pop.crossover(0.8).unwrap();
        assert_eq!(pop.individuals(), before.as_slice());
    }

    #[test]
    fn test_tournament_requires_two_survivors() {
        let survivors = vec![Individual::from_genes(vec![0.5])];
        let result = select_pair(&survivors, SelectionMethod::Tournament, &mut GeneRng::new(1));
        assert!(matches!(
            result,
            Err(EvolutionError::TooFewSurvivors { survivors: 1 })
        ));
    }

    #[test]
    fn test_tournament_two_survivors() {
        let pop = uniform_population(2, 0.5, 1.0, SelectionMethod::Tournament);
        let mut rng = GeneRng::new(3);
        for _ in 0..50 {
            let pair =
                select_pair(pop.individuals(), SelectionMethod::Tournament, &mut rng).unwrap();
            assert_ne!(pair.dad(), pair.mom());
        }
    }

    #[test]
    fn test_tournament_excludes_weakest() {
        let mut pop = evaluated_population(10, 1, 19);
        pop.select_survivors(0.5);
        let mut rng = GeneRng::new(5);
        for _ in 0..200 {
            let pair = select_pair(pop.survivors(), SelectionMethod::Tournament, &mut rng).unwrap();
            assert!(pair.dad() < 4 && pair.mom() < 4);
        }
    }

    #[test]
    fn test_roulette_never_picks_lowest() {
        let mut pop = evaluated_population(10, 1, 23);
        pop.select_survivors(0.5);
        let mut rng = GeneRng::new(8);
        for _ in 0..200 {
            let pair =
                select_pair(pop.survivors(), SelectionMethod::RouletteWheel, &mut rng).unwrap();
            assert_ne!(pair.dad(), pair.mom());
            assert!(pair.dad() < 4 && pair.mom() < 4);
        }
    }

    #[test]
    fn test_roulette_equal_fitness_uses_uniform_spin() {
        let mut pop = uniform_population(10, 0.5, 2.0, SelectionMethod::RouletteWheel);
        pop.evolve(0.5, 0.8).unwrap();
        assert_eq!(pop.len(), 10);
    }

    #[test]
    fn test_roulette_single_weighted_survivor_fails_loudly() {
        let mut pop = evaluated_population(4, 1, 29);
        pop.selection = SelectionMethod::RouletteWheel;
        pop.select_survivors(0.5);
        let result = pop.crossover(0.5);
        assert!(matches!(
            result,
            Err(EvolutionError::SelectionExhausted { .. })
        ));
    }

    #[test]
    fn test_mutation_zero_rate_is_noop() {
        let mut pop = evaluated_population(10, 3, 31);
        let before = pop.individuals().to_vec();
        pop.mutate(0.0);
        assert!(pop.mutants().is_empty());
        assert_eq!(pop.individuals(), before.as_slice());
    }

    #[test]
    fn test_mutation_count_and_range() {
        let mut pop = evaluated_population(20, 3, 37);
        pop.mutate(0.5);
        // floor(0.5 * 19) = 9
        assert_eq!(pop.mutants().len(), 9);
        assert!(pop.mutants().iter().all(|&i| (1..=18).contains(&i)));

        pop.mutate(0.01);
        assert_eq!(pop.mutants().len(), 1);

        pop.mutate(1.0);
        assert_eq!(pop.mutants().len(), 18);
    }

    #[test]
    fn test_mutation_preserves_elite() {
        let mut pop = evaluated_population(10, 3, 41);
        pop.select_survivors(0.5);
        let best = pop.individuals()[0].clone();
        for _ in 0..50 {
            pop.mutate(1.0);
            assert_eq!(pop.individuals()[0], best);
        }
    }

    fn assert_on_lattice(pop: &Population, steps: usize) {
        for ind in pop.individuals() {
            for &g in ind.genes() {
                let level = g * steps as f64;
                assert!((level - level.round()).abs() < 1e-12, "gene {} off lattice", g);
                assert!(g < 1.0);
            }
        }
    }

    #[test]
    fn test_discretized_generations_stay_on_lattice() {
        for steps in [2, 4, 8, 360] {
            let mut pop = Population::new(
                10,
                2,
                SelectionMethod::Tournament,
                0.01,
                Some(steps),
                GeneRng::new(43),
            );
            for _ in 0..10 {
                for (i, ind) in pop.individuals_mut().iter_mut().enumerate() {
                    let fitness = ind.gene(0) + i as f64 * 1e-3;
                    ind.set_fitness(fitness);
                }
                pop.evolve(0.5, 0.8).unwrap();
                assert_on_lattice(&pop, steps);
                pop.mutate(1.0);
                assert_on_lattice(&pop, steps);
            }
        }
    }

    #[test]
    #[should_panic(expected = "at least 2 steps")]
    fn test_single_step_lattice_rejected() {
        Population::new(
            10,
            1,
            SelectionMethod::Tournament,
            0.01,
            Some(1),
            GeneRng::new(1),
        );
    }

    #[test]
    fn test_reachable_pairs() {
        let mut pop = evaluated_population(10, 1, 79);
        pop.select_survivors(0.3);
        assert_eq!(pop.survivors().len(), 3);
        assert_eq!(reachable_pairs(pop.survivors(), SelectionMethod::Tournament), 1);
        assert_eq!(reachable_pairs(pop.survivors(), SelectionMethod::RouletteWheel), 1);

        pop.select_survivors(0.5);
        assert_eq!(reachable_pairs(pop.survivors(), SelectionMethod::Tournament), 6);
        assert_eq!(reachable_pairs(pop.survivors(), SelectionMethod::RouletteWheel), 6);

        // Tied fitness spins uniformly over every survivor.
        let tied = uniform_population(4, 0.5, 1.0, SelectionMethod::RouletteWheel);
        assert_eq!(reachable_pairs(tied.individuals(), SelectionMethod::RouletteWheel), 6);
        assert_eq!(reachable_pairs(tied.individuals(), SelectionMethod::Tournament), 3);
    }

    #[test]
    fn test_three_survivors_draw_once_per_mating() {
        let mut pop = evaluated_population(10, 1, 83);
        pop.select_survivors(0.3);
        assert_eq!(pop.survivors().len(), 3);

        let mut expected = pop.rng.clone();
        for _ in 0..4 {
            select_pair(pop.survivors(), SelectionMethod::Tournament, &mut expected).unwrap();
        }

        let pairs = pop.select_mating_pairs(4).unwrap();
        assert_eq!(pairs.len(), 4);
        assert!(pairs.iter().all(|p| *p == MatingPair::new(0, 1)));
        // No duplicate re-draws were spent.
        assert_eq!(pop.rng.unit(), expected.unit());
    }

    #[test]
    fn test_convergence_trivial_without_survivors() {
        let pop = evaluated_population(10, 2, 47);
        assert!(pop.is_nominally_converged());
    }

    #[test]
    fn test_convergence_detects_spread() {
        let mut pop = evaluated_population(10, 1, 53);
        for (i, ind) in pop.individuals_mut().iter_mut().enumerate() {
            ind.set_gene(0, 0.1 + 0.05 * i as f64);
        }
        pop.select_survivors(0.5);
        assert!(!pop.is_nominally_converged());
    }

    #[test]
    fn test_convergence_within_tolerance() {
        let mut pop = evaluated_population(10, 1, 59);
        for (i, ind) in pop.individuals_mut().iter_mut().enumerate() {
            ind.set_gene(0, 0.5 + 0.0001 * i as f64);
        }
        pop.select_survivors(0.5);
        assert!(pop.is_nominally_converged());
    }

    #[test]
    fn test_save_and_restore() {
        let mut pop = evaluated_population(10, 2, 61);
        pop.save_genes();
        let snapshot = pop.individuals().to_vec();

        pop.mutate(1.0);
        let mutated = pop.mutants()[0];
        pop.set_violation(mutated, true);

        assert_eq!(pop.restore_genes(), 1);
        assert_eq!(pop.individuals()[mutated], snapshot[mutated]);
        assert!(pop.violations().iter().all(|v| !v));
    }

    #[test]
    fn test_clear_violations() {
        let mut pop = evaluated_population(10, 1, 67);
        pop.set_violation(2, true);
        pop.set_violation(5, true);
        pop.clear_violations();
        assert_eq!(pop.restore_genes(), 0);
    }

    #[test]
    fn test_fittest_skips_unevaluated() {
        let mut pop = evaluated_population(10, 1, 71);
        let top = pop
            .individuals()
            .iter()
            .map(Individual::fitness)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(pop.fittest().unwrap().fitness(), top);

        for ind in pop.individuals_mut() {
            ind.invalidate();
        }
        assert!(pop.fittest().is_none());
    }

    #[test]
    fn test_niche_count_and_diversity() {
        let pop = uniform_population(10, 0.5, 1.0, SelectionMethod::Tournament);
        let probe = Individual::from_genes(vec![0.5]);
        assert!((pop.niche_count(&probe, 0.1) - 10.0).abs() < 1e-12);
        assert!((pop.shared_fitness(&pop.individuals()[0], 0.1) - 0.1).abs() < 1e-12);
        assert_eq!(pop.diversity(), 0.0);
    }

    #[test]
    fn test_uniform_population_scenario() {
        let mut pop = uniform_population(10, 0.5, 1.0, SelectionMethod::Tournament);
        pop.evolve(0.5, 0.8).unwrap();
        assert_eq!(pop.len(), 10);
        assert!(pop.is_nominally_converged());

        pop.mutate(0.1);
        assert_eq!(pop.len(), 10);
        assert_eq!(pop.mutants().len(), 1);
        let mutant = pop.mutants()[0];
        assert_ne!(pop.individuals()[mutant].gene(0), 0.5);
    }

    proptest! {
        #[test]
        fn prop_offspring_within_parent_range(seed in any::<u64>(), rate in 0.0f64..=1.0) {
            let mut pop = evaluated_population(20, 3, seed);
            pop.select_survivors(0.5);
            let parents = pop.survivors().to_vec();
            // Same RNG state, so the same pairs crossover is about to draw.
            let pairs = pop.clone().select_mating_pairs(5).unwrap();
            pop.crossover(rate).unwrap();

            for (k, pair) in pairs.iter().enumerate() {
                let (dad, mom) = (&parents[pair.dad()], &parents[pair.mom()]);
                let first = &pop.individuals()[10 + 2 * k];
                let second = &pop.individuals()[11 + 2 * k];
                for g in 0..3 {
                    let lo = dad.gene(g).min(mom.gene(g));
                    let hi = dad.gene(g).max(mom.gene(g));
                    for child in [first, second] {
                        prop_assert!(child.gene(g) >= lo - 1e-12 && child.gene(g) <= hi + 1e-12);
                    }
                    // Both blends of one mating share a weight, so they mirror each other.
                    let sum = first.gene(g) + second.gene(g);
                    prop_assert!((sum - (dad.gene(g) + mom.gene(g))).abs() < 1e-12);
                }
            }
        }

        #[test]
        fn prop_mutants_change_one_gene(seed in any::<u64>(), rate in 0.01f64..=1.0) {
            let mut pop = evaluated_population(15, 4, seed);
            let before = pop.individuals().to_vec();
            pop.mutate(rate);

            for (i, (old, new)) in before.iter().zip(pop.individuals()).enumerate() {
                let changed = old.genes().iter().zip(new.genes()).filter(|(a, b)| a != b).count();
                let expected = usize::from(pop.mutants().contains(&i));
                prop_assert_eq!(changed, expected);
            }
            prop_assert_eq!(&pop.individuals()[0], &before[0]);
        }

        #[test]
        fn prop_identical_survivors_converge(
            genes in prop::collection::vec(0.0f64..1.0, 1..6),
            threshold in 0.0f64..0.1,
        ) {
            let individuals = (0..10)
                .map(|i| {
                    let mut ind = Individual::from_genes(genes.clone());
                    ind.set_fitness(i as f64);
                    ind
                })
                .collect();
            let mut pop = Population::from_individuals(
                individuals,
                SelectionMethod::Tournament,
                threshold,
                GeneRng::new(0),
            );
            pop.select_survivors(0.5);
            prop_assert!(pop.is_nominally_converged());
        }
    }
}
