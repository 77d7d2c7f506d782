use crate::city::City;
use crate::distance_cache::DistanceCache;
use crate::error::{Error, Result};
use crate::genetic_algorithm::{Chromosome, EvolutionResult, Evaluator, Optimizer, Termination};
use crate::local_search::{self, TwoOptConfig};
use crate::population::Population;
use crate::tour::Tour;
use crate::worker_pool::WorkerPool;
use rand::prelude::*;
use rand::thread_rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const PROGRESS_INTERVAL: usize = 100;

#[derive(Clone, Debug)]
pub struct TspConfig {
    pub population_size: usize,
    pub generations: usize,
    pub mutation_rate: f64,
    pub elitism_size: usize,
    pub tournament_size: usize,
    pub heuristic_seeds: usize,
    pub local_search_threshold: usize,
    pub improvement_threshold: f64,
    pub reproduction_timeout: Duration,
    pub two_opt: TwoOptConfig,
}

impl Default for TspConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 1_000,
            mutation_rate: 0.05,
            elitism_size: 20,
            tournament_size: 5,
            heuristic_seeds: 20,
            local_search_threshold: 1_000,
            improvement_threshold: 0.0001,
            reproduction_timeout: Duration::from_secs(30),
            two_opt: TwoOptConfig::default(),
        }
    }
}

impl TspConfig {
    pub fn new(population_size: usize, generations: usize, mutation_rate: f64) -> Self {
        Self {
            population_size,
            generations,
            mutation_rate,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(Error::EmptyPopulation);
        }
        if self.generations == 0 {
            return Err(Error::NoGenerations);
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(Error::MutationRate(self.mutation_rate));
        }
        Ok(())
    }

    /// Elites carried over per generation, never more than the population.
    pub fn effective_elitism(&self) -> usize {
        self.elitism_size.min(self.population_size)
    }

    /// Nearest-neighbour tours placed in the initial population.
    pub fn heuristic_seed_count(&self) -> usize {
        self.heuristic_seeds.min(self.population_size / 5)
    }

    pub fn max_stagnant_generations(&self) -> usize {
        self.generations / 10
    }
}

/// Tracks the best tour ever seen and stops the run once the budget is spent
/// or the best length stops improving by a meaningful fraction.
#[derive(Debug)]
pub struct StagnationEvaluator {
    cache: Arc<DistanceCache>,
    best: Tour,
    best_length: f64,
    last_length: f64,
    stagnant: usize,
    max_stagnant: usize,
    generations: usize,
    improvement_threshold: f64,
}

impl StagnationEvaluator {
    pub fn new(config: &TspConfig, cache: Arc<DistanceCache>, initial_best: Tour) -> Self {
        let best_length = initial_best.length(&cache);
        Self {
            cache,
            best: initial_best,
            best_length,
            last_length: f64::MAX,
            stagnant: 0,
            max_stagnant: config.max_stagnant_generations(),
            generations: config.generations,
            improvement_threshold: config.improvement_threshold,
        }
    }

    pub fn best_length(&self) -> f64 {
        self.best_length
    }

    pub fn stagnant_generations(&self) -> usize {
        self.stagnant
    }
}

impl Evaluator<Tour> for StagnationEvaluator {
    fn check(&mut self, fittest: &Tour, generation: usize) -> Option<Termination> {
        let length = fittest.cost(&self.cache);

        if length < self.best_length {
            self.best = fittest.clone();
            self.best_length = length;
            self.stagnant = 0;
        } else {
            // A zero previous best means every tour is already degenerate.
            let improvement = if self.last_length > 0.0 {
                (self.last_length - length) / self.last_length
            } else {
                0.0
            };

            if improvement < self.improvement_threshold {
                self.stagnant += 1;
            } else {
                self.stagnant = 0;
            }
        }

        self.last_length = length;

        if generation % PROGRESS_INTERVAL == 0 || generation + 1 == self.generations {
            info!(
                generation,
                generations = self.generations,
                best_length = self.best_length,
                "Generation progress"
            );
        }

        if self.stagnant > self.max_stagnant {
            info!(
                generation,
                stagnant_generations = self.stagnant,
                "No meaningful improvement, stopping early"
            );
            return Some(Termination::Stagnation {
                stagnant_generations: self.stagnant,
            });
        }

        if generation + 1 >= self.generations {
            return Some(Termination::BudgetExhausted);
        }

        None
    }

    fn best(&self) -> &Tour {
        &self.best
    }
}

/// Draws `size` chromosomes with replacement and returns the cheapest one.
pub fn tournament_select<'a, C, R>(
    population: &'a [C],
    size: usize,
    cache: &DistanceCache,
    rng: &mut R,
) -> Option<&'a C>
where
    C: Chromosome,
    R: Rng + ?Sized,
{
    if population.is_empty() {
        return None;
    }

    let mut best = &population[rng.gen_range(0..population.len())];
    for _ in 1..size {
        let contender = &population[rng.gen_range(0..population.len())];
        if contender.cost(cache) < best.cost(cache) {
            best = contender;
        }
    }

    Some(best)
}

/// Greedy tour from `start`: always move to the closest unvisited city,
/// taking the first one found on ties.
pub fn nearest_neighbor_tour(cities: &[City], start: usize, cache: &DistanceCache) -> Tour {
    let mut visited = vec![false; cities.len()];
    let mut order = Vec::with_capacity(cities.len());
    if cities.is_empty() {
        return Tour::from_order(order);
    }

    let mut current = start;
    visited[current] = true;
    order.push(cities[current]);

    for _ in 1..cities.len() {
        let mut next = None;
        let mut min_distance = f64::MAX;
        for (index, city) in cities.iter().enumerate() {
            if visited[index] {
                continue;
            }
            let distance = cities[current].distance_to(city, cache);
            if distance < min_distance {
                min_distance = distance;
                next = Some(index);
            }
        }

        // Only reachable with NaN coordinates.
        let Some(next) = next.or_else(|| visited.iter().position(|&seen| !seen)) else {
            break;
        };
        visited[next] = true;
        order.push(cities[next]);
        current = next;
    }

    Tour::from_order(order)
}

/// Replaces the first `count` tours with nearest-neighbour constructions from
/// random starting cities.
pub fn seed_with_nearest_neighbor<R: Rng + ?Sized>(
    population: &mut Population,
    cities: &[City],
    count: usize,
    cache: &DistanceCache,
    rng: &mut R,
) {
    if cities.is_empty() {
        return;
    }

    for tour in population.tours_mut().iter_mut().take(count) {
        let start = rng.gen_range(0..cities.len());
        *tour = nearest_neighbor_tour(cities, start, cache);
    }
}

// Per-offspring parameters, copied into every reproduction task.
#[derive(Clone, Copy, Debug)]
struct Breeding {
    tournament_size: usize,
    mutation_rate: f64,
    local_search_threshold: usize,
    two_opt: TwoOptConfig,
}

impl From<&TspConfig> for Breeding {
    fn from(config: &TspConfig) -> Self {
        Self {
            tournament_size: config.tournament_size,
            mutation_rate: config.mutation_rate,
            local_search_threshold: config.local_search_threshold,
            two_opt: config.two_opt,
        }
    }
}

impl Breeding {
    fn offspring<R: Rng + ?Sized>(
        &self,
        parents: &[Tour],
        cache: &DistanceCache,
        rng: &mut R,
    ) -> Option<Tour> {
        let parent_1 = tournament_select(parents, self.tournament_size, cache, rng)?;
        let parent_2 = tournament_select(parents, self.tournament_size, cache, rng)?;

        let mut child = Tour::crossover(parent_1, parent_2, rng);
        if rng.gen_bool(self.mutation_rate) {
            child.mutate(rng);
        }

        if child.len() > self.local_search_threshold {
            local_search::refine(&mut child, &self.two_opt, cache, rng);
        }

        child.length(cache);
        Some(child)
    }
}

/// Generational GA over tours: elitism, tournament selection, order
/// crossover, mutation and 2-opt refinement of large children, with the
/// offspring of each generation produced in parallel.
#[derive(Debug)]
pub struct GeneticOptimizer {
    config: TspConfig,
    cache: Arc<DistanceCache>,
    pool: WorkerPool,
}

impl GeneticOptimizer {
    pub fn new(config: TspConfig, cache: Arc<DistanceCache>) -> Result<Self> {
        Self::with_pool(config, cache, WorkerPool::with_available_parallelism()?)
    }

    pub fn with_pool(config: TspConfig, cache: Arc<DistanceCache>, pool: WorkerPool) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cache,
            pool,
        })
    }

    pub fn config(&self) -> &TspConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<DistanceCache> {
        &self.cache
    }

    /// Random tours, a few of them replaced by nearest-neighbour tours.
    pub fn initial_population<R: Rng + ?Sized>(&self, cities: &[City], rng: &mut R) -> Population {
        let mut population = Population::new(cities, self.config.population_size, rng);
        seed_with_nearest_neighbor(
            &mut population,
            cities,
            self.config.heuristic_seed_count(),
            &self.cache,
            rng,
        );
        population
    }

    /// Runs the whole search over `cities` and returns the best tour found.
    #[instrument(level = "debug", skip_all, fields(cities = cities.len()))]
    pub fn evolve(&mut self, cities: &[City]) -> Result<EvolutionResult<Tour>> {
        if cities.is_empty() {
            return Err(Error::NoCities);
        }

        let population = self.initial_population(cities, &mut thread_rng());
        self.pool.install(|| population.evaluate(&self.cache));
        let initial_best = population
            .fittest(&self.cache)
            .cloned()
            .ok_or(Error::EmptyPopulation)?;

        let mut evaluator =
            StagnationEvaluator::new(&self.config, Arc::clone(&self.cache), initial_best);
        self.optimize(population.into_tours(), &mut evaluator)
    }

    // Builds the generation after `population`: elites first, then one
    // offspring per remaining slot.
    fn next_generation(&self, mut population: Population) -> Population {
        self.pool.install(|| population.sort_by_length(&self.cache));
        let tours = population.into_tours();
        let elitism = self.config.effective_elitism().min(tours.len());

        let mut next: Vec<Tour> = tours[..elitism].to_vec();
        let needed = tours.len() - elitism;
        if needed == 0 {
            return Population::from_tours(next);
        }

        let parents = Arc::new(tours);
        let cache = Arc::clone(&self.cache);
        let breeding = Breeding::from(&self.config);
        let snapshot = Arc::clone(&parents);

        let batch = self
            .pool
            .run_batch(needed, self.config.reproduction_timeout, move |_slot| {
                breeding.offspring(&snapshot, &cache, &mut thread_rng())
            });

        next.extend(batch.into_outputs().into_iter().flatten());

        let missing = elitism + needed - next.len();
        if missing > 0 {
            warn!(
                missing,
                timeout = ?self.config.reproduction_timeout,
                "Offspring not ready in time, refilling from previous generation"
            );
            next.extend(parents[elitism..].iter().cycle().take(missing).cloned());
        }

        Population::from_tours(next)
    }

    pub fn shutdown(self, timeout: Duration) -> bool {
        self.pool.shutdown(timeout)
    }
}

impl Optimizer<Tour> for GeneticOptimizer {
    fn optimize(
        &mut self,
        population: Vec<Tour>,
        eval: &mut dyn Evaluator<Tour>,
    ) -> Result<EvolutionResult<Tour>> {
        if population.is_empty() {
            return Err(Error::EmptyPopulation);
        }

        let mut population = Population::from_tours(population);
        let mut generations_run = 0;
        let mut termination = Termination::BudgetExhausted;

        for generation in 0..self.config.generations {
            population = self.next_generation(population);
            self.pool.install(|| population.evaluate(&self.cache));
            generations_run = generation + 1;

            let Some(fittest) = population.fittest(&self.cache) else {
                break;
            };
            debug!(generation, fittest = fittest.length(&self.cache), "Generation done");

            if let Some(reason) = eval.check(fittest, generation) {
                termination = reason;
                break;
            }
        }

        let best = eval.best().clone();
        let best_length = best.length(&self.cache);
        Ok(EvolutionResult {
            best,
            best_length,
            generations_run,
            termination,
        })
    }
}

/// Evolves a tour over raw coordinates; ids are the input positions.
pub fn solve(
    points: &[(f64, f64)],
    population_size: usize,
    generations: usize,
    mutation_rate: f64,
) -> Result<EvolutionResult<Tour>> {
    let cities = City::from_points(points);
    let config = TspConfig::new(population_size, generations, mutation_rate);
    let mut optimizer = GeneticOptimizer::new(config, Arc::new(DistanceCache::default()))?;
    optimizer.evolve(&cities)
}
