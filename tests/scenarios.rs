use genetic_tsp::{
    solve, City, DistanceCache, Evaluator, GeneticOptimizer, Optimizer, Population, Termination,
    Tour, TspConfig, WorkerPool,
};
use rand::prelude::*;
use std::sync::Arc;

fn assert_permutation(tour: &Tour, size: usize) {
    let mut ids = tour.ids();
    ids.sort_unstable();
    assert_eq!(ids, (0..size as i32).collect::<Vec<_>>());
}

fn random_points(n: usize, seed: u64) -> Vec<(f64, f64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (rng.gen_range(0.0..1_000.0), rng.gen_range(0.0..1_000.0)))
        .collect()
}

#[test]
fn unit_square_converges_to_its_perimeter() {
    let square = [(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)];
    let result = solve(&square, 20, 50, 0.05).unwrap();

    assert!((result.best_length - 4.0).abs() < 1e-9);
    assert_permutation(&result.best, 4);
}

#[test]
fn single_city_has_zero_length() {
    for (population, generations) in [(1, 1), (5, 20), (30, 100)] {
        let result = solve(&[(2.0, 3.0)], population, generations, 0.3).unwrap();
        assert_eq!(result.best_length, 0.0);
        assert_eq!(result.best.ids(), vec![0]);
    }
}

#[test]
fn two_cities_travel_the_hypotenuse_twice() {
    let result = solve(&[(0.0, 0.0), (3.0, 4.0)], 10, 10, 0.5).unwrap();
    assert_eq!(result.best_length, 10.0);
}

#[test]
fn population_of_one_skips_reproduction() {
    let points = random_points(12, 3);
    let result = solve(&points, 1, 10, 0.5).unwrap();
    assert_permutation(&result.best, 12);
    assert!(result.generations_run >= 1 && result.generations_run <= 10);
}

#[test]
fn identical_lengths_stop_on_stagnation() {
    // every closed tour over a 3-4-5 triangle has length exactly 12
    let triangle = [(0.0, 0.0), (3.0, 0.0), (0.0, 4.0)];
    let generations = 100;
    let result = solve(&triangle, 30, generations, 0.2).unwrap();

    assert_eq!(result.best_length, 12.0);
    assert!(matches!(result.termination, Termination::Stagnation { .. }));
    assert!(result.generations_run <= generations / 10 + 2);
}

#[test]
fn random_instance_yields_a_consistent_best_tour() {
    let points = random_points(60, 42);
    let result = solve(&points, 40, 60, 0.05).unwrap();

    assert_permutation(&result.best, 60);
    let recomputed = Tour::from_order(result.best.cities().to_vec()).length(&DistanceCache::default());
    assert!((recomputed - result.best_length).abs() < 1e-6);
}

#[test]
fn best_tour_never_regresses_below_the_initial_population() {
    let cities = City::from_points(&random_points(40, 9));
    let cache = Arc::new(DistanceCache::default());
    let config = TspConfig::new(30, 40, 0.1);
    let mut optimizer =
        GeneticOptimizer::with_pool(config.clone(), Arc::clone(&cache), WorkerPool::new(2).unwrap())
            .unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let population = optimizer.initial_population(&cities, &mut rng);
    let initial_best = population.fittest(&cache).unwrap().clone();
    let initial_length = initial_best.length(&cache);

    let mut evaluator =
        genetic_tsp::StagnationEvaluator::new(&config, Arc::clone(&cache), initial_best);
    let result = optimizer
        .optimize(population.into_tours(), &mut evaluator)
        .unwrap();

    assert!(result.best_length <= initial_length);
    assert_permutation(&result.best, 40);
}

#[test]
fn large_children_are_shortened_by_two_opt() {
    let cities = City::from_points(&random_points(1_100, 5));
    let cache = Arc::new(DistanceCache::default());
    let config = TspConfig {
        elitism_size: 1,
        ..TspConfig::new(4, 1, 0.0)
    };
    let mut optimizer =
        GeneticOptimizer::with_pool(config, Arc::clone(&cache), WorkerPool::new(2).unwrap())
            .unwrap();

    // Crossing a tour with itself returns it unchanged unless the cut points
    // coincide, so children only beat the parent through the 2-opt pass.
    let parent = Tour::random(&cities, &mut StdRng::seed_from_u64(12));
    let parent_length = parent.length(&cache);
    let mut evaluator = FixedBudget {
        cache: Arc::clone(&cache),
        best: parent.clone(),
        seen: Vec::new(),
        budget: 1,
    };

    let result = optimizer
        .optimize(vec![parent; 4], &mut evaluator)
        .unwrap();

    assert_permutation(&result.best, 1_100);
    assert!(result.best_length < parent_length);
}

// Runs a fixed number of generations and remembers what it saw.
#[derive(Debug)]
struct FixedBudget {
    cache: Arc<DistanceCache>,
    best: Tour,
    seen: Vec<usize>,
    budget: usize,
}

impl Evaluator<Tour> for FixedBudget {
    fn check(&mut self, fittest: &Tour, generation: usize) -> Option<Termination> {
        self.seen.push(generation);
        if fittest.length(&self.cache) < self.best.length(&self.cache) {
            self.best = fittest.clone();
        }
        (generation + 1 == self.budget).then_some(Termination::BudgetExhausted)
    }

    fn best(&self) -> &Tour {
        &self.best
    }
}

#[test]
fn custom_evaluators_drive_the_loop() {
    let cities = City::from_points(&random_points(25, 11));
    let cache = Arc::new(DistanceCache::default());
    let mut optimizer = GeneticOptimizer::with_pool(
        TspConfig::new(24, 500, 0.1),
        Arc::clone(&cache),
        WorkerPool::new(2).unwrap(),
    )
    .unwrap();

    let mut rng = StdRng::seed_from_u64(6);
    let population = Population::new(&cities, 24, &mut rng);
    let mut evaluator = FixedBudget {
        cache: Arc::clone(&cache),
        best: population.tours()[0].clone(),
        seen: Vec::new(),
        budget: 7,
    };

    let result = optimizer
        .optimize(population.into_tours(), &mut evaluator)
        .unwrap();

    assert_eq!(result.generations_run, 7);
    assert_eq!(evaluator.seen, (0..7).collect::<Vec<_>>());
    assert_eq!(result.termination, Termination::BudgetExhausted);
}

#[test]
fn one_cache_serves_consecutive_instances() {
    let cache = Arc::new(DistanceCache::default());
    let mut optimizer = GeneticOptimizer::with_pool(
        TspConfig::new(20, 50, 0.05),
        Arc::clone(&cache),
        WorkerPool::new(2).unwrap(),
    )
    .unwrap();

    let square = City::from_points(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
    let result = optimizer.evolve(&square).unwrap();
    assert!((result.best_length - 4.0).abs() < 1e-9);

    let pair = City::from_points(&[(0.0, 0.0), (3.0, 4.0)]);
    let result = optimizer.evolve(&pair).unwrap();
    assert_eq!(result.best_length, 10.0);
    assert!(!cache.is_empty());
}

#[test]
fn invalid_parameters_are_rejected() {
    assert!(solve(&[], 10, 10, 0.1).is_err());
    assert!(solve(&[(0.0, 0.0)], 0, 10, 0.1).is_err());
    assert!(solve(&[(0.0, 0.0)], 10, 0, 0.1).is_err());
    assert!(solve(&[(0.0, 0.0)], 10, 10, -0.1).is_err());
}
