pub mod city;
pub mod distance_cache;
pub mod error;
pub mod genetic_algorithm;
pub mod genetic_optimizer;
pub mod loader;
pub mod local_search;
pub mod params;
pub mod population;
pub mod report;
pub mod tour;
pub mod visualization;
pub mod worker_pool;

pub use city::City;
pub use distance_cache::DistanceCache;
pub use error::{Error, Result};
pub use genetic_algorithm::{Chromosome, EvolutionResult, Evaluator, Optimizer, Termination};
pub use genetic_optimizer::{solve, GeneticOptimizer, StagnationEvaluator, TspConfig};
pub use local_search::TwoOptConfig;
pub use population::Population;
pub use tour::Tour;
pub use worker_pool::WorkerPool;
