use crate::distance_cache::DistanceCache;
use crate::error::Result;
use std::fmt::Debug;

// This trait represents a chromosome - a single candidate tour
// of the problem we're solving. Lower cost is better.
pub trait Chromosome: Send + Sync + Debug + Clone {
    fn cost(&self, cache: &DistanceCache) -> f64;
    fn size(&self) -> usize;
}

// Why the evolutionary loop stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    BudgetExhausted,
    Stagnation { stagnant_generations: usize },
}

// This trait represents the stopping condition of the algorithm. It also
// keeps its own copy of the best chromosome seen so far, since the
// population it observes is replaced every generation.
pub trait Evaluator<C: Chromosome>: Send + Sync + Debug {
    fn check(&mut self, fittest: &C, generation: usize) -> Option<Termination>;
    fn best(&self) -> &C;
}

#[derive(Clone, Debug)]
pub struct EvolutionResult<C: Chromosome> {
    pub best: C,
    pub best_length: f64,
    pub generations_run: usize,
    pub termination: Termination,
}

// This trait encapsulates the optimizer logic
pub trait Optimizer<C: Chromosome>: Send + Sync + Debug {
    fn optimize(
        &mut self,
        population: Vec<C>,
        eval: &mut dyn Evaluator<C>,
    ) -> Result<EvolutionResult<C>>;
}
