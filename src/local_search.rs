use crate::distance_cache::DistanceCache;
use crate::tour::Tour;
use rand::Rng;

/// Budget of the randomized 2-opt pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TwoOptConfig {
    /// Upper bound on committed moves, whatever the tour size.
    pub max_moves: usize,
    /// The move cap is also limited to `size / move_divisor`.
    pub move_divisor: usize,
    /// Random index pairs tried before a pass counts as unsuccessful.
    pub samples_per_pass: usize,
}

impl Default for TwoOptConfig {
    fn default() -> Self {
        Self {
            max_moves: 50,
            move_divisor: 20,
            samples_per_pass: 100,
        }
    }
}

impl TwoOptConfig {
    pub fn move_cap(&self, size: usize) -> usize {
        self.max_moves.min(size / self.move_divisor.max(1))
    }
}

/// Replaces edges `(a, b)` and `(c, d)` at positions `i` and `j` with
/// `(a, c)` and `(b, d)` when that is strictly shorter.
pub fn try_two_opt_swap(tour: &mut Tour, i: usize, j: usize, cache: &DistanceCache) -> bool {
    let size = tour.len();
    let (i, j) = if i > j { (j, i) } else { (i, j) };

    let cities = tour.cities();
    let a = &cities[i];
    let b = &cities[(i + 1) % size];
    let c = &cities[j];
    let d = &cities[(j + 1) % size];

    let current = a.distance_to(b, cache) + c.distance_to(d, cache);
    let candidate = a.distance_to(c, cache) + b.distance_to(d, cache);

    if candidate < current {
        tour.reverse_segment(i + 1..j + 1);
        true
    } else {
        false
    }
}

/// Randomized first-improvement 2-opt. Returns the number of moves applied.
pub fn refine<R: Rng + ?Sized>(
    tour: &mut Tour,
    config: &TwoOptConfig,
    cache: &DistanceCache,
    rng: &mut R,
) -> usize {
    let size = tour.len();
    if size < 4 {
        return 0;
    }

    let cap = config.move_cap(size);
    let mut moves = 0;
    let mut improved = true;

    while improved && moves < cap {
        improved = false;

        for _ in 0..config.samples_per_pass {
            let i = rng.gen_range(0..size);
            let j = rng.gen_range(0..size);

            // adjacent pairs and the wrap-around edge
            let gap = i.abs_diff(j);
            if gap <= 1 || gap >= size - 1 {
                continue;
            }

            if try_two_opt_swap(tour, i, j, cache) {
                improved = true;
                moves += 1;
                break;
            }
        }
    }

    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::City;
    use crate::tour::tests::{assert_permutation, grid};
    use rand::prelude::*;

    #[test]
    fn uncrosses_a_bowtie() {
        let cache = DistanceCache::default();
        // (0,0) -> (1,1) -> (1,0) -> (0,1) crosses itself
        let cities = City::from_points(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0)]);
        let mut tour = Tour::from_order(cities.clone());
        let before = tour.length(&cache);

        assert!(try_two_opt_swap(&mut tour, 0, 2, &cache));
        assert!(!tour.is_evaluated());
        assert_eq!(tour.ids(), vec![0, 2, 1, 3]);
        assert!(tour.length(&cache) < before);
        assert_eq!(tour.length(&cache), 4.0);
    }

    #[test]
    fn rejects_non_improving_moves() {
        let cache = DistanceCache::default();
        let square = City::from_points(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        let mut tour = Tour::from_order(square);
        tour.length(&cache);

        assert!(!try_two_opt_swap(&mut tour, 2, 0, &cache));
        assert_eq!(tour.ids(), vec![0, 1, 2, 3]);
        assert!(tour.is_evaluated());
    }

    #[test]
    fn swaps_never_lengthen_the_tour() {
        let cache = DistanceCache::default();
        let cities = grid(60);
        let mut rng = StdRng::seed_from_u64(21);
        let mut tour = Tour::random(&cities, &mut rng);

        for _ in 0..500 {
            let before = tour.length(&cache);
            let i = rng.gen_range(0..cities.len());
            let j = rng.gen_range(0..cities.len());
            if i.abs_diff(j) <= 1 || i.abs_diff(j) >= cities.len() - 1 {
                continue;
            }
            try_two_opt_swap(&mut tour, i, j, &cache);
            assert!(tour.length(&cache) <= before + 1e-9);
            assert_permutation(&tour, &cities);
        }
    }

    #[test]
    fn refine_respects_move_cap() {
        let cache = DistanceCache::default();
        let cities = grid(200);
        let mut rng = StdRng::seed_from_u64(1);
        let mut tour = Tour::random(&cities, &mut rng);
        let before = tour.length(&cache);

        let config = TwoOptConfig {
            max_moves: 3,
            ..TwoOptConfig::default()
        };
        let moves = refine(&mut tour, &config, &cache, &mut rng);

        assert!(moves <= 3);
        assert!(tour.length(&cache) <= before + 1e-9);
        assert_permutation(&tour, &cities);
    }

    #[test]
    fn move_cap_scales_with_size() {
        let config = TwoOptConfig::default();
        assert_eq!(config.move_cap(100), 5);
        assert_eq!(config.move_cap(2_000), 50);
        assert_eq!(config.move_cap(10), 0);
    }

    #[test]
    fn tiny_tours_are_left_alone() {
        let cache = DistanceCache::default();
        let mut rng = StdRng::seed_from_u64(0);
        let mut tour = Tour::from_order(grid(3));
        assert_eq!(refine(&mut tour, &TwoOptConfig::default(), &cache, &mut rng), 0);
    }
}
