use crate::city::City;
use crate::distance_cache::DistanceCache;
use crate::genetic_algorithm::Chromosome;
use itertools::Itertools;
use rand::prelude::*;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::OnceLock;

/// One candidate solution: a closed visiting order over every city.
///
/// The total length is computed on first request and memoized until the
/// order changes. All mutating operations go through methods that reset it.
#[derive(Clone, Debug, Default)]
pub struct Tour {
    cities: Vec<City>,
    length: OnceLock<f64>,
}

impl Tour {
    /// Keeps the given order verbatim.
    pub fn from_order(cities: Vec<City>) -> Self {
        Self {
            cities,
            length: OnceLock::new(),
        }
    }

    /// A uniformly random permutation of `cities`.
    pub fn random<R: Rng + ?Sized>(cities: &[City], rng: &mut R) -> Self {
        let mut cities = cities.to_vec();
        cities.shuffle(rng);
        Self::from_order(cities)
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn ids(&self) -> Vec<i32> {
        self.cities.iter().map(City::id).collect()
    }

    /// Length of the closed loop, including the edge from the last city back
    /// to the first.
    pub fn length(&self, cache: &DistanceCache) -> f64 {
        *self.length.get_or_init(|| {
            self.cities
                .iter()
                .circular_tuple_windows()
                .map(|(from, to)| from.distance_to(to, cache))
                .sum()
        })
    }

    pub fn is_evaluated(&self) -> bool {
        self.length.get().is_some()
    }

    fn invalidate(&mut self) {
        self.length = OnceLock::new();
    }

    pub(crate) fn reverse_segment(&mut self, range: Range<usize>) {
        self.cities[range].reverse();
        self.invalidate();
    }

    pub(crate) fn swap(&mut self, i: usize, j: usize) {
        self.cities.swap(i, j);
        self.invalidate();
    }

    /// Swaps two random cities or reverses a random segment, with equal
    /// probability. The cached length is dropped even when the move turns out
    /// to be a no-op.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.invalidate();
        let size = self.cities.len();
        if size == 0 {
            return;
        }

        let i = rng.gen_range(0..size);
        let j = rng.gen_range(0..size);
        if rng.gen_bool(0.5) {
            if i != j {
                self.swap(i, j);
            }
        } else {
            self.reverse_between(i, j);
        }
    }

    /// Reverses the cities from the smaller index up to, but excluding, the
    /// larger one.
    pub(crate) fn reverse_between(&mut self, i: usize, j: usize) {
        if i != j {
            self.reverse_segment(i.min(j)..i.max(j));
        }
    }

    /// Order crossover (OX).
    ///
    /// The slice `[lower, upper)` is copied from `parent_1`; the remaining
    /// positions are filled from `upper` onwards (wrapping) with the cities of
    /// `parent_2` in their relative order, also starting at `upper`.
    pub fn crossover<R: Rng + ?Sized>(parent_1: &Tour, parent_2: &Tour, rng: &mut R) -> Tour {
        let size = parent_1.len();
        if size == 0 {
            return parent_1.clone();
        }

        let start = rng.gen_range(0..size);
        let end = rng.gen_range(0..size);

        // Equal cut points give no slice to inherit. This returns a shuffled
        // copy of the first parent instead of redrawing, which throws away
        // both parents' structure for this child.
        if start == end {
            return Tour::random(&parent_1.cities, rng);
        }

        Self::crossover_between(parent_1, parent_2, start.min(end), start.max(end))
    }

    /// Order crossover with fixed cut points, `lower < upper <= size`.
    pub(crate) fn crossover_between(
        parent_1: &Tour,
        parent_2: &Tour,
        lower: usize,
        upper: usize,
    ) -> Tour {
        let size = parent_1.len();
        let inherited: HashSet<City> = parent_1.cities[lower..upper].iter().copied().collect();
        let mut child = parent_1.cities.clone();

        let mut cursor = upper % size;
        for offset in 0..size {
            let city = parent_2.cities[(upper + offset) % size];
            if inherited.contains(&city) {
                continue;
            }

            child[cursor] = city;
            cursor = (cursor + 1) % size;
            if cursor == lower {
                break;
            }
        }

        debug_assert_eq!(child.iter().collect::<HashSet<_>>().len(), size);
        Tour::from_order(child)
    }

    pub fn path_string(&self) -> String {
        self.cities.iter().map(City::id).join(" -> ")
    }
}

impl Chromosome for Tour {
    fn cost(&self, cache: &DistanceCache) -> f64 {
        self.length(cache)
    }

    fn size(&self) -> usize {
        self.len()
    }
}
