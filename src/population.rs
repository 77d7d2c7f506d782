use crate::city::City;
use crate::distance_cache::DistanceCache;
use crate::tour::Tour;
use rand::Rng;
use rayon::prelude::*;
use std::cmp::Ordering;

#[derive(Clone, Debug, Default)]
pub struct Population {
    tours: Vec<Tour>,
}

impl Population {
    /// `size` independently shuffled tours over the same cities.
    pub fn new<R: Rng + ?Sized>(cities: &[City], size: usize, rng: &mut R) -> Self {
        let tours = (0..size).map(|_| Tour::random(cities, rng)).collect();
        Self { tours }
    }

    pub fn from_tours(tours: Vec<Tour>) -> Self {
        Self { tours }
    }

    pub fn tours(&self) -> &[Tour] {
        &self.tours
    }

    pub fn tours_mut(&mut self) -> &mut [Tour] {
        &mut self.tours
    }

    pub fn into_tours(self) -> Vec<Tour> {
        self.tours
    }

    pub fn len(&self) -> usize {
        self.tours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tours.is_empty()
    }

    /// Fills every tour's memoized length in parallel, on whichever rayon
    /// pool the caller is running in.
    pub fn evaluate(&self, cache: &DistanceCache) {
        self.tours.par_iter().for_each(|tour| {
            tour.length(cache);
        });
    }

    /// Shortest tour; the first one wins a tie.
    pub fn fittest(&self, cache: &DistanceCache) -> Option<&Tour> {
        self.tours.iter().reduce(|best, tour| {
            if tour.length(cache) < best.length(cache) {
                tour
            } else {
                best
            }
        })
    }

    /// Ascending by length, keeping the relative order of equal tours.
    pub fn sort_by_length(&mut self, cache: &DistanceCache) {
        self.evaluate(cache);
        self.tours.sort_by(|a, b| {
            a.length(cache)
                .partial_cmp(&b.length(cache))
                .unwrap_or(Ordering::Equal)
        });
    }
}
