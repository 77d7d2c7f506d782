use crate::city::City;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_CAPACITY: usize = 100_000;
pub const DEFAULT_ID_WINDOW: u32 = 1_000;

type PairKey = (i32, i32);
type Endpoints = ((f64, f64), (f64, f64));

// The endpoints are stored so that a cache shared between problem instances
// which reuse ids never answers with another instance's distance.
#[derive(Debug, Clone, Copy)]
struct Entry {
    endpoints: Endpoints,
    distance: f64,
    stamp: u64,
}

// Recency is tracked with a monotonically increasing stamp per access; the
// smallest stamp in `recency` is always the least recently used pair.
#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<PairKey, Entry>,
    recency: BTreeMap<u64, PairKey>,
    tick: u64,
}

impl LruState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn get(&mut self, key: PairKey, endpoints: Endpoints) -> Option<f64> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(&key)?;
        if entry.endpoints != endpoints {
            return None;
        }
        self.recency.remove(&entry.stamp);
        entry.stamp = tick;
        self.recency.insert(tick, key);
        Some(entry.distance)
    }

    fn insert(&mut self, key: PairKey, endpoints: Endpoints, distance: f64, capacity: usize) {
        if capacity == 0 {
            return;
        }

        let tick = self.next_tick();
        if let Some(entry) = self.entries.get_mut(&key) {
            self.recency.remove(&entry.stamp);
            entry.stamp = tick;
            entry.endpoints = endpoints;
            entry.distance = distance;
            self.recency.insert(tick, key);
            return;
        }

        while self.entries.len() >= capacity {
            match self.recency.pop_first() {
                Some((_, oldest)) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.entries.insert(
            key,
            Entry {
                endpoints,
                distance,
                stamp: tick,
            },
        );
        self.recency.insert(tick, key);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

/// Bounded, thread-safe memo of pairwise city distances.
///
/// Only pairs whose ids are at most `id_window` apart are memoized; every
/// other pair is computed on each call. Both paths return the same Euclidean
/// value: a hit whose stored coordinates differ from the queried cities is
/// treated as a miss and overwritten. When the cache is full the least
/// recently used pair is evicted.
#[derive(Debug)]
pub struct DistanceCache {
    capacity: usize,
    id_window: u32,
    state: Mutex<LruState>,
}

impl Default for DistanceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_ID_WINDOW)
    }
}

impl DistanceCache {
    pub fn new(capacity: usize, id_window: u32) -> Self {
        Self {
            capacity,
            id_window,
            state: Mutex::new(LruState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn id_window(&self) -> u32 {
        self.id_window
    }

    pub fn distance(&self, a: &City, b: &City) -> f64 {
        if a.id().abs_diff(b.id()) > self.id_window {
            return a.euclidean(b);
        }

        let (low, high) = if a.id() <= b.id() { (a, b) } else { (b, a) };
        let key = (low.id(), high.id());
        let endpoints = ((low.x(), low.y()), (high.x(), high.y()));

        let mut state = self.state.lock();
        if let Some(distance) = state.get(key, endpoints) {
            return distance;
        }

        let distance = a.euclidean(b);
        state.insert(key, endpoints, distance, self.capacity);
        distance
    }

    pub fn contains(&self, a: i32, b: i32) -> bool {
        self.state.lock().entries.contains_key(&(a.min(b), a.max(b)))
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.state.lock().clear();
        tracing::debug!("Distance cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rayon::prelude::*;

    fn city(id: i32) -> City {
        City::new(id as f64, (id * 2) as f64, id)
    }

    #[test]
    fn caches_pairs_under_canonical_key() {
        let cache = DistanceCache::default();
        let (a, b) = (City::new(0.0, 0.0, 4), City::new(3.0, 4.0, 2));

        assert_eq!(cache.distance(&a, &b), 5.0);
        assert!(cache.contains(2, 4));
        assert_eq!(cache.distance(&b, &a), 5.0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distant_ids_bypass_the_cache() {
        let cache = DistanceCache::new(16, 10);
        let a = City::new(0.0, 0.0, 0);
        let b = City::new(6.0, 8.0, 11);

        assert_eq!(cache.distance(&a, &b), 10.0);
        assert_eq!(cache.distance(&b, &a), 10.0);
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = DistanceCache::new(2, 100);
        let (c0, c1, c2, c3) = (city(0), city(1), city(2), city(3));

        cache.distance(&c0, &c1);
        cache.distance(&c0, &c2);
        // touch (0, 1) so (0, 2) becomes the eviction candidate
        cache.distance(&c1, &c0);
        cache.distance(&c0, &c3);

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(0, 1));
        assert!(cache.contains(0, 3));
        assert!(!cache.contains(0, 2));
    }

    #[test]
    fn never_exceeds_capacity_under_contention() {
        let cache = DistanceCache::new(64, 1_000);
        let cities: Vec<City> = (0..200).map(city).collect();

        (0..8).into_par_iter().for_each(|seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..2_000 {
                let a = cities.choose(&mut rng).unwrap();
                let b = cities.choose(&mut rng).unwrap();
                assert_eq!(cache.distance(a, b), a.euclidean(b));
            }
        });

        assert!(cache.len() <= 64);
    }

    #[test]
    fn instances_reusing_ids_do_not_share_distances() {
        let cache = DistanceCache::default();
        let unit = (City::new(0.0, 0.0, 0), City::new(0.0, 1.0, 1));
        let wide = (City::new(0.0, 0.0, 0), City::new(3.0, 4.0, 1));

        assert_eq!(cache.distance(&unit.0, &unit.1), 1.0);
        assert_eq!(cache.distance(&wide.0, &wide.1), 5.0);
        assert_eq!(cache.distance(&wide.1, &wide.0), 5.0);
        assert_eq!(cache.len(), 1);

        // the overwritten pair is recomputed for the first instance again
        assert_eq!(cache.distance(&unit.1, &unit.0), 1.0);
    }

    #[test]
    fn zero_capacity_still_answers() {
        let cache = DistanceCache::new(0, 1_000);
        assert_eq!(cache.distance(&city(0), &city(1)), city(0).euclidean(&city(1)));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = DistanceCache::default();
        cache.distance(&city(0), &city(1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.distance(&city(0), &city(1)), city(0).euclidean(&city(1)));
    }
}
