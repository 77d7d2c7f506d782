use crate::distance_cache::DistanceCache;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A location on the plane with a stable identity.
///
/// Two cities are equal when their ids match; the coordinates are carried
/// along for distance computation only.
#[derive(Clone, Copy, Debug)]
pub struct City {
    x: f64,
    y: f64,
    id: i32,
}

impl City {
    pub fn new(x: f64, y: f64, id: i32) -> Self {
        Self { x, y, id }
    }

    /// Assigns ids `0..n` in input order.
    pub fn from_points(points: &[(f64, f64)]) -> Vec<City> {
        points
            .iter()
            .zip(0..)
            .map(|(&(x, y), id)| City::new(x, y, id))
            .collect()
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn euclidean(&self, other: &City) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn distance_to(&self, other: &City, cache: &DistanceCache) -> f64 {
        cache.distance(self, other)
    }
}

impl PartialEq for City {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for City {}

impl Hash for City {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ({}, {})", self.id, self.x as i64, self.y as i64)
    }
}
