use sysinfo::System;

// Used when the platform reports no memory figures at all.
pub const FALLBACK_MEMORY_MB: u64 = 4_096;

/// Memory the process can use, in megabytes: the cgroup limit when running
/// in a container, otherwise the memory currently available on the host.
pub fn available_memory_mb() -> u64 {
    let mut system = System::new();
    system.refresh_memory();
    let bytes = system
        .cgroup_limits()
        .map(|limits| limits.total_memory)
        .unwrap_or_else(|| system.available_memory());
    bytes_to_mb(bytes)
}

fn bytes_to_mb(bytes: u64) -> u64 {
    match bytes / (1024 * 1024) {
        0 => FALLBACK_MEMORY_MB,
        mb => mb,
    }
}

/// Run parameters derived from the problem size and the memory budget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunParameters {
    pub population_size: usize,
    pub generations: usize,
    pub mutation_rate: f64,
}

impl RunParameters {
    pub fn derive(city_count: usize, max_memory_mb: u64) -> Self {
        Self {
            population_size: population_size(city_count, max_memory_mb),
            generations: generations(city_count),
            mutation_rate: mutation_rate(city_count),
        }
    }

    pub fn with_overrides(
        self,
        population_size: Option<usize>,
        generations: Option<usize>,
        mutation_rate: Option<f64>,
    ) -> Self {
        Self {
            population_size: population_size.unwrap_or(self.population_size),
            generations: generations.unwrap_or(self.generations),
            mutation_rate: mutation_rate.unwrap_or(self.mutation_rate),
        }
    }
}

fn population_size(city_count: usize, max_memory_mb: u64) -> usize {
    let size = match max_memory_mb {
        0..=1023 => city_count.min(50),
        1024..=4095 => (city_count / 2).min(100),
        4096..=8191 => (city_count / 3).min(200),
        _ => (city_count / 4).min(500),
    };
    size.max(1)
}

fn generations(city_count: usize) -> usize {
    match city_count {
        0..=100 => 1_000,
        101..=300 => 2_000,
        301..=1_000 => 1_500,
        1_001..=5_000 => 800,
        5_001..=10_000 => 400,
        _ => 200,
    }
}

fn mutation_rate(city_count: usize) -> f64 {
    match city_count {
        0..=100 => 0.05,
        101..=300 => 0.04,
        301..=1_000 => 0.03,
        1_001..=5_000 => 0.02,
        _ => 0.01,
    }
}
