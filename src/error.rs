use std::path::PathBuf;

/// Errors raised while configuring a run or talking to the outside world.
///
/// The evolutionary loop itself never fails once an optimizer has been built.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no cities to route")]
    NoCities,
    #[error("population size must be positive")]
    EmptyPopulation,
    #[error("generation budget must be positive")]
    NoGenerations,
    #[error("mutation rate must be between 0.0 and 1.0, got {0}")]
    MutationRate(f64),
    #[error("worker pool could not be built: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("plotting failed: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, Error>;
