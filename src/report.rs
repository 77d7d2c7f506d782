use crate::error::Result;
use crate::genetic_algorithm::{EvolutionResult, Termination};
use crate::tour::Tour;
use chrono::Local;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::Path;

/// One row of the results file.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub file: String,
    pub cities: usize,
    pub cost: f64,
    pub generations: usize,
    pub stopped_early: bool,
    pub seconds: f64,
    pub finished_at: String,
    pub path: String,
}

impl RunReport {
    pub fn new(file: &str, result: &EvolutionResult<Tour>, seconds: f64) -> Self {
        Self {
            file: file.to_string(),
            cities: result.best.len(),
            cost: result.best_length,
            generations: result.generations_run,
            stopped_early: matches!(result.termination, Termination::Stagnation { .. }),
            seconds,
            finished_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            path: result.best.path_string(),
        }
    }
}

/// Appends `report` to the CSV at `path`, writing the header only when the
/// file is new or empty.
pub fn append_report(path: impl AsRef<Path>, report: &RunReport) -> Result<()> {
    let path = path.as_ref();
    let needs_header = fs::metadata(path).map(|meta| meta.len() == 0).unwrap_or(true);

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);

    writer.serialize(report)?;
    writer.flush()?;
    tracing::debug!(path = %path.display(), "Results appended");
    Ok(())
}
