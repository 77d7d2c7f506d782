use crate::error::{Error, Result};
use crate::tour::Tour;
use itertools::{Itertools, MinMaxResult};
use plotters::prelude::*;
use std::fmt::Display;
use std::ops::Range;
use std::path::Path;

fn plot_error(err: impl Display) -> Error {
    Error::Plot(err.to_string())
}

// Axis range covering every value, padded so a degenerate spread still
// yields a drawable interval.
fn axis_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = match values.minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => (0.0, 0.0),
        MinMaxResult::OneElement(value) => (value, value),
        MinMaxResult::MinMax(min, max) => (min, max),
    };
    let padding = ((max - min) * 0.05).max(1.0);
    (min - padding)..(max + padding)
}

/// Renders the closed tour as a PNG at `output_path`.
pub fn plot_tour(tour: &Tour, length: f64, output_path: &Path) -> Result<()> {
    // Create a drawing area for the chart.
    let root = BitMapBackend::new(output_path, (1600, 1600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let cities = tour.cities();
    let x_range = axis_range(cities.iter().map(|city| city.x()));
    let y_range = axis_range(cities.iter().map(|city| city.y()));

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} cities, length {:.2}", cities.len(), length),
            ("sans-serif", 30),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("x")
        .y_desc("y")
        .draw()
        .map_err(plot_error)?;

    // The closing edge back to the first city is drawn explicitly.
    let closed = cities
        .iter()
        .chain(cities.first())
        .map(|city| (city.x(), city.y()));
    chart
        .draw_series(LineSeries::new(closed, &BLUE))
        .map_err(plot_error)?;

    chart
        .draw_series(
            cities
                .iter()
                .map(|city| Circle::new((city.x(), city.y()), 3, RED.filled())),
        )
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    tracing::info!(path = %output_path.display(), "Tour plot saved");
    Ok(())
}
