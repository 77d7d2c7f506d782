use clap::Parser;
use colored::Colorize;
use genetic_tsp::loader::load_cities;
use genetic_tsp::params::{available_memory_mb, RunParameters};
use genetic_tsp::report::{append_report, RunReport};
use genetic_tsp::visualization::plot_tour;
use genetic_tsp::{DistanceCache, GeneticOptimizer, TspConfig};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// Above this many cities the distance cache is emptied before the run.
const LARGE_PROBLEM: usize = 10_000;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about = "Genetic algorithm with 2-opt refinement for the travelling salesman problem")]
struct Args {
    /// Cities file: the count on the first line, then one `x y` pair per line
    file: PathBuf,

    /// Population size (derived from the problem size if omitted)
    #[arg(long)]
    population: Option<usize>,

    /// Generation budget (derived from the problem size if omitted)
    #[arg(long)]
    generations: Option<usize>,

    /// Mutation probability per offspring (derived if omitted)
    #[arg(long)]
    mutation_rate: Option<f64>,

    /// Memory budget used to size the population, in megabytes (probed from
    /// the system if omitted)
    #[arg(long)]
    memory_mb: Option<u64>,

    /// CSV file the run summary is appended to
    #[arg(long, default_value = "results.csv")]
    results: PathBuf,

    /// Optional PNG rendering of the best tour
    #[arg(long)]
    plot: Option<PathBuf>,
}

fn enable_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    enable_tracing();
    let args = Args::parse();
    let start = Instant::now();

    let cities = load_cities(&args.file)?;
    let file_name = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());
    tracing::info!(file = %file_name, cities = cities.len(), "Cities loaded");

    let memory_mb = args.memory_mb.unwrap_or_else(available_memory_mb);
    tracing::info!(memory_mb, "Memory budget");

    let params = RunParameters::derive(cities.len(), memory_mb).with_overrides(
        args.population,
        args.generations,
        args.mutation_rate,
    );
    tracing::info!(
        population_size = params.population_size,
        generations = params.generations,
        mutation_rate = params.mutation_rate,
        "Run parameters"
    );

    let cache = Arc::new(DistanceCache::default());
    if cities.len() > LARGE_PROBLEM {
        tracing::info!("Large instance, starting from an empty distance cache");
        cache.clear();
    }

    let config = TspConfig::new(params.population_size, params.generations, params.mutation_rate);
    let mut optimizer = GeneticOptimizer::new(config, cache)?;
    let result = optimizer.evolve(&cities)?;
    let seconds = start.elapsed().as_secs_f64();

    println!("{} {:.2}", "Best cost:".bold().green(), result.best_length);
    println!("{} {}", "Path:".bold(), result.best.path_string());
    println!(
        "{} {:.2} s over {} generations",
        "Solved in".bold(),
        seconds,
        result.generations_run
    );

    append_report(&args.results, &RunReport::new(&file_name, &result, seconds))?;

    if let Some(plot) = &args.plot {
        plot_tour(&result.best, result.best_length, plot)?;
    }

    if !optimizer.shutdown(SHUTDOWN_TIMEOUT) {
        eprintln!("{}", "Some worker tasks were still running at exit".yellow());
    }

    Ok(())
}
