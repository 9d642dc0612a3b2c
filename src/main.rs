use clap::{Parser, Subcommand};
use float_ord::FloatOrd;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use plantloc::parse::DataCache;
use plantloc::problem::{PerturbationSpec, Problem};
use plantloc::simulation::{Simulation, SimulationConfig, SimulationResult};
use plantloc::solver::Highs;
use plantloc::store::RunStore;

#[derive(Parser)]
#[clap(
    name = "plantloc",
    about = "Capacitated plant location under cost uncertainty",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Monte Carlo simulation and persist the result
    Run {
        /// Directory holding the four input tables
        #[clap(long, default_value = "data")]
        data: PathBuf,
        /// Number of trials
        #[clap(long, default_value_t = 10)]
        trials: usize,
        /// Relative standard deviation of the fixed cost draws
        #[clap(long, default_value_t = 0.05)]
        fixcost_sd: f64,
        /// Relative standard deviation of the variable cost draws
        #[clap(long, default_value_t = 0.05)]
        varcost_sd: f64,
        /// Bias of the fixed cost draws
        #[clap(long, default_value_t = 1.0)]
        fixcost_bias: f64,
        /// Bias of the variable cost draws
        #[clap(long, default_value_t = 1.0)]
        varcost_bias: f64,
        /// Seed for the random stream; drawn from entropy when omitted
        #[clap(long)]
        seed: Option<u64>,
        /// Per-solve time limit in seconds
        #[clap(long)]
        time_limit: Option<f64>,
        /// Overall run deadline in seconds
        #[clap(long)]
        deadline: Option<u64>,
        /// Directory runs are written to
        #[clap(long, default_value = "simulation")]
        out: PathBuf,
    },
    /// Summarize a stored simulation run
    Show {
        /// Run id as printed by `run`, or omitted to list stored runs
        id: Option<Uuid>,
        #[clap(long, default_value = "simulation")]
        out: PathBuf,
    },
    /// Print the input tables
    Data {
        #[clap(long, default_value = "data")]
        data: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    match Cli::parse().command {
        Command::Run {
            data,
            trials,
            fixcost_sd,
            varcost_sd,
            fixcost_bias,
            varcost_bias,
            seed,
            time_limit,
            deadline,
            out,
        } => {
            let config = SimulationConfig {
                trials,
                fixed_cost: PerturbationSpec::new(fixcost_bias, fixcost_sd),
                variable_cost: PerturbationSpec::new(varcost_bias, varcost_sd),
                deadline: deadline.map(Duration::from_secs),
            };
            run(&data, &out, &config, seed, time_limit)
        }
        Command::Show { id, out } => show(id, &out),
        Command::Data { data } => print_tables(&data),
    }
}

fn run(
    data: &PathBuf,
    out: &PathBuf,
    config: &SimulationConfig,
    seed: Option<u64>,
    time_limit: Option<f64>,
) -> Result<(), Box<dyn Error>> {
    let mut cache = DataCache::new(data);
    let problem = cache.problem()?;

    let solver = match time_limit {
        Some(seconds) => Highs::with_time_limit(seconds),
        None => Highs::new(),
    };
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let result = Simulation::new(&problem, solver, rng).run(config)?;
    let record = RunStore::new(out).save(config, &result)?;

    println!("run {} ({} trials)", record.id, result.trial_count);
    print_summary(&record.result);
    Ok(())
}

fn show(id: Option<Uuid>, out: &PathBuf) -> Result<(), Box<dyn Error>> {
    let store = RunStore::new(out);

    let id = match id {
        Some(id) => id,
        None => {
            for id in store.list()? {
                println!("{}", id);
            }
            return Ok(());
        }
    };

    let record = store.load(id)?;
    println!(
        "run {} from {} ({} trials, fix sd {}, var sd {})",
        record.id,
        record.created.format("%Y-%m-%d %H:%M:%S"),
        record.result.trial_count,
        record.config.fixed_cost.relative_std_dev,
        record.config.variable_cost.relative_std_dev,
    );
    print_summary(&record.result);
    Ok(())
}

fn print_tables(data: &PathBuf) -> Result<(), Box<dyn Error>> {
    let mut cache = DataCache::new(data);
    let problem = cache.problem()?;

    println!("fixed costs:");
    print_by_size(&problem, |problem, i, s| problem.fixed_cost(i, s));

    println!("capacities:");
    print_by_size(&problem, |problem, i, s| problem.capacity(i, s));

    println!("variable costs:");
    for (i, origin) in problem.locations().iter().enumerate() {
        let row: Vec<String> = (0..problem.location_count())
            .map(|j| format!("{}: {}", problem.locations()[j], problem.variable_cost(i, j)))
            .collect();
        println!("  {} -> {}", origin, row.join(", "));
    }

    println!("demand:");
    for (j, location) in problem.locations().iter().enumerate() {
        println!("  {}: {}", location, problem.demand(j));
    }

    Ok(())
}

fn print_by_size(problem: &Problem, value: impl Fn(&Problem, usize, usize) -> f64) {
    for (i, location) in problem.locations().iter().enumerate() {
        let row: Vec<String> = problem
            .size_categories()
            .iter()
            .enumerate()
            .map(|(s, size)| format!("{}: {}", size, value(problem, i, s)))
            .collect();
        println!("  {} -> {}", location, row.join(", "));
    }
}

fn print_summary(result: &SimulationResult) {
    let samples = &result.cost_samples;
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let min = samples.iter().copied().map(FloatOrd).min();
    let max = samples.iter().copied().map(FloatOrd).max();

    if let (Some(min), Some(max)) = (min, max) {
        println!(
            "production cost: mean {:.2}, std {:.2}, min {:.2}, max {:.2}",
            mean,
            variance.sqrt(),
            min.0,
            max.0
        );
        print_histogram(samples, min.0, max.0);
    }

    println!("sites opened:");
    for (location, samples) in &result.site_distributions {
        let opened: u32 = samples.iter().map(|s| u32::from(*s)).sum();
        println!(
            "  {}: {}/{} trials",
            location,
            opened,
            result.trial_count
        );
    }

    println!("constraints (mean dual / mean slack):");
    for (id, duals) in &result.dual_distributions {
        let dual = duals.iter().sum::<f64>() / duals.len() as f64;
        let slack = result
            .slack_distributions
            .get(id)
            .map(|slacks| slacks.iter().sum::<f64>() / slacks.len() as f64)
            .unwrap_or_default();
        println!("  {}: {:.4} / {:.4}", id, dual, slack);
    }
}

fn print_histogram(samples: &[f64], min: f64, max: f64) {
    const BINS: usize = 10;

    if samples.len() < 2 || max <= min {
        return;
    }

    let width = (max - min) / BINS as f64;
    let mut counts = [0usize; BINS];
    for sample in samples {
        let bin = (((sample - min) / width) as usize).min(BINS - 1);
        counts[bin] += 1;
    }

    for (bin, count) in counts.iter().enumerate() {
        let low = min + bin as f64 * width;
        println!(
            "  [{:>12.2}, {:>12.2}) {:>4} {}",
            low,
            low + width,
            count,
            "#".repeat(*count)
        );
    }
}
