use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use derive_more::Display;
use log::{debug, info, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::plant_location::model::PlantLocationModel;
use crate::models::plant_location::sets_and_parameters::Parameters;
use crate::problem::{PerturbationSpec, Problem};
use crate::solution::{ExtractionError, SolutionRecord};
use crate::solver::{MilpSolve, SolveStatus};

/// Configuration of one Monte Carlo run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of independent trials
    pub trials: usize,
    /// Perturbation of the fixed cost table
    pub fixed_cost: PerturbationSpec,
    /// Perturbation of the variable cost table
    pub variable_cost: PerturbationSpec,
    /// Overall wall clock budget for the run, checked between trials
    pub deadline: Option<Duration>,
}

#[derive(Debug, Display)]
pub enum SimulationError {
    /// Rejected before any trial ran
    #[display(fmt = "invalid parameter: {}", _0)]
    InvalidParameter(String),
    /// A trial failed to reach optimality. The whole run is abandoned:
    /// an aggregate over fewer trials than requested would be misleading.
    #[display(fmt = "trial {} ended {}, aborting the run", trial, status)]
    Aborted { trial: usize, status: SolveStatus },
    /// The run deadline expired between trials
    #[display(fmt = "deadline expired before trial {}", trial)]
    DeadlineExceeded { trial: usize },
}

impl std::error::Error for SimulationError {}

/// Empirical distributions accumulated over the trials of one run. Every
/// sequence holds exactly one entry per trial, in trial order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trial_count: usize,
    /// Total production cost per trial
    pub cost_samples: Vec<f64>,
    /// Produced quantity per trial, keyed origin, then destination
    pub flow_distributions: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
    /// 1 for every trial in which any plant was built at the location
    pub site_distributions: BTreeMap<String, Vec<u8>>,
    /// Dual price per trial, keyed by constraint identifier
    pub dual_distributions: BTreeMap<String, Vec<f64>>,
    /// Slack per trial, keyed by constraint identifier
    pub slack_distributions: BTreeMap<String, Vec<f64>>,
}

impl SimulationResult {
    fn new() -> SimulationResult {
        SimulationResult {
            trial_count: 0,
            cost_samples: Vec::new(),
            flow_distributions: BTreeMap::new(),
            site_distributions: BTreeMap::new(),
            dual_distributions: BTreeMap::new(),
            slack_distributions: BTreeMap::new(),
        }
    }

    /// Appends one trial's record to every distribution
    fn push(&mut self, record: &SolutionRecord) {
        self.trial_count += 1;
        self.cost_samples.push(record.objective_value);

        for ((origin, destination), flow) in &record.flows {
            self.flow_distributions
                .entry(origin.clone())
                .or_default()
                .entry(destination.clone())
                .or_default()
                .push(*flow);
        }

        for (location, decision) in &record.site_decisions {
            self.site_distributions
                .entry(location.clone())
                .or_default()
                .push(decision.open() as u8);
        }

        for (id, dual) in &record.duals {
            self.dual_distributions
                .entry(id.clone())
                .or_default()
                .push(*dual);
        }

        for (id, slack) in &record.slacks {
            self.slack_distributions
                .entry(id.clone())
                .or_default()
                .push(*slack);
        }
    }
}

/// The Monte Carlo loop. Every trial samples fresh cost tables, builds a
/// fresh model, solves it and appends the extracted record to the running
/// distributions. Trials share nothing but the problem tables and the
/// random stream; each owns its model exclusively.
pub struct Simulation<'p, S, R> {
    problem: &'p Problem,
    solver: S,
    rng: R,
}

impl<'p, S, R> Simulation<'p, S, R>
where
    S: MilpSolve,
    R: Rng,
{
    pub fn new(problem: &'p Problem, solver: S, rng: R) -> Self {
        Simulation {
            problem,
            solver,
            rng,
        }
    }

    pub fn run(&mut self, config: &SimulationConfig) -> Result<SimulationResult, SimulationError> {
        validate(config)?;

        info!(
            "running {} trials over {} locations",
            config.trials,
            self.problem.location_count()
        );

        let start = Instant::now();
        let mut result = SimulationResult::new();

        for trial in 0..config.trials {
            if let Some(deadline) = config.deadline {
                if start.elapsed() > deadline {
                    return Err(SimulationError::DeadlineExceeded { trial });
                }
            }

            trace!("trial {}: sampling cost tables", trial);
            let parameters = Parameters::sample(
                self.problem,
                &config.fixed_cost,
                &config.variable_cost,
                &mut self.rng,
            );

            let (model, variables) = PlantLocationModel::build(self.problem, &parameters);
            let solved = self.solver.solve(&model);

            let record =
                match SolutionRecord::extract(&solved, &variables, &model, self.problem) {
                    Ok(record) => record,
                    Err(ExtractionError::NotOptimal(status)) => {
                        return Err(SimulationError::Aborted { trial, status })
                    }
                };

            debug!("trial {}: cost {}", trial, record.objective_value);
            result.push(&record);
        }

        info!("completed {} trials", result.trial_count);
        Ok(result)
    }
}

fn validate(config: &SimulationConfig) -> Result<(), SimulationError> {
    use SimulationError::InvalidParameter;

    if config.trials == 0 {
        return Err(InvalidParameter(
            "trials must be a positive integer".to_string(),
        ));
    }

    let specs = [
        ("fixed cost", &config.fixed_cost),
        ("variable cost", &config.variable_cost),
    ];
    for (name, spec) in specs {
        if !spec.relative_std_dev.is_finite() || spec.relative_std_dev < 0.0 {
            return Err(InvalidParameter(format!(
                "{} relative standard deviation must be non-negative",
                name
            )));
        }
        if !spec.bias.is_finite() || spec.bias <= 0.0 {
            return Err(InvalidParameter(format!(
                "{} bias must be a positive real",
                name
            )));
        }
    }

    Ok(())
}
