use crate::problem::{Cost, LocationIndex, PerturbationSpec, Problem, Quantity, SizeIndex};
use rand::Rng;
use rand_distr::StandardNormal;

/// Sets for the plant location model
#[derive(Debug)]
#[allow(non_snake_case)]
pub struct Sets {
    /// Set of locations. Each location is both a candidate plant site and a
    /// demand region.
    pub L: Vec<LocationIndex>,
    /// Set of plant size categories
    pub S: Vec<SizeIndex>,
}

impl Sets {
    pub fn new(problem: &Problem) -> Sets {
        Sets {
            L: (0..problem.location_count()).collect(),
            S: (0..problem.size_count()).collect(),
        }
    }
}

/// Parameters for one trial of the plant location model. The cost tables
/// hold this trial's perturbed draws; demand and capacity are the nominal
/// values shared by every trial.
#[derive(Debug)]
#[allow(non_snake_case)]
pub struct Parameters {
    /// Sampled fixed cost of opening a plant of size s at location i
    pub F: Vec<Vec<Cost>>,
    /// Sampled unit transport cost from location i to location j
    pub C: Vec<Vec<Cost>>,
    /// Demand at location j
    pub D: Vec<Quantity>,
    /// Capacity of a plant of size s at location i
    pub Q: Vec<Vec<Quantity>>,
}

#[allow(non_snake_case)]
impl Parameters {
    /// Draws the perturbed cost tables for one trial. Every cell is drawn
    /// independently from the given random source; draws of different trials
    /// are independent because they consume the same stream.
    pub fn sample<R: Rng>(
        problem: &Problem,
        fixed: &PerturbationSpec,
        variable: &PerturbationSpec,
        rng: &mut R,
    ) -> Parameters {
        let n = problem.location_count();
        let m = problem.size_count();

        let F = (0..n)
            .map(|i| {
                (0..m)
                    .map(|s| perturb(problem.fixed_cost(i, s), fixed, rng))
                    .collect()
            })
            .collect();

        let C = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| perturb(problem.variable_cost(i, j), variable, rng))
                    .collect()
            })
            .collect();

        let D = (0..n).map(|j| problem.demand(j)).collect();

        let Q = (0..n)
            .map(|i| (0..m).map(|s| problem.capacity(i, s)).collect())
            .collect();

        Parameters { F, C, D, Q }
    }
}

/// One draw of `cost + Normal(cost * bias, cost * relative_std_dev)`. A zero
/// relative standard deviation short-circuits to the shifted mean without
/// touching the generator, which keeps the degenerate case exact.
fn perturb<R: Rng>(cost: Cost, spec: &PerturbationSpec, rng: &mut R) -> Cost {
    let mean = cost * spec.bias;
    if spec.relative_std_dev == 0.0 {
        return cost + mean;
    }

    let z: f64 = rng.sample(StandardNormal);
    cost + mean + cost * spec.relative_std_dev * z
}
