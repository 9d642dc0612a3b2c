use super::sets_and_parameters::{Parameters, Sets};
use crate::models::milp::{Milp, VarId};
use crate::models::utils::AddVars;
use crate::problem::Problem;
use derive_more::Constructor;
use itertools::iproduct;
use log::trace;

/// Decision variables of the plant location model
#[derive(Debug, Constructor)]
pub struct Variables {
    /// Quantity produced at location i for the demand of location j
    pub x: Vec<Vec<VarId>>,
    /// 1 if a plant of size s is built at location i, 0 otherwise
    pub y: Vec<Vec<VarId>>,
}

pub struct PlantLocationModel {}

#[allow(non_snake_case)]
impl PlantLocationModel {
    /// Builds one instance of the capacitated plant location model from the
    /// sampled parameters of a trial.
    ///
    /// Row names are the stable constraint identifiers the solution is later
    /// keyed by: `demand_<location>` for the demand balances and
    /// `capacity_<location>` for the capacity bounds.
    pub fn build(problem: &Problem, parameters: &Parameters) -> (Milp, Variables) {
        trace!("building plant location model");

        let sets = Sets::new(problem);
        let (L, S) = (&sets.L, &sets.S);

        let mut model = Milp::new("capacitated_plant_location");

        //*************CREATE VARIABLES*************//

        // quantity produced at location i for the demand of location j,
        // including local production for local demand
        let x = (L.len(), L.len()).cont(&mut model, "production");

        // whether a plant of size s is built at location i
        let y = (L.len(), S.len()).binary(&mut model, "plant");

        // ******************** OBJECTIVE ********************

        // sampled fixed costs of every built plant plus sampled transport
        // cost of every flow
        model.set_objective(
            iproduct!(L, S)
                .map(|(i, s)| (y[*i][*s], parameters.F[*i][*s]))
                .chain(iproduct!(L, L).map(|(i, j)| (x[*i][*j], parameters.C[*i][*j]))),
        );

        // ******************** ADD CONSTRAINTS ********************

        // production must meet demand exactly at every location
        for j in L {
            let lhs = L.iter().map(|i| (x[*i][*j], 1.0)).collect();
            let rhs = parameters.D[*j];
            model.add_constr(format!("demand_{}", problem.locations()[*j]), lhs, rhs, rhs);
        }

        // total outbound production is bounded by the capacity built at the
        // site; building both sizes at once is allowed and their capacities
        // add up
        for i in L {
            let lhs = L
                .iter()
                .map(|j| (x[*i][*j], 1.0))
                .chain(S.iter().map(|s| (y[*i][*s], -parameters.Q[*i][*s])))
                .collect();
            model.add_constr(
                format!("capacity_{}", problem.locations()[*i]),
                lhs,
                f64::NEG_INFINITY,
                0.0,
            );
        }

        (model, Variables::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::milp::VarKind;
    use crate::problem::{PerturbationSpec, Table};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn problem() -> Problem {
        let fix = Table::new(
            vec!["A".into(), "B".into()],
            vec!["low_cap".into(), "high_cap".into()],
            vec![vec![1000.0, 1600.0], vec![1000.0, 1600.0]],
        );
        let var = Table::new(
            vec!["A".into(), "B".into()],
            vec!["A".into(), "B".into()],
            vec![vec![1.0, 10.0], vec![10.0, 1.0]],
        );
        let demand = Table::new(
            vec!["A".into(), "B".into()],
            vec!["Dmd".into()],
            vec![vec![100.0], vec![50.0]],
        );
        let cap = Table::new(
            vec!["A".into(), "B".into()],
            vec!["low_cap".into(), "high_cap".into()],
            vec![vec![80.0, 200.0], vec![80.0, 200.0]],
        );
        Problem::new(&fix, &var, &demand, &cap).unwrap()
    }

    fn parameters(problem: &Problem) -> Parameters {
        let spec = PerturbationSpec::new(1.0, 0.0);
        Parameters::sample(problem, &spec, &spec, &mut StdRng::seed_from_u64(0))
    }

    #[test]
    fn one_demand_and_one_capacity_row_per_location() {
        let problem = problem();
        let (model, variables) = PlantLocationModel::build(&problem, &parameters(&problem));

        let names: Vec<&str> = model.rows().iter().map(|row| row.name.as_str()).collect();
        assert_eq!(
            names,
            ["demand_A", "demand_B", "capacity_A", "capacity_B"]
        );

        // |L|^2 flows and |L|*|S| site binaries
        assert_eq!(variables.x.len(), 2);
        assert_eq!(variables.y.len(), 2);
        assert_eq!(model.variables().len(), 4 + 4);
        assert_eq!(
            model
                .variables()
                .iter()
                .filter(|v| v.kind == VarKind::Continuous)
                .count(),
            4
        );
    }

    #[test]
    fn demand_rows_are_equalities_on_inbound_flow() {
        let problem = problem();
        let (model, variables) = PlantLocationModel::build(&problem, &parameters(&problem));

        let row = &model.rows()[1]; // demand_B
        assert_eq!(row.lower, 50.0);
        assert_eq!(row.upper, 50.0);

        let mut vars: Vec<VarId> = row.coefficients.iter().map(|(v, _)| *v).collect();
        vars.sort_unstable();
        assert_eq!(vars, vec![variables.x[0][1], variables.x[1][1]]);
        assert!(row.coefficients.iter().all(|(_, c)| *c == 1.0));
    }

    #[test]
    fn capacity_rows_weigh_sites_by_their_capacity() {
        let problem = problem();
        let (model, variables) = PlantLocationModel::build(&problem, &parameters(&problem));

        let row = &model.rows()[2]; // capacity_A
        assert_eq!(row.upper, 0.0);
        assert_eq!(row.lower, f64::NEG_INFINITY);

        let coefficient = |var: VarId| {
            row.coefficients
                .iter()
                .find(|(v, _)| *v == var)
                .map(|(_, c)| *c)
        };
        assert_eq!(coefficient(variables.x[0][0]), Some(1.0));
        assert_eq!(coefficient(variables.x[0][1]), Some(1.0));
        assert_eq!(coefficient(variables.y[0][0]), Some(-80.0));
        assert_eq!(coefficient(variables.y[0][1]), Some(-200.0));
        assert_eq!(coefficient(variables.x[1][0]), None);
    }

    #[test]
    fn zero_noise_builds_are_identical() {
        let problem = problem();
        let spec = PerturbationSpec::new(1.0, 0.0);

        let a = Parameters::sample(&problem, &spec, &spec, &mut StdRng::seed_from_u64(1));
        let b = Parameters::sample(&problem, &spec, &spec, &mut StdRng::seed_from_u64(2));
        let (first, _) = PlantLocationModel::build(&problem, &a);
        let (second, _) = PlantLocationModel::build(&problem, &b);

        let coefficients = |model: &Milp| -> Vec<f64> {
            model.variables().iter().map(|v| v.objective).collect()
        };
        assert_eq!(coefficients(&first), coefficients(&second));
    }
}
