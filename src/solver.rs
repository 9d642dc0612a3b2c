use derive_more::Display;
use highs::{Col, HighsModelStatus, RowProblem, Sense};
use log::{debug, trace};

use crate::models::milp::{Milp, VarKind};

/// Outcome of handing a model to the solving engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SolveStatus {
    /// A proven optimal solution was found
    Optimal,
    /// No feasible assignment exists
    Infeasible,
    /// The objective is unbounded below
    Unbounded,
    /// The engine gave up: time limit, iteration limit or numerical trouble
    SolverFailure,
}

/// Primal solution and LP sensitivity values of an optimal solve
#[derive(Debug, Clone)]
pub struct EngineSolution {
    /// Objective value at the optimal assignment
    pub objective: f64,
    /// Value of every variable, indexed by `VarId`
    pub assignment: Vec<f64>,
    /// Dual price of every row, indexed by `RowId`
    pub duals: Vec<f64>,
    /// Slack of every row, indexed by `RowId`
    pub slacks: Vec<f64>,
}

/// What came back from the engine: a status, and a solution iff the status
/// is [`SolveStatus::Optimal`].
#[derive(Debug, Clone)]
pub struct Solved {
    pub status: SolveStatus,
    pub solution: Option<EngineSolution>,
}

impl Solved {
    fn status_only(status: SolveStatus) -> Solved {
        Solved {
            status,
            solution: None,
        }
    }
}

/// The boundary to the mixed-integer linear solving engine. Any engine that
/// can solve a [`Milp`] and report per-row duals and slacks on optimal
/// termination satisfies the contract.
pub trait MilpSolve {
    fn solve(&self, model: &Milp) -> Solved;
}

/// Adapter to the HiGHS engine.
///
/// HiGHS reports no dual information at MIP termination, so after an optimal
/// solve the adapter re-solves the LP with every binary clamped to its
/// incumbent value and reads duals and slacks from that relaxation. These
/// are the LP sensitivity values at the active binary assignment; duals of
/// rows that bind a clamped binary can be degenerate.
#[derive(Debug, Clone, Default)]
pub struct Highs {
    /// Wall clock limit per solve, in seconds
    time_limit: Option<f64>,
}

impl Highs {
    pub fn new() -> Highs {
        Highs { time_limit: None }
    }

    pub fn with_time_limit(seconds: f64) -> Highs {
        Highs {
            time_limit: Some(seconds),
        }
    }

    /// Translates the model into the engine and optimizes it. With `clamp`
    /// given, binaries become fixed continuous columns at their clamped
    /// value, turning the model into the LP used for sensitivity values.
    fn optimise(&self, milp: &Milp, clamp: Option<&[f64]>) -> highs::SolvedModel {
        let mut problem = RowProblem::new();

        let columns: Vec<Col> = milp
            .variables()
            .iter()
            .enumerate()
            .map(|(id, variable)| match (variable.kind, clamp) {
                (VarKind::Binary, Some(assignment)) => {
                    let value = assignment[id].round();
                    problem.add_column(variable.objective, value..=value)
                }
                (VarKind::Binary, None) => {
                    problem.add_integer_column(variable.objective, variable.lower..=variable.upper)
                }
                (VarKind::Continuous, _) => {
                    problem.add_column(variable.objective, variable.lower..=variable.upper)
                }
            })
            .collect();

        for row in milp.rows() {
            let factors: Vec<(Col, f64)> = row
                .coefficients
                .iter()
                .map(|(var, coefficient)| (columns[*var], *coefficient))
                .collect();
            problem.add_row(row.lower..=row.upper, factors);
        }

        let mut model = problem.optimise(Sense::Minimise);
        model.set_option("output_flag", false);
        model.set_option("threads", 1);
        if let Some(limit) = self.time_limit {
            model.set_option("time_limit", limit);
        }

        model.solve()
    }
}

impl MilpSolve for Highs {
    fn solve(&self, milp: &Milp) -> Solved {
        trace!("solving {}", milp.name());

        let solved = self.optimise(milp, None);
        let status = convert_status(solved.status());
        if status != SolveStatus::Optimal {
            debug!("{} terminated {}", milp.name(), status);
            return Solved::status_only(status);
        }

        let assignment = solved.get_solution().columns().to_vec();

        // Re-solve the LP with the binaries fixed for duals and slacks. The
        // incumbent stays feasible and optimal for it, so anything but an
        // optimal termination here is an engine failure.
        let relaxation = self.optimise(milp, Some(&assignment));
        if convert_status(relaxation.status()) != SolveStatus::Optimal {
            debug!("{}: sensitivity re-solve failed", milp.name());
            return Solved::status_only(SolveStatus::SolverFailure);
        }

        let sensitivity = relaxation.get_solution();
        let duals = sensitivity.dual_rows().to_vec();
        let slacks = milp
            .rows()
            .iter()
            .zip(sensitivity.rows())
            .map(|(row, activity)| {
                if row.upper.is_finite() {
                    row.upper - activity
                } else {
                    activity - row.lower
                }
            })
            .collect();

        Solved {
            status: SolveStatus::Optimal,
            solution: Some(EngineSolution {
                objective: milp.objective_value(&assignment),
                assignment,
                duals,
                slacks,
            }),
        }
    }
}

fn convert_status(status: HighsModelStatus) -> SolveStatus {
    match status {
        HighsModelStatus::Optimal => SolveStatus::Optimal,
        HighsModelStatus::Infeasible => SolveStatus::Infeasible,
        // this formulation cannot be unbounded, so the combined status can
        // only mean infeasible here
        HighsModelStatus::UnboundedOrInfeasible => SolveStatus::Infeasible,
        HighsModelStatus::Unbounded => SolveStatus::Unbounded,
        _ => SolveStatus::SolverFailure,
    }
}
