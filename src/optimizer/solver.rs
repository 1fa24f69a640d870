//! LP solver seam
//!
//! The scheduler only talks to [`LpSolver`]. Back ends translate a
//! [`LinearProgram`] into their own model; the `good_lp` adapter covers every
//! solver `good_lp` can drive.

use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, Solver,
    SolverModel, Variable,
};
use thiserror::Error;

use super::constraints::{LinearConstraint, LinearProgram};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("problem is infeasible")]
    Infeasible,

    #[error("problem is unbounded")]
    Unbounded,

    #[error("solver back end failed: {0}")]
    Backend(String),
}

impl From<ResolutionError> for SolverError {
    fn from(error: ResolutionError) -> Self {
        match error {
            ResolutionError::Infeasible => SolverError::Infeasible,
            ResolutionError::Unbounded => SolverError::Unbounded,
            other => SolverError::Backend(other.to_string()),
        }
    }
}

/// Optimal point returned by a back end.
#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    /// One value per program column
    pub values: Vec<f64>,
    pub objective: f64,
    pub status: String,
}

/// Pluggable LP capability: linear objective, ≤ and = rows, column bounds in;
/// solution vector, status and objective value out.
pub trait LpSolver: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, program: &LinearProgram) -> Result<LpSolution, SolverError>;
}

/// Adapter driving any `good_lp` solver function.
#[derive(Debug, Clone, Copy)]
pub struct GoodLpBackend<S> {
    name: &'static str,
    solver: S,
}

impl<S> GoodLpBackend<S> {
    pub const fn new(name: &'static str, solver: S) -> Self {
        Self { name, solver }
    }
}

/// Pure-Rust dense simplex. Deterministic for a fixed program.
pub fn microlp_backend() -> impl LpSolver + Clone {
    GoodLpBackend::new("microlp", good_lp::microlp)
}

/// Interior-point back end.
#[cfg(feature = "clarabel")]
pub fn clarabel_backend() -> impl LpSolver + Clone {
    GoodLpBackend::new("clarabel", good_lp::clarabel)
}

fn row_expression(row: &LinearConstraint, columns: &[Variable]) -> Expression {
    row.coefficients
        .iter()
        .map(|&(j, a)| a * columns[j])
        .sum()
}

impl<S> LpSolver for GoodLpBackend<S>
where
    S: Solver + Clone + Send + Sync,
    S::Model: SolverModel<Error = ResolutionError>,
{
    fn name(&self) -> &str {
        self.name
    }

    fn solve(&self, program: &LinearProgram) -> Result<LpSolution, SolverError> {
        let mut vars = ProblemVariables::new();
        let columns: Vec<Variable> = program
            .bounds
            .iter()
            .map(|b| {
                let definition = variable().min(b.lower);
                match b.upper {
                    Some(upper) => vars.add(definition.max(upper)),
                    None => vars.add(definition),
                }
            })
            .collect();

        let objective: Expression = program
            .objective
            .iter()
            .zip(&columns)
            .filter(|(c, _)| **c != 0.0)
            .map(|(&c, &v)| c * v)
            .sum();

        let mut model = vars.minimise(objective).using(self.solver.clone());

        for row in &program.inequalities {
            let lhs = row_expression(row, &columns);
            model = model.with(constraint!(lhs <= row.rhs));
        }
        for row in &program.equalities {
            let lhs = row_expression(row, &columns);
            model = model.with(constraint!(lhs == row.rhs));
        }

        let solution = model.solve()?;

        let values: Vec<f64> = columns.iter().map(|&v| solution.value(v)).collect();
        let objective = program.objective_value(&values);

        Ok(LpSolution {
            values,
            objective,
            status: format!("{}: optimal", self.name),
        })
    }
}
