// Binary program representation and the solver seam.
//
// The search layer builds a `LineupProblem` per solve and hands it to a
// `LineupSolver`. HiGHS (through good_lp) is the production backend.

use good_lp::solvers::highs::highs;
use good_lp::{constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel};
use gridiron_core::{Error, Result};

// ---------------------------------------------------------------------------
// Problem types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    LessEqual,
    GreaterEqual,
    Equal,
}

/// A sparse linear constraint over binary variables: `Σ coef·x  sense  rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub terms: Vec<(usize, f64)>,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn leq(terms: Vec<(usize, f64)>, rhs: f64) -> Self {
        LinearConstraint {
            terms,
            sense: ConstraintSense::LessEqual,
            rhs,
        }
    }

    pub fn geq(terms: Vec<(usize, f64)>, rhs: f64) -> Self {
        LinearConstraint {
            terms,
            sense: ConstraintSense::GreaterEqual,
            rhs,
        }
    }

    pub fn eq(terms: Vec<(usize, f64)>, rhs: f64) -> Self {
        LinearConstraint {
            terms,
            sense: ConstraintSense::Equal,
            rhs,
        }
    }

    /// Sum of unit coefficients over `vars`.
    pub fn count(vars: impl IntoIterator<Item = usize>) -> Vec<(usize, f64)> {
        vars.into_iter().map(|v| (v, 1.0)).collect()
    }

    /// Whether a 0/1 assignment satisfies this constraint.
    pub fn is_satisfied_by(&self, selected: &[bool]) -> bool {
        let lhs: f64 = self
            .terms
            .iter()
            .filter(|(v, _)| selected.get(*v).copied().unwrap_or(false))
            .map(|(_, c)| c)
            .sum();
        const EPS: f64 = 1e-6;
        match self.sense {
            ConstraintSense::LessEqual => lhs <= self.rhs + EPS,
            ConstraintSense::GreaterEqual => lhs >= self.rhs - EPS,
            ConstraintSense::Equal => (lhs - self.rhs).abs() <= EPS,
        }
    }
}

/// Maximize `objective · x` over `x ∈ {0,1}^n` subject to `constraints`.
#[derive(Debug, Clone, PartialEq)]
pub struct LineupProblem {
    pub objective: Vec<f64>,
    pub constraints: Vec<LinearConstraint>,
}

impl LineupProblem {
    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    /// Indices of the variables set to 1.
    Optimal(Vec<usize>),
    Infeasible,
}

// ---------------------------------------------------------------------------
// Solver trait
// ---------------------------------------------------------------------------

/// A 0/1 program solver. Implementations must be shareable across the
/// worker threads of a wave.
pub trait LineupSolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, problem: &LineupProblem) -> Result<SolveStatus>;
}

// ---------------------------------------------------------------------------
// HiGHS backend
// ---------------------------------------------------------------------------

/// HiGHS-based solver via good_lp.
#[derive(Debug, Default, Clone)]
pub struct HighsSolver;

impl HighsSolver {
    pub fn new() -> Self {
        Self
    }
}

impl LineupSolver for HighsSolver {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn solve(&self, problem: &LineupProblem) -> Result<SolveStatus> {
        let n = problem.num_vars();
        if n == 0 {
            return Ok(SolveStatus::Infeasible);
        }

        let mut vars = variables!();
        let var_list: Vec<_> = (0..n).map(|_| vars.add(variable().binary())).collect();

        let objective: Expression = var_list
            .iter()
            .zip(problem.objective.iter())
            .map(|(v, c)| *c * *v)
            .sum();

        let mut model = vars.maximise(&objective).using(highs);

        for constr in &problem.constraints {
            let lhs: Expression = constr
                .terms
                .iter()
                .map(|(i, c)| *c * var_list[*i])
                .sum();
            let rhs = constr.rhs;
            model = match constr.sense {
                ConstraintSense::LessEqual => model.with(constraint!(lhs <= rhs)),
                ConstraintSense::GreaterEqual => model.with(constraint!(lhs >= rhs)),
                ConstraintSense::Equal => model.with(constraint!(lhs == rhs)),
            };
        }

        match model.solve() {
            Ok(solution) => Ok(SolveStatus::Optimal(
                var_list
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| solution.value(**v) > 0.5)
                    .map(|(i, _)| i)
                    .collect(),
            )),
            // Bounded binaries cannot be unbounded; presolve reports
            // "unbounded or infeasible" for some empty feasible regions.
            Err(ResolutionError::Infeasible | ResolutionError::Unbounded) => {
                Ok(SolveStatus::Infeasible)
            }
            Err(e) => Err(Error::Solver(e.to_string())),
        }
    }
}
