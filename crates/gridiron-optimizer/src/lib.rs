// Lineup optimizer: compiles the slate into a binary program and searches
// for a diverse set of high-projection lineups.

pub mod config;
pub mod model;
pub mod search;
pub mod solver;

pub use config::OptimizerConfig;
pub use model::CompiledModel;
pub use search::{best_lineup, optimize, perturbed_projections, Optimizer, OptimizerOutcome};
pub use solver::{HighsSolver, LineupProblem, LineupSolver, LinearConstraint, SolveStatus};
