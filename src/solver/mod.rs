//! Solver abstraction over an external MILP backend.
//!
//! Rules and the optimization engine only talk to the [`Solver`] trait. A
//! solver instance owns one model: variables, linear constraints and a
//! maximize objective. [`Solver::copy`] hands out an independent model that
//! already contains everything registered so far, which is how the engine
//! layers per-iteration constraints on top of a shared base model.

mod backend;

pub use backend::GoodLpSolver;

use thiserror::Error;


/// Handle to a variable registered in a solver model.
///
/// Handles are only meaningful for the model that created them and for
/// copies of that model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(usize);

impl Variable {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the variable in its model.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Relational sign of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Eq,
    NotEq,
    Lte,
    Gte,
}

/// Errors raised by a solver backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Variable {name} already exists in the model")]
    DuplicateVariable { name: String },

    #[error("No feasible solution (violated constraints: [{}])", .constraints.join(", "))]
    Infeasible { constraints: Vec<String> },

    #[error("Solver backend failed: {message}")]
    Backend { message: String },
}

/// Uniform interface over a MILP backend.
pub trait Solver {
    /// Reset to an empty model.
    fn setup(&mut self);

    /// Register a variable.
    ///
    /// Without bounds the variable is binary; with any bound given it is an
    /// integer variable (missing lower bound defaults to 0, missing upper
    /// bound means unbounded).
    fn add_variable(
        &mut self,
        name: &str,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Result<Variable, SolverError>;

    /// Install the maximize objective, replacing any previous one.
    fn set_objective(&mut self, variables: &[Variable], coefficients: &[f64]);

    /// Add `sum(coefficient * variable) <sign> rhs`.
    ///
    /// Without coefficients every variable gets weight 1.
    fn add_constraint(
        &mut self,
        variables: &[Variable],
        coefficients: Option<&[f64]>,
        sign: Sign,
        rhs: f64,
        name: Option<&str>,
    );

    /// Solve the model and return the variables whose value rounds to >= 1.
    fn solve(&self) -> Result<Vec<Variable>, SolverError>;

    /// Independent copy of the model registered so far.
    fn copy(&self) -> Self
    where
        Self: Sized;

    /// Name a variable was registered with.
    fn variable_name(&self, variable: Variable) -> Option<&str>;
}
