//! `good_lp` implementation of the solver contract.
//!
//! The model is kept in a backend-independent form so that `copy()` is a
//! plain clone; it is translated into a `good_lp` problem solved by the
//! pure-Rust microlp solver on every `solve()`.

use std::collections::HashMap;

use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
};

use super::{Sign, Solver, SolverError, Variable};

/// Bound used for big-M terms when a variable has no finite upper bound.
const UNBOUNDED_M: f64 = 1_000_000.0;

/// Values within this distance of a bound count as satisfying it.
const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
struct VariableDef {
    name: String,
    lower: f64,
    upper: f64,
}

#[derive(Debug, Clone)]
struct ConstraintDef {
    terms: Vec<(Variable, f64)>,
    sign: Sign,
    rhs: f64,
    name: Option<String>,
}

/// MILP solver backed by `good_lp`.
#[derive(Debug, Default, Clone)]
pub struct GoodLpSolver {
    variables: Vec<VariableDef>,
    names: HashMap<String, Variable>,
    constraints: Vec<ConstraintDef>,
    objective: Vec<(Variable, f64)>,
}

impl GoodLpSolver {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered variables.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of registered constraints.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Smallest and largest value a linear expression can take given the
    /// variable bounds.
    fn expression_range(&self, terms: &[(Variable, f64)]) -> (f64, f64) {
        terms.iter().fold((0.0, 0.0), |(low, high), (var, coef)| {
            let def = &self.variables[var.index()];
            let upper = if def.upper.is_finite() {
                def.upper
            } else {
                UNBOUNDED_M
            };
            let (a, b) = (coef * def.lower, coef * upper);
            (low + a.min(b), high + a.max(b))
        })
    }

    /// Whether a constraint can hold at all given only variable bounds.
    fn satisfiable(&self, def: &ConstraintDef) -> bool {
        let (low, high) = self.expression_range(&def.terms);
        match def.sign {
            Sign::Eq => low <= def.rhs + TOLERANCE && def.rhs - TOLERANCE <= high,
            Sign::Lte => low <= def.rhs + TOLERANCE,
            Sign::Gte => high >= def.rhs - TOLERANCE,
            Sign::NotEq => (high - low).abs() > TOLERANCE || (low - def.rhs).abs() > TOLERANCE,
        }
    }

    /// Names of constraints that are unsatisfiable on their own.
    fn isolated_violations(&self) -> Vec<String> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, def)| !self.satisfiable(def))
            .map(|(i, def)| def.name.clone().unwrap_or_else(|| format!("constraint_{i}")))
            .collect()
    }
}

impl Solver for GoodLpSolver {
    fn setup(&mut self) {
        *self = Self::default();
    }

    fn add_variable(
        &mut self,
        name: &str,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Result<Variable, SolverError> {
        if self.names.contains_key(name) {
            return Err(SolverError::DuplicateVariable {
                name: name.to_string(),
            });
        }
        let (lower, upper) = match (min, max) {
            (None, None) => (0.0, 1.0),
            (lo, hi) => (
                lo.unwrap_or(0) as f64,
                hi.map(|v| v as f64).unwrap_or(f64::INFINITY),
            ),
        };
        let var = Variable::new(self.variables.len());
        self.variables.push(VariableDef {
            name: name.to_string(),
            lower,
            upper,
        });
        self.names.insert(name.to_string(), var);
        Ok(var)
    }

    fn set_objective(&mut self, variables: &[Variable], coefficients: &[f64]) {
        self.objective = variables
            .iter()
            .copied()
            .zip(coefficients.iter().copied())
            .collect();
    }

    fn add_constraint(
        &mut self,
        variables: &[Variable],
        coefficients: Option<&[f64]>,
        sign: Sign,
        rhs: f64,
        name: Option<&str>,
    ) {
        let terms = match coefficients {
            Some(coefs) => variables
                .iter()
                .copied()
                .zip(coefs.iter().copied())
                .collect(),
            None => variables.iter().map(|v| (*v, 1.0)).collect(),
        };
        self.constraints.push(ConstraintDef {
            terms,
            sign,
            rhs,
            name: name.map(str::to_string),
        });
    }

    fn solve(&self) -> Result<Vec<Variable>, SolverError> {
        let violations = self.isolated_violations();
        if !violations.is_empty() {
            return Err(SolverError::Infeasible {
                constraints: violations,
            });
        }
        if self.variables.is_empty() {
            return Ok(Vec::new());
        }

        let mut problem = ProblemVariables::new();
        let lp_vars: Vec<_> = self
            .variables
            .iter()
            .map(|def| {
                let mut v = variable().integer().min(def.lower);
                if def.upper.is_finite() {
                    v = v.max(def.upper);
                }
                problem.add(v)
            })
            .collect();
        // One switch per NEQ constraint: 0 selects the `<` branch, 1 the `>` branch.
        let switches: Vec<_> = self
            .constraints
            .iter()
            .filter(|c| c.sign == Sign::NotEq && !c.terms.is_empty())
            .map(|_| problem.add(variable().binary()))
            .collect();

        let objective: Expression = self
            .objective
            .iter()
            .map(|(v, c)| *c * lp_vars[v.index()])
            .sum();
        let mut model = problem.maximise(objective).using(microlp);

        let mut switches = switches.into_iter();
        for def in self.constraints.iter().filter(|c| !c.terms.is_empty()) {
            let lhs: Expression = def
                .terms
                .iter()
                .map(|(v, c)| *c * lp_vars[v.index()])
                .sum();
            let rhs = def.rhs;
            model = match def.sign {
                Sign::Eq => model.with(constraint!(lhs == rhs)),
                Sign::Lte => model.with(constraint!(lhs <= rhs)),
                Sign::Gte => model.with(constraint!(lhs >= rhs)),
                Sign::NotEq => {
                    let Some(switch) = switches.next() else {
                        return Err(SolverError::Backend {
                            message: "missing switch variable for NEQ constraint".to_string(),
                        });
                    };
                    let (low, high) = self.expression_range(&def.terms);
                    let upper_m = (high - rhs + 1.0).max(0.0);
                    let lower_m = (rhs + 1.0 - low).max(0.0);
                    // switch = 0: lhs <= rhs - 1, switch = 1: lhs >= rhs + 1
                    let below: Expression = lhs.clone() - upper_m * switch;
                    let above: Expression = lhs - lower_m * switch;
                    model
                        .with(constraint!(below <= rhs - 1.0))
                        .with(constraint!(above >= rhs + 1.0 - lower_m))
                }
            };
        }

        match model.solve() {
            Ok(solution) => Ok(lp_vars
                .iter()
                .enumerate()
                .filter(|(_, v)| solution.value(**v).round() >= 1.0)
                .map(|(i, _)| Variable::new(i))
                .collect()),
            Err(ResolutionError::Infeasible) => Err(SolverError::Infeasible {
                constraints: Vec::new(),
            }),
            Err(err) => Err(SolverError::Backend {
                message: err.to_string(),
            }),
        }
    }

    fn copy(&self) -> Self {
        self.clone()
    }

    fn variable_name(&self, variable: Variable) -> Option<&str> {
        self.variables
            .get(variable.index())
            .map(|def| def.name.as_str())
    }
}
