//! A small integer-linear-programming engine: bounded integer variables,
//! equality constraints, maximization.
//!
//! The engine is a classic two-phase bounded-variable simplex
//! ([`simplex`]) under a depth-first branch-and-bound driver ([`branch`]).
//! It is dimensioned for the placement models this crate produces: a few
//! hundred columns, a few dozen rows, LP relaxations that are usually
//! integral or nearly so.
//!
//! ```
//! use rummikub::ilp::{Problem, SolveOptions};
//!
//! // maximize x + y  s.t.  x + y = 3,  0 <= x <= 2,  0 <= y <= 2
//! let mut prob = Problem::maximize();
//! let x = prob.add_integer(0.0, 2.0, 1.0);
//! let y = prob.add_integer(0.0, 2.0, 1.0);
//! prob.add_equality(vec![(x, 1.0), (y, 1.0)], 3.0);
//! let solution = prob.solve(&SolveOptions::default()).unwrap();
//! assert_eq!(solution.objective.round() as i64, 3);
//! ```

mod branch;
mod simplex;

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

/// Opaque handle to a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) struct VarDef {
    pub objective: f64,
    pub lower: f64,
    pub upper: f64,
    pub integer: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EqConstraint {
    pub terms: Vec<(VarId, f64)>,
    pub rhs: f64,
}

/// Why a solve failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IlpError {
    /// No assignment satisfies the constraints within the variable bounds.
    Infeasible,
    /// The relaxation is unbounded (cannot occur with finite bounds).
    Unbounded,
    /// The cancellation flag was raised.
    Cancelled,
    /// The deadline expired before any feasible integer solution was found.
    DeadlineExpired,
    /// The simplex hit its iteration cap; the model is numerically hostile.
    NumericalStall,
}

impl fmt::Display for IlpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            IlpError::Infeasible => "model is infeasible",
            IlpError::Unbounded => "relaxation is unbounded",
            IlpError::Cancelled => "solve cancelled",
            IlpError::DeadlineExpired => "deadline expired before a feasible solution was found",
            IlpError::NumericalStall => "simplex iteration cap exceeded",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for IlpError {}

/// Knobs for a single solve call.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Stop exploring at this instant and return the incumbent.
    pub deadline: Option<Instant>,
    /// Cooperative cancellation; checked once per node.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Known-feasible starting point (bounds, integrality and constraints
    /// are verified before it is trusted).
    pub incumbent: Option<Vec<f64>>,
    /// Hard cap on explored nodes; 0 means the default.
    pub node_limit: usize,
}

/// A feasible integer assignment.
#[derive(Debug, Clone)]
pub struct Solution {
    /// One value per variable, in [`VarId`] order. Integer variables hold
    /// exactly integral values.
    pub values: Vec<f64>,
    /// Objective value of `values`.
    pub objective: f64,
    /// False when a deadline or node limit stopped the search before the
    /// tree was exhausted; the solution is feasible but possibly improvable.
    pub proven_optimal: bool,
}

/// A maximization problem over bounded variables with equality constraints.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    vars: Vec<VarDef>,
    constraints: Vec<EqConstraint>,
}

impl Problem {
    /// A fresh maximization problem.
    pub fn maximize() -> Self {
        Problem::default()
    }

    /// Add an integer variable with inclusive bounds and an objective
    /// coefficient. Returns its handle.
    pub fn add_integer(&mut self, lower: f64, upper: f64, objective: f64) -> VarId {
        debug_assert!(lower <= upper, "variable bounds inverted: [{lower}, {upper}]");
        let id = VarId(self.vars.len());
        self.vars.push(VarDef {
            objective,
            lower,
            upper,
            integer: true,
        });
        id
    }

    /// Add a continuous variable. Used by the engine's own tests; the game
    /// models are all-integer.
    pub fn add_continuous(&mut self, lower: f64, upper: f64, objective: f64) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(VarDef {
            objective,
            lower,
            upper,
            integer: false,
        });
        id
    }

    /// Constrain `sum(coeff * var) == rhs`.
    pub fn add_equality(&mut self, terms: Vec<(VarId, f64)>, rhs: f64) {
        self.constraints.push(EqConstraint { terms, rhs });
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub(crate) fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub(crate) fn constraints(&self) -> &[EqConstraint] {
        &self.constraints
    }

    /// Objective value of an assignment.
    pub fn objective_of(&self, values: &[f64]) -> f64 {
        self.vars
            .iter()
            .zip(values)
            .map(|(v, x)| v.objective * x)
            .sum()
    }

    /// Run branch and bound. Always returns the best feasible integer
    /// assignment found; see [`SolveOptions`] for deadline and cancellation
    /// behavior.
    pub fn solve(&self, options: &SolveOptions) -> Result<Solution, IlpError> {
        branch::solve(self, options)
    }
}
