//! Depth-first branch and bound over the LP relaxation.
//!
//! Each node is a box of variable bounds. The LP relaxation provides the
//! pruning bound; fractional integer variables are branched on floor/ceil.
//! An optional incumbent seeds the search so a deadline can always fall
//! back to a known-feasible answer.

use std::time::Instant;

use log::debug;

use super::simplex::{self, LpOutcome};
use super::{IlpError, Problem, Solution, SolveOptions};

/// Integrality tolerance: values this close to an integer count as integral.
const INT_TOL: f64 = 1e-6;
/// A node whose LP bound does not beat the incumbent by more than this is cut.
const BOUND_EPS: f64 = 1e-6;
/// Default cap on explored nodes.
const DEFAULT_NODE_LIMIT: usize = 100_000;

struct Node {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

pub(crate) fn solve(problem: &Problem, options: &SolveOptions) -> Result<Solution, IlpError> {
    let n = problem.num_vars();
    let m = problem.num_constraints();

    // Dense constraint matrix; repeated terms on one variable accumulate.
    let mut rows = vec![vec![0.0; n]; m];
    let mut rhs = vec![0.0; m];
    for (i, con) in problem.constraints().iter().enumerate() {
        for (var, coeff) in &con.terms {
            rows[i][var.0] += coeff;
        }
        rhs[i] = con.rhs;
    }

    let objective: Vec<f64> = problem.vars().iter().map(|v| v.objective).collect();
    let root_lower: Vec<f64> = problem.vars().iter().map(|v| v.lower).collect();
    let root_upper: Vec<f64> = problem.vars().iter().map(|v| v.upper).collect();

    let mut best: Option<(f64, Vec<f64>)> = options
        .incumbent
        .as_ref()
        .filter(|x| is_feasible(problem, &rows, &rhs, x))
        .map(|x| (problem.objective_of(x), x.clone()));

    let node_limit = if options.node_limit == 0 {
        DEFAULT_NODE_LIMIT
    } else {
        options.node_limit
    };

    let mut stack = vec![Node {
        lower: root_lower,
        upper: root_upper,
    }];
    let mut nodes = 0usize;
    let mut exhausted = true;

    while let Some(node) = stack.pop() {
        if let Some(cancel) = &options.cancel {
            if cancel.load(std::sync::atomic::Ordering::Relaxed) {
                return Err(IlpError::Cancelled);
            }
        }
        if let Some(deadline) = options.deadline {
            if Instant::now() >= deadline {
                exhausted = false;
                break;
            }
        }
        if nodes >= node_limit {
            exhausted = false;
            break;
        }
        nodes += 1;

        let outcome = simplex::solve(&rows, &rhs, &objective, &node.lower, &node.upper)
            .map_err(|_| IlpError::NumericalStall)?;
        let (values, bound) = match outcome {
            LpOutcome::Infeasible => continue,
            LpOutcome::Unbounded => return Err(IlpError::Unbounded),
            LpOutcome::Optimal { values, objective } => (values, objective),
        };

        if let Some((best_obj, _)) = &best {
            if bound <= best_obj + BOUND_EPS {
                continue;
            }
        }

        match most_fractional(problem, &values) {
            None => {
                // Integral relaxation: snap and record.
                let snapped = snap(problem, &values);
                let obj = problem.objective_of(&snapped);
                if best.as_ref().map_or(true, |(b, _)| obj > b + BOUND_EPS) {
                    best = Some((obj, snapped));
                }
            }
            Some((j, v)) => {
                let mut down = Node {
                    lower: node.lower.clone(),
                    upper: node.upper.clone(),
                };
                down.upper[j] = v.floor();
                let mut up = node;
                up.lower[j] = v.ceil();

                // Pop order: explore the side the relaxation leans toward
                // first.
                if v - v.floor() >= 0.5 {
                    stack.push(down);
                    stack.push(up);
                } else {
                    stack.push(up);
                    stack.push(down);
                }
            }
        }
    }

    debug!(
        "branch and bound finished: {} nodes, exhausted={}, best={:?}",
        nodes,
        exhausted,
        best.as_ref().map(|(obj, _)| obj)
    );

    match best {
        Some((objective, values)) => Ok(Solution {
            values,
            objective,
            proven_optimal: exhausted,
        }),
        None if exhausted => Err(IlpError::Infeasible),
        None => Err(IlpError::DeadlineExpired),
    }
}

/// The integer variable whose relaxed value is farthest from an integer,
/// with its value. `None` means the relaxation is integral.
fn most_fractional(problem: &Problem, values: &[f64]) -> Option<(usize, f64)> {
    let mut pick: Option<(usize, f64, f64)> = None;
    for (j, def) in problem.vars().iter().enumerate() {
        if !def.integer {
            continue;
        }
        let frac = values[j] - values[j].floor();
        if frac <= INT_TOL || frac >= 1.0 - INT_TOL {
            continue;
        }
        let distance = (frac - 0.5).abs();
        if pick.map_or(true, |(_, _, d)| distance < d) {
            pick = Some((j, values[j], distance));
        }
    }
    pick.map(|(j, v, _)| (j, v))
}

/// Round integer variables to the nearest integer.
fn snap(problem: &Problem, values: &[f64]) -> Vec<f64> {
    problem
        .vars()
        .iter()
        .zip(values)
        .map(|(def, &v)| if def.integer { v.round() } else { v })
        .collect()
}

/// Bounds, integrality and constraint check for a proposed incumbent.
fn is_feasible(problem: &Problem, rows: &[Vec<f64>], rhs: &[f64], x: &[f64]) -> bool {
    if x.len() != problem.num_vars() {
        debug!("incumbent rejected: wrong arity");
        return false;
    }
    for (j, def) in problem.vars().iter().enumerate() {
        if x[j] < def.lower - INT_TOL || x[j] > def.upper + INT_TOL {
            debug!("incumbent rejected: variable {j} out of bounds");
            return false;
        }
        if def.integer && (x[j] - x[j].round()).abs() > INT_TOL {
            debug!("incumbent rejected: variable {j} not integral");
            return false;
        }
    }
    for (i, row) in rows.iter().enumerate() {
        let lhs: f64 = row.iter().zip(x).map(|(a, v)| a * v).sum();
        if (lhs - rhs[i]).abs() > 1e-6 {
            debug!("incumbent rejected: constraint {i} violated");
            return false;
        }
    }
    true
}
