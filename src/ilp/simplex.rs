//! Two-phase dense simplex with bounded variables.
//!
//! Solves `max c·x  s.t.  A x = b,  l <= x <= u` with all bounds finite.
//! Works in the shifted space `z = x − l`, so every structural variable
//! ranges over `[0, span]` with `span = u − l`. Nonbasic variables rest at
//! either bound; the ratio test allows bound flips as well as basis pivots.
//! Phase 1 drives a full set of artificial variables to zero; phase 2
//! optimizes the real objective. Entering and leaving choices follow
//! Bland's rule, so the iteration cannot cycle.

/// Reduced-cost tolerance for optimality.
const DTOL: f64 = 1e-7;
/// Pivot magnitude below which a coefficient is treated as zero.
const PIVTOL: f64 = 1e-9;
/// Tolerance when comparing ratio-test limits.
const RATIO_EPS: f64 = 1e-9;
/// Residual infeasibility tolerated at the end of phase 1.
const FEAS_TOL: f64 = 1e-6;
/// Iteration cap per phase; generous for models of a few hundred columns.
const MAX_ITERS: usize = 50_000;

/// Result of one LP solve.
#[derive(Debug, Clone)]
pub(crate) enum LpOutcome {
    Optimal { values: Vec<f64>, objective: f64 },
    Infeasible,
    Unbounded,
}

/// The simplex ran out of iterations; numerically hostile input.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Stalled;

struct Tableau {
    /// Structural column count.
    n: usize,
    /// Row count; artificial columns are `n..n + m`.
    m: usize,
    /// `B⁻¹ A` for every column, maintained by Gauss pivots.
    tab: Vec<Vec<f64>>,
    /// Current values of the basic variables, row by row.
    val: Vec<f64>,
    /// Basic variable per row.
    basis: Vec<usize>,
    /// Range of each (shifted) variable; artificials start unbounded and
    /// are fixed to zero once they leave the basis.
    span: Vec<f64>,
    at_upper: Vec<bool>,
    is_basic: Vec<bool>,
}

/// Solve the LP. `rows` is dense `m x n`, bounds are per structural column.
pub(crate) fn solve(
    rows: &[Vec<f64>],
    rhs: &[f64],
    objective: &[f64],
    lower: &[f64],
    upper: &[f64],
) -> Result<LpOutcome, Stalled> {
    let m = rows.len();
    let n = objective.len();

    let mut span = Vec::with_capacity(n + m);
    for j in 0..n {
        if lower[j] > upper[j] + RATIO_EPS {
            // Branching can produce an empty box; that subproblem is dead.
            return Ok(LpOutcome::Infeasible);
        }
        span.push((upper[j] - lower[j]).max(0.0));
    }
    span.extend(std::iter::repeat(f64::INFINITY).take(m));

    let mut t = Tableau {
        n,
        m,
        tab: vec![vec![0.0; n + m]; m],
        val: vec![0.0; m],
        basis: vec![0; m],
        span,
        at_upper: vec![false; n + m],
        is_basic: vec![false; n + m],
    };

    // Initial basis: one artificial per row, with the row sign chosen so
    // the artificial starts nonnegative. All structural variables start
    // nonbasic at their lower bound (zero in shifted space).
    for i in 0..m {
        let mut b = rhs[i];
        for j in 0..n {
            b -= rows[i][j] * lower[j];
        }
        let sign = if b < 0.0 { -1.0 } else { 1.0 };
        for j in 0..n {
            t.tab[i][j] = sign * rows[i][j];
        }
        t.tab[i][n + i] = 1.0;
        t.basis[i] = n + i;
        t.is_basic[n + i] = true;
        t.val[i] = sign * b;
    }

    // Phase 1: maximize −Σ artificials. Reduced costs start as
    // c_j − c_B B⁻¹ A_j with c_B = −1 on every (artificial) basic column.
    let mut d = vec![0.0; n + m];
    for j in n..n + m {
        d[j] = -1.0;
    }
    for i in 0..m {
        for j in 0..n + m {
            d[j] += t.tab[i][j];
        }
    }

    match optimize(&mut t, &mut d)? {
        StepEnd::Unbounded => return Ok(LpOutcome::Unbounded),
        StepEnd::Optimal => {}
    }

    let residual: f64 = (0..m)
        .filter(|&i| t.basis[i] >= n)
        .map(|i| t.val[i].max(0.0))
        .sum();
    if residual > FEAS_TOL {
        return Ok(LpOutcome::Infeasible);
    }

    drive_out_artificials(&mut t);

    // Phase 2: the real objective. Basic columns are unit vectors, so one
    // elimination pass per row rebuilds the reduced costs.
    let mut d = vec![0.0; n + m];
    d[..n].copy_from_slice(objective);
    for i in 0..m {
        let ck = d[t.basis[i]];
        if ck.abs() > PIVTOL {
            for j in 0..n + m {
                d[j] -= ck * t.tab[i][j];
            }
        }
    }

    match optimize(&mut t, &mut d)? {
        StepEnd::Unbounded => return Ok(LpOutcome::Unbounded),
        StepEnd::Optimal => {}
    }

    // Recover x = l + z.
    let mut values = vec![0.0; n];
    for j in 0..n {
        values[j] = lower[j];
        if t.at_upper[j] {
            values[j] += t.span[j];
        }
    }
    for i in 0..m {
        let k = t.basis[i];
        if k < n {
            values[k] = lower[k] + t.val[i].max(0.0);
        }
    }
    let objective_value = (0..n).map(|j| objective[j] * values[j]).sum();

    Ok(LpOutcome::Optimal {
        values,
        objective: objective_value,
    })
}

enum StepEnd {
    Optimal,
    Unbounded,
}

/// The shared pivot loop for both phases.
fn optimize(t: &mut Tableau, d: &mut [f64]) -> Result<StepEnd, Stalled> {
    let ncols = t.n + t.m;

    for _ in 0..MAX_ITERS {
        // Entering variable: Bland's rule, smallest eligible index.
        let mut entering = None;
        for j in 0..ncols {
            if t.is_basic[j] || t.span[j] <= RATIO_EPS {
                continue;
            }
            let improves = if t.at_upper[j] { d[j] < -DTOL } else { d[j] > DTOL };
            if improves {
                entering = Some(j);
                break;
            }
        }
        let j = match entering {
            Some(j) => j,
            None => return Ok(StepEnd::Optimal),
        };

        let dir = if t.at_upper[j] { -1.0 } else { 1.0 };

        // Ratio test: the entering variable moves by delta, limited by its
        // own span (a bound flip) or by a basic variable reaching one of
        // its bounds. Ties choose the smallest basic index (Bland).
        let mut limit = t.span[j];
        let mut leave: Option<(usize, bool)> = None;
        for i in 0..t.m {
            let a = dir * t.tab[i][j];
            let (ratio, to_upper) = if a > PIVTOL {
                (t.val[i].max(0.0) / a, false)
            } else if a < -PIVTOL {
                let k = t.basis[i];
                if !t.span[k].is_finite() {
                    continue;
                }
                (((t.span[k] - t.val[i]).max(0.0)) / (-a), true)
            } else {
                continue;
            };

            let better = ratio < limit - RATIO_EPS
                || (ratio < limit + RATIO_EPS
                    && leave.map_or(false, |(r, _)| t.basis[i] < t.basis[r]));
            if better {
                limit = ratio.min(limit);
                leave = Some((i, to_upper));
            }
        }

        if limit.is_infinite() {
            return Ok(StepEnd::Unbounded);
        }

        match leave {
            // The entering variable travels its whole span: a bound flip.
            None => {
                let delta = t.span[j];
                for i in 0..t.m {
                    t.val[i] -= dir * t.tab[i][j] * delta;
                }
                t.at_upper[j] = !t.at_upper[j];
            }
            Some((r, to_upper)) => {
                let delta = limit.max(0.0);
                for i in 0..t.m {
                    t.val[i] -= dir * t.tab[i][j] * delta;
                }
                let entering_value = if dir > 0.0 { delta } else { t.span[j] - delta };
                swap_basis(t, r, j, to_upper, entering_value);
                eliminate(t, d, r, j);
            }
        }
    }

    Err(Stalled)
}

/// Replace the basic variable of row `r` with column `j`.
fn swap_basis(t: &mut Tableau, r: usize, j: usize, leaves_at_upper: bool, entering_value: f64) {
    let k = t.basis[r];
    t.is_basic[k] = false;
    t.at_upper[k] = leaves_at_upper;
    if k >= t.n {
        // Retired artificials are pinned at zero and never re-enter.
        t.span[k] = 0.0;
        t.at_upper[k] = false;
    }
    t.basis[r] = j;
    t.is_basic[j] = true;
    t.val[r] = entering_value;
}

/// Gauss-eliminate column `j` against pivot row `r`, keeping the reduced
/// costs in sync. The value column is maintained separately and is not
/// touched here.
fn eliminate(t: &mut Tableau, d: &mut [f64], r: usize, j: usize) {
    let ncols = t.n + t.m;
    let piv = t.tab[r][j];
    for col in 0..ncols {
        t.tab[r][col] /= piv;
    }
    for i in 0..t.m {
        if i == r {
            continue;
        }
        let f = t.tab[i][j];
        if f.abs() > PIVTOL {
            for col in 0..ncols {
                t.tab[i][col] -= f * t.tab[r][col];
            }
        }
    }
    let f = d[j];
    if f.abs() > PIVTOL {
        for col in 0..ncols {
            d[col] -= f * t.tab[r][col];
        }
    }
}

/// After phase 1, pivot any artificial still (degenerately) basic out in
/// favor of a structural column. Rows with no eligible structural column
/// are redundant constraints; their artificial stays basic at zero.
fn drive_out_artificials(t: &mut Tableau) {
    for r in 0..t.m {
        if t.basis[r] < t.n {
            continue;
        }
        let mut replacement = None;
        for j in 0..t.n {
            if !t.is_basic[j] && t.span[j] > RATIO_EPS && t.tab[r][j].abs() > PIVTOL {
                replacement = Some(j);
                break;
            }
        }
        if let Some(j) = replacement {
            let entering_value = if t.at_upper[j] { t.span[j] } else { 0.0 };
            swap_basis(t, r, j, false, entering_value);
            let mut dummy = vec![0.0; t.n + t.m];
            eliminate(t, &mut dummy, r, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optimal(outcome: LpOutcome) -> (Vec<f64>, f64) {
        match outcome {
            LpOutcome::Optimal { values, objective } => (values, objective),
            other => panic!("expected optimal, got {other:?}"),
        }
    }

    #[test]
    fn bounds_only_maximization() {
        // max 2x over 0 <= x <= 1.5, no constraints.
        let (values, obj) = optimal(
            solve(&[], &[], &[2.0], &[0.0], &[1.5]).unwrap(),
        );
        assert!((values[0] - 1.5).abs() < 1e-9);
        assert!((obj - 3.0).abs() < 1e-9);
    }

    #[test]
    fn shared_equality() {
        // max x + y  s.t.  x + y = 3,  x, y in [0, 2].
        let rows = vec![vec![1.0, 1.0]];
        let (values, obj) = optimal(
            solve(&rows, &[3.0], &[1.0, 1.0], &[0.0, 0.0], &[2.0, 2.0]).unwrap(),
        );
        assert!((obj - 3.0).abs() < 1e-7);
        assert!((values[0] + values[1] - 3.0).abs() < 1e-7);
    }

    #[test]
    fn coupled_variables() {
        // max x  s.t.  x - y = 0,  x in [0, 2], y in [0, 1]  =>  x = 1.
        let rows = vec![vec![1.0, -1.0]];
        let (values, obj) = optimal(
            solve(&rows, &[0.0], &[1.0, 0.0], &[0.0, 0.0], &[2.0, 1.0]).unwrap(),
        );
        assert!((obj - 1.0).abs() < 1e-7);
        assert!((values[0] - 1.0).abs() < 1e-7);
    }

    #[test]
    fn infeasible_rhs() {
        // x = 5 with x in [0, 2].
        let rows = vec![vec![1.0]];
        let outcome = solve(&rows, &[5.0], &[1.0], &[0.0], &[2.0]).unwrap();
        assert!(matches!(outcome, LpOutcome::Infeasible));
    }

    #[test]
    fn inverted_box_is_infeasible() {
        let outcome = solve(&[], &[], &[1.0], &[2.0], &[1.0]).unwrap();
        assert!(matches!(outcome, LpOutcome::Infeasible));
    }

    #[test]
    fn nonzero_lower_bounds() {
        // max 3x + y  s.t.  x + y = 3,  x in [1, 2], y in [0, 1]  =>  x=2, y=1.
        let rows = vec![vec![1.0, 1.0]];
        let (values, obj) = optimal(
            solve(&rows, &[3.0], &[3.0, 1.0], &[1.0, 0.0], &[2.0, 1.0]).unwrap(),
        );
        assert!((values[0] - 2.0).abs() < 1e-7);
        assert!((values[1] - 1.0).abs() < 1e-7);
        assert!((obj - 7.0).abs() < 1e-7);
    }

    #[test]
    fn negative_rhs_rows_are_normalized() {
        // -x - y = -3 is the same constraint as x + y = 3.
        let rows = vec![vec![-1.0, -1.0]];
        let (_, obj) = optimal(
            solve(&rows, &[-3.0], &[1.0, 1.0], &[0.0, 0.0], &[2.0, 2.0]).unwrap(),
        );
        assert!((obj - 3.0).abs() < 1e-7);
    }

    #[test]
    fn redundant_rows_are_tolerated() {
        // The same constraint twice leaves a basic artificial at zero.
        let rows = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let (_, obj) = optimal(
            solve(&rows, &[3.0, 3.0], &[1.0, 2.0], &[0.0, 0.0], &[2.0, 2.0]).unwrap(),
        );
        assert!((obj - 5.0).abs() < 1e-7);
    }

    #[test]
    fn zero_objective_still_finds_a_feasible_point() {
        let rows = vec![vec![1.0, 1.0]];
        let (values, obj) = optimal(
            solve(&rows, &[2.0], &[0.0, 0.0], &[0.0, 0.0], &[2.0, 2.0]).unwrap(),
        );
        assert!((values[0] + values[1] - 2.0).abs() < 1e-7);
        assert!(obj.abs() < 1e-9);
    }
}
