//! The ILP formulation of the placement problem.
//!
//! Given a hand and the current table, the solver picks how many times each
//! search-space combination appears in the new arrangement (`x` variables)
//! and how many copies of each tile class move from the hand to the table
//! (`y` variables), subject to one balance constraint per tile class:
//!
//! ```text
//! sum_j S_ij * x_j  -  y_i  =  t_i
//! ```
//!
//! where `S_ij` counts class `i` in combination `j` and `t_i` counts class
//! `i` on the current table. Every tile of the new table is therefore
//! either already on the table or placed from the hand, and nothing on the
//! table can disappear. The objective maximizes placed tiles, or their
//! summed value when `maximize_value` is set; combination variables carry
//! no objective weight, so the solver is never rewarded for rearranging.
//!
//! The model is always feasible for a legal table: reproducing the current
//! table and placing nothing is a solution, and that arrangement seeds the
//! branch-and-bound as its incumbent so a deadline can always fall back to
//! it.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;

use crate::combination::{dissolve, Combination};
use crate::ilp::{IlpError, Problem, SolveOptions};
use crate::player::{Proposal, SolveError, Solver};
use crate::rules::Rules;
use crate::search_space::SearchSpace;
use crate::tile::{count_occurrence, Tile};

impl From<IlpError> for SolveError {
    fn from(err: IlpError) -> Self {
        match err {
            IlpError::Infeasible => SolveError::Infeasible,
            IlpError::Cancelled => SolveError::Cancelled,
            IlpError::DeadlineExpired => SolveError::DeadlineExpired,
            IlpError::Unbounded => SolveError::Engine("relaxation unbounded"),
            IlpError::NumericalStall => SolveError::Engine("simplex stalled"),
        }
    }
}

/// The ILP-backed move solver. Cheap to clone per player; the search space
/// is shared.
#[derive(Clone)]
pub struct IlpSolver {
    space: Arc<SearchSpace>,
    deadline: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
}

impl IlpSolver {
    /// Build a solver with its own search space for the given rules.
    pub fn new(rules: &Rules) -> Self {
        Self::with_space(SearchSpace::shared(rules.clone()))
    }

    /// Build a solver over an existing shared search space.
    pub fn with_space(space: Arc<SearchSpace>) -> Self {
        IlpSolver {
            space,
            deadline: None,
            cancel: None,
        }
    }

    /// Budget each solve call; on expiry the best arrangement found so far
    /// is returned (at worst the unchanged table).
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Cooperative cancellation; a raised flag aborts the solve with
    /// [`SolveError::Cancelled`].
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn search_space(&self) -> &Arc<SearchSpace> {
        &self.space
    }

    /// Express the current table as search-space combination counts: the
    /// "place nothing" solution. Combinations not in the space (runs longer
    /// than the enumerated windows) are split into enumerated windows.
    /// Returns `None` when some piece has no counterpart in the space.
    fn baseline_counts(&self, table: &[Combination]) -> Option<HashMap<usize, usize>> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for combo in table {
            if let Some(idx) = self.space.position_of(combo.identity()) {
                *counts.entry(idx).or_insert(0) += 1;
                continue;
            }
            for piece in decompose_run(combo)? {
                let idx = self.space.position_of(piece.identity())?;
                *counts.entry(idx).or_insert(0) += 1;
            }
        }
        Some(counts)
    }
}

impl Solver for IlpSolver {
    fn solve(
        &self,
        hand: &[Tile],
        table: &[Combination],
        maximize_value: bool,
    ) -> Result<Proposal, SolveError> {
        let combos = self.space.combinations();
        let classes = self.space.unique_tiles();
        let table_tiles = dissolve(table);
        let replicates = self.space.rules().replicates as f64;

        // A table tile outside the known classes could silently vanish from
        // the model; refuse instead.
        for tile in &table_tiles {
            if !classes.contains(tile) {
                debug!("table tile {tile} has no class under the rule set");
                return Err(SolveError::Infeasible);
            }
        }

        let mut prob = Problem::maximize();

        // x_j: how often combination j appears in the new arrangement.
        let xs: Vec<_> = combos
            .iter()
            .map(|_| prob.add_integer(0.0, replicates, 0.0))
            .collect();

        // y_i: copies of class i placed from the hand. The rack limit is the
        // upper bound; the weight is 1 (count mode) or the tile's score
        // value (value mode, jokers weigh zero either way).
        let ys: Vec<_> = classes
            .iter()
            .map(|class| {
                let weight = if maximize_value {
                    class.score_value() as f64
                } else {
                    1.0
                };
                let rack = count_occurrence(hand, class) as f64;
                prob.add_integer(0.0, rack, weight)
            })
            .collect();

        // One balance row per class: sum_j S_ij x_j - y_i = t_i.
        for (i, class) in classes.iter().enumerate() {
            let mut terms = Vec::new();
            for (j, combo) in combos.iter().enumerate() {
                let s = count_occurrence(&combo.tiles, class);
                if s > 0 {
                    terms.push((xs[j], s as f64));
                }
            }
            terms.push((ys[i], -1.0));
            let t = count_occurrence(&table_tiles, class) as f64;
            prob.add_equality(terms, t);
        }

        let incumbent = self.baseline_counts(table).map(|counts| {
            let mut x = vec![0.0; prob.num_vars()];
            for (idx, mult) in counts {
                x[xs[idx].0] = mult as f64;
            }
            x
        });
        if incumbent.is_none() {
            debug!("no baseline arrangement for this table; solving without an incumbent");
        }

        let options = SolveOptions {
            deadline: self.deadline.map(|d| Instant::now() + d),
            cancel: self.cancel.clone(),
            incumbent,
            node_limit: 0,
        };
        let solution = prob.solve(&options)?;

        let mut arrangement = Vec::new();
        for (j, combo) in combos.iter().enumerate() {
            let times = solution.values[xs[j].0].round() as usize;
            for _ in 0..times {
                arrangement.push(combo.clone());
            }
        }
        let mut tiles_added = Vec::new();
        for (i, class) in classes.iter().enumerate() {
            let times = solution.values[ys[i].0].round() as usize;
            for _ in 0..times {
                tiles_added.push(class.clone());
            }
        }

        debug!(
            "solver placed {} tiles across {} combinations (objective {})",
            tiles_added.len(),
            arrangement.len(),
            solution.objective
        );

        debug_assert_eq!(
            dissolve(&arrangement).len(),
            table_tiles.len() + tiles_added.len(),
            "arrangement does not balance table plus placed tiles"
        );

        Ok(Proposal {
            arrangement,
            tiles_added,
        })
    }
}

/// Split a run into enumerated window sizes (3-5 tiles), rebuilding the
/// consecutive order first: non-jokers sorted by value, jokers filling the
/// gaps, surplus jokers trailing. Returns `None` for anything that is not a
/// valid run.
fn decompose_run(combo: &Combination) -> Option<Vec<Combination>> {
    combo.check_run().ok()?;

    let mut non_jokers: Vec<&Tile> = combo.tiles.iter().filter(|t| !t.is_joker()).collect();
    non_jokers.sort_by_key(|t| t.value);
    let mut jokers = combo.joker_count();

    let low = non_jokers.first()?.value;
    let high = non_jokers.last()?.value;

    let mut ordered = Vec::with_capacity(combo.len());
    for v in low..=high {
        match non_jokers.iter().find(|t| t.value == v) {
            Some(tile) => ordered.push((*tile).clone()),
            None => {
                // check_run guaranteed the gap budget.
                jokers -= 1;
                ordered.push(Tile::joker());
            }
        }
    }
    for _ in 0..jokers {
        ordered.push(Tile::joker());
    }

    let mut pieces = Vec::new();
    let mut rest = ordered.as_slice();
    while rest.len() > 5 {
        let (chunk, tail) = rest.split_at(3);
        pieces.push(Combination::new(chunk.to_vec()));
        rest = tail;
    }
    pieces.push(Combination::new(rest.to_vec()));
    Some(pieces)
}
