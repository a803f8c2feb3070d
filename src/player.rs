//! Player state and the pluggable move solver.
//!
//! Human and AI players share one state container; they differ only in the
//! solver behind [`Player::make_move`]. Hands are kept as an append-only
//! history of snapshots: setting a hand appends, and [`Player::hand`] reads
//! the latest entry. Solver handles are not serialized; deserialized games
//! re-attach them from the `human` flag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::combination::{dissolve, Combination};
use crate::game::Move;
use crate::tile::{summed_value, tile_multiset_diff, Tile};

/// A solver's answer for one turn.
#[derive(Debug, Clone)]
pub struct Proposal {
    /// The complete proposed table, existing combinations included. Not a
    /// delta.
    pub arrangement: Vec<Combination>,
    /// The tiles moved from the hand onto the table by this proposal.
    pub tiles_added: Vec<Tile>,
}

/// Failure inside a solver. For an AI player every variant is a programming
/// error; the turn driver escalates it instead of committing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    /// The placement model has no feasible arrangement. With a legal table
    /// this cannot happen: leaving the table untouched is always feasible.
    Infeasible,
    /// The cancellation flag was raised; nothing was committed.
    Cancelled,
    /// The deadline expired before even the fallback arrangement was known.
    DeadlineExpired,
    /// The underlying engine failed (unbounded relaxation, numerical stall).
    Engine(&'static str),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::Infeasible => f.write_str("placement model is infeasible"),
            SolveError::Cancelled => f.write_str("solve cancelled"),
            SolveError::DeadlineExpired => f.write_str("deadline expired without a solution"),
            SolveError::Engine(msg) => write!(f, "solver engine failure: {msg}"),
        }
    }
}

impl std::error::Error for SolveError {}

/// A move engine: given a hand and the current table, propose a full new
/// table arrangement.
pub trait Solver: Send + Sync {
    /// `maximize_value` switches the objective from tile count to summed
    /// tile value (used for first moves, which must clear a value bar).
    fn solve(
        &self,
        hand: &[Tile],
        table: &[Combination],
        maximize_value: bool,
    ) -> Result<Proposal, SolveError>;
}

/// The no-op solver: always proposes the unchanged table, i.e. a forfeit.
/// Attached to human players (whose moves arrive from outside) and handy in
/// tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForfeitSolver;

impl Solver for ForfeitSolver {
    fn solve(
        &self,
        _hand: &[Tile],
        table: &[Combination],
        _maximize_value: bool,
    ) -> Result<Proposal, SolveError> {
        Ok(Proposal {
            arrangement: table.to_vec(),
            tiles_added: Vec::new(),
        })
    }
}

/// Per-player game state.
#[derive(Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub human: bool,
    /// Append-only history of hand snapshots; the last entry is current.
    pub hand_history: Vec<Vec<Tile>>,
    #[serde(skip)]
    solver: Option<Arc<dyn Solver>>,
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("name", &self.name)
            .field("human", &self.human)
            .field("hand_history", &self.hand_history)
            .field("solver", &self.solver.as_ref().map(|_| "attached"))
            .finish()
    }
}

impl Player {
    /// An AI player driven by the given solver.
    pub fn new_ai(name: impl Into<String>, solver: Arc<dyn Solver>) -> Self {
        Player {
            name: name.into(),
            human: false,
            hand_history: Vec::new(),
            solver: Some(solver),
        }
    }

    /// A human player. Its solver only ever forfeits; real moves arrive
    /// through the game API.
    pub fn new_human(name: impl Into<String>) -> Self {
        Player {
            name: name.into(),
            human: true,
            hand_history: Vec::new(),
            solver: Some(Arc::new(ForfeitSolver)),
        }
    }

    pub fn is_human(&self) -> bool {
        self.human
    }

    /// The current hand: the latest snapshot, or empty before any deal.
    pub fn hand(&self) -> &[Tile] {
        self.hand_history.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append a new hand snapshot. Earlier snapshots are never mutated.
    pub fn set_hand(&mut self, hand: Vec<Tile>) {
        self.hand_history.push(hand);
    }

    /// Re-attach a solver, e.g. after deserialization.
    pub fn attach_solver(&mut self, solver: Arc<dyn Solver>) {
        self.solver = Some(solver);
    }

    pub fn has_solver(&self) -> bool {
        self.solver.is_some()
    }

    /// Build this player's move for the current table.
    ///
    /// `min_value` is the first-move threshold (0 after the player has
    /// committed a move). When it is positive the solver maximizes summed
    /// value; if the value of the genuinely new tiles does not exceed the
    /// threshold the proposal is replaced by a forfeit, so the returned
    /// move is always legal to commit.
    pub fn make_move(&self, table: &[Combination], min_value: i32) -> Result<Move, SolveError> {
        let solver = self
            .solver
            .as_ref()
            .ok_or(SolveError::Engine("player has no solver attached"))?;

        let proposal = solver.solve(self.hand(), table, min_value > 0)?;
        let candidate = Move::new(&self.name, proposal.arrangement);

        // Judge the proposal by the diff against the table rather than by
        // the solver's own tiles_added. Jokers count zero.
        let added = tile_multiset_diff(&candidate.tiles(), &dissolve(table));
        if summed_value(&added) > min_value {
            Ok(candidate)
        } else {
            Ok(Move::new(&self.name, table.to_vec()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Tile;

    fn run(color: &str, values: &[i32]) -> Combination {
        Combination::new(values.iter().map(|&v| Tile::new(v, color)).collect::<Vec<_>>())
    }

    #[test]
    fn hand_reads_latest_snapshot() {
        let mut p = Player::new_human("h");
        assert!(p.hand().is_empty());

        p.set_hand(vec![Tile::new(1, "red")]);
        p.set_hand(vec![Tile::new(2, "blue"), Tile::new(3, "blue")]);
        assert_eq!(p.hand(), &[Tile::new(2, "blue"), Tile::new(3, "blue")]);
        assert_eq!(p.hand_history.len(), 2);
    }

    #[test]
    fn forfeit_solver_echoes_the_table() {
        let table = vec![run("green", &[1, 2, 3])];
        let p = Player::new_human("h");
        let mv = p.make_move(&table, 0).unwrap();
        assert_eq!(mv.author, "h");
        assert_eq!(mv.arrangement, table);
    }

    /// A canned solver for exercising the threshold substitution.
    struct Fixed(Vec<Combination>);

    impl Solver for Fixed {
        fn solve(
            &self,
            _hand: &[Tile],
            table: &[Combination],
            _maximize_value: bool,
        ) -> Result<Proposal, SolveError> {
            let added = tile_multiset_diff(&dissolve(&self.0), &dissolve(table));
            Ok(Proposal {
                arrangement: self.0.clone(),
                tiles_added: added,
            })
        }
    }

    #[test]
    fn below_threshold_proposal_becomes_a_forfeit() {
        // Three aces are worth 3; a first-move threshold of 14 forces a
        // forfeit instead.
        let proposal = vec![Combination::new(vec![
            Tile::new(1, "yellow"),
            Tile::new(1, "blue"),
            Tile::new(1, "red"),
        ])];
        let mut p = Player::new_ai("ai", Arc::new(Fixed(proposal)));
        p.set_hand(vec![
            Tile::new(1, "yellow"),
            Tile::new(1, "blue"),
            Tile::new(1, "red"),
        ]);

        let mv = p.make_move(&[], 14).unwrap();
        assert!(mv.arrangement.is_empty(), "expected a forfeit of the empty table");
    }

    #[test]
    fn above_threshold_proposal_is_kept() {
        let proposal = vec![Combination::new(vec![
            Tile::new(5, "yellow"),
            Tile::new(5, "blue"),
            Tile::new(5, "red"),
        ])];
        let mut p = Player::new_ai("ai", Arc::new(Fixed(proposal.clone())));
        p.set_hand(vec![
            Tile::new(5, "yellow"),
            Tile::new(5, "blue"),
            Tile::new(5, "red"),
        ]);

        let mv = p.make_move(&[], 14).unwrap();
        assert_eq!(mv.arrangement, proposal);
    }
}
