//! Game state, move legality and the AI turn driver.
//!
//! A game is the single source of truth for one table of Rummikub. Every
//! mutation flows through [`Game::process_move`], which adjudicates the
//! proposed arrangement against the legality state machine and commits
//! atomically: the move is appended to the history (the table is always the
//! last committed arrangement) and the author's hand gets a new snapshot.
//! Rule violations come back as structured reasons and never panic;
//! a rejected move changes nothing, not even the turn counter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use log::debug;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::combination::{dissolve, ComboFlaw, Combination};
use crate::player::{ForfeitSolver, Player};
use crate::rules::Rules;
use crate::solver::IlpSolver;
use crate::tile::{summed_value, tile_multiset_diff, Tile};

/// A proposed complete table arrangement, signed by its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub author: String,
    pub arrangement: Vec<Combination>,
}

impl Move {
    pub fn new(author: impl Into<String>, arrangement: Vec<Combination>) -> Self {
        Move {
            author: author.into(),
            arrangement,
        }
    }

    /// All tiles of the proposed arrangement, dissolved.
    pub fn tiles(&self) -> Vec<Tile> {
        dissolve(&self.arrangement)
    }
}

/// Outcome of adjudicating a move. Tags are stable; facades forward the
/// `as_str` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveReason {
    /// New tiles were placed legally.
    Legal,
    /// No new tiles: the author forfeits and draws.
    Forfeited,
    /// The author is not the current player.
    NotYourTurn,
    /// The arrangement uses new tiles the author does not hold.
    NotOwned,
    /// A tile present on the table is missing from the arrangement.
    TilesRemoved,
    /// A first move below the threshold.
    ValueInsufficient,
    /// The game is already over, or this very move won it.
    GameWon,
    /// Some combination in the arrangement breaks the rule set.
    Combination(ComboFlaw),
}

impl MoveReason {
    /// Whether a move with this reason is (or was) committable.
    pub fn accepted(self) -> bool {
        matches!(self, MoveReason::Legal | MoveReason::Forfeited)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MoveReason::Legal => "legal",
            MoveReason::Forfeited => "forfeited",
            MoveReason::NotYourTurn => "not your turn",
            MoveReason::NotOwned => "not owned",
            MoveReason::TilesRemoved => "tiles removed",
            MoveReason::ValueInsufficient => "value insufficient",
            MoveReason::GameWon => "game won",
            MoveReason::Combination(flaw) => flaw.as_str(),
        }
    }
}

impl fmt::Display for MoveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Game construction failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    NoPlayers,
    DuplicatePlayerName(String),
    /// The pile cannot cover the starting hands.
    NotEnoughTiles { needed: usize, available: usize },
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::NoPlayers => f.write_str("a game needs at least one player"),
            GameError::DuplicatePlayerName(name) => {
                write!(f, "duplicate player name: {name}")
            }
            GameError::NotEnoughTiles { needed, available } => write!(
                f,
                "play set too small for the starting hands: need {needed}, have {available}"
            ),
        }
    }
}

impl std::error::Error for GameError {}

/// One table of Rummikub: players in turn order, the draw pile, the
/// committed move history and the rule set. Single-writer: all mutation
/// goes through `process_move` under one logical owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    players: Vec<Player>,
    pile: Vec<Tile>,
    history: Vec<Move>,
    current_turn: usize,
    rules: Rules,
    seed: u64,
}

impl Game {
    /// A game whose pile is the deterministically ordered play set and
    /// whose hands are undealt. The backbone of hard-coded test scenarios.
    pub fn new_unshuffled(rules: Rules, players: Vec<Player>) -> Result<Game, GameError> {
        validate_players(&players)?;
        let pile = rules.all_tiles();
        Ok(Game {
            players,
            pile,
            history: Vec::new(),
            current_turn: 0,
            rules,
            seed: 0,
        })
    }

    /// A fresh game: the play set is permuted by `seed` (Fisher-Yates) and
    /// `starting_hand_size` tiles are dealt to each player in order. Equal
    /// `(rules, seed, players)` yield byte-identical piles and hands.
    pub fn new(rules: Rules, seed: u64, players: Vec<Player>) -> Result<Game, GameError> {
        let mut game = Game::new_unshuffled(rules, players)?;
        game.seed = seed;

        let needed = game.rules.starting_hand_size * game.players.len();
        if needed > game.pile.len() {
            return Err(GameError::NotEnoughTiles {
                needed,
                available: game.pile.len(),
            });
        }

        let mut rng = SmallRng::seed_from_u64(seed);
        game.pile.shuffle(&mut rng);

        for i in 0..game.players.len() {
            let mut hand = Vec::with_capacity(game.rules.starting_hand_size);
            for _ in 0..game.rules.starting_hand_size {
                hand.push(game.pop_from_pile().expect("pile size was checked"));
            }
            game.players[i].set_hand(hand);
        }

        debug!(
            "new game: {} players, seed {}, {} tiles left in pile",
            game.players.len(),
            seed,
            game.pile.len()
        );

        Ok(game)
    }

    /// Rebuild a game from a serialized snapshot and re-arm the solvers:
    /// one shared search space, an ILP solver per AI and a forfeit solver
    /// per human.
    pub fn deserialize(bytes: &[u8]) -> serde_json::Result<Game> {
        let mut game: Game = serde_json::from_slice(bytes)?;
        let space = crate::search_space::SearchSpace::shared(game.rules.clone());
        for player in &mut game.players {
            if player.human {
                player.attach_solver(Arc::new(ForfeitSolver));
            } else {
                player.attach_solver(Arc::new(IlpSolver::with_space(space.clone())));
            }
        }
        Ok(game)
    }

    /// Snapshot the game as canonical JSON: declaration-ordered keys,
    /// solver handles excluded. Structurally equal games serialize to the
    /// same bytes.
    pub fn serialize(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn pile(&self) -> &[Tile] {
        &self.pile
    }

    /// The committed move history, oldest first.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn get_player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    pub fn current_player(&self) -> &Player {
        &self.players[self.current_turn]
    }

    /// The current table: the arrangement of the last committed move.
    pub fn table(&self) -> &[Combination] {
        self.history
            .last()
            .map(|m| m.arrangement.as_slice())
            .unwrap_or(&[])
    }

    /// Whether any player has emptied their hand.
    pub fn has_been_won(&self) -> bool {
        self.players.iter().any(|p| p.hand().is_empty())
    }

    /// Whether `name` has no committed move yet (forfeits count as moves).
    pub fn is_first_move(&self, name: &str) -> bool {
        !self.history.iter().any(|m| m.author == name)
    }

    /// Draw from the top of the pile; `None` once the pile is exhausted.
    fn pop_from_pile(&mut self) -> Option<Tile> {
        self.pile.pop()
    }

    /// An empty proposed arrangement is the wire encoding of a forfeit;
    /// treat it as the unchanged table.
    fn effective_arrangement<'a>(&'a self, m: &'a Move) -> &'a [Combination] {
        if m.arrangement.is_empty() {
            self.table()
        } else {
            &m.arrangement
        }
    }

    /// Adjudicate a move against the current state. First match wins:
    ///
    /// 1. wrong author → [`MoveReason::NotYourTurn`]
    /// 2. a table tile missing from the proposal → [`MoveReason::TilesRemoved`]
    /// 3. no new tiles → [`MoveReason::Forfeited`] (a legal outcome)
    /// 4. new tiles not in the author's hand → [`MoveReason::NotOwned`]
    /// 5. an illegal combination → that combination's flaw
    /// 6. a first move below the value threshold → [`MoveReason::ValueInsufficient`]
    /// 7. otherwise → [`MoveReason::Legal`]
    pub fn is_legal_move(&self, m: &Move) -> MoveReason {
        let player = self.current_player();
        if player.name != m.author {
            return MoveReason::NotYourTurn;
        }

        let arrangement = self.effective_arrangement(m);
        let proposed = dissolve(arrangement);
        let current = dissolve(self.table());

        if !tile_multiset_diff(&current, &proposed).is_empty() {
            return MoveReason::TilesRemoved;
        }

        let new_tiles = tile_multiset_diff(&proposed, &current);
        if new_tiles.is_empty() {
            return MoveReason::Forfeited;
        }

        if !tile_multiset_diff(&new_tiles, player.hand()).is_empty() {
            return MoveReason::NotOwned;
        }

        for combo in arrangement {
            if let Err(flaw) = self.rules.check_combination(combo) {
                return MoveReason::Combination(flaw);
            }
        }

        // Jokers contribute zero toward the threshold.
        if self.is_first_move(&player.name)
            && summed_value(&new_tiles) < self.rules.first_move_value
        {
            return MoveReason::ValueInsufficient;
        }

        MoveReason::Legal
    }

    /// Adjudicate and, when legal, commit: append the move, snapshot the
    /// author's hand (minus the placed tiles, or plus the forfeit draw) and
    /// cycle the turn. A winning commit does not cycle, so the winner stays
    /// the current player. Rejected moves change nothing.
    pub fn process_move(&mut self, m: Move) -> (bool, MoveReason) {
        if self.has_been_won() {
            return (false, MoveReason::GameWon);
        }

        // Normalize the forfeit wire encoding before committing, so a
        // committed forfeit never wipes the table.
        let m = if m.arrangement.is_empty() {
            Move::new(m.author, self.table().to_vec())
        } else {
            m
        };

        let reason = self.is_legal_move(&m);
        match reason {
            MoveReason::Legal => {
                let placed = tile_multiset_diff(&m.tiles(), &dissolve(self.table()));
                let player = &mut self.players[self.current_turn];
                let new_hand = tile_multiset_diff(player.hand(), &placed);
                player.set_hand(new_hand);
                self.history.push(m);

                if self.has_been_won() {
                    debug!("game won by {}", self.current_player().name);
                    return (true, MoveReason::GameWon);
                }
                self.cycle_turn();
                (true, MoveReason::Legal)
            }
            MoveReason::Forfeited => {
                self.history.push(m);
                if let Some(tile) = self.pop_from_pile() {
                    let player = &mut self.players[self.current_turn];
                    let mut hand = player.hand().to_vec();
                    hand.push(tile);
                    player.set_hand(hand);
                }
                self.cycle_turn();
                (true, MoveReason::Forfeited)
            }
            rejection => (false, rejection),
        }
    }

    fn cycle_turn(&mut self) {
        self.current_turn = (self.current_turn + 1) % self.players.len();
    }

    /// Commit an arrangement without adjudication. Test scaffolding for
    /// hard-coded table states.
    #[cfg(test)]
    pub(crate) fn commit_move(&mut self, m: Move) {
        self.history.push(m);
    }

    /// Run consecutive AI turns until a human must act, the game is won, or
    /// a full round of dry forfeits proves a stalemate. Each iteration asks
    /// the current AI's solver for a move against the freshly committed
    /// table and commits it.
    ///
    /// An AI producing a rejected move is a programming error, not a rule
    /// violation, and panics with full diagnostics.
    pub fn run_ai_turns(&mut self) {
        let mut dry_forfeits = 0usize;
        loop {
            if self.has_been_won() {
                return;
            }

            let idx = self.current_turn;
            if self.players[idx].human {
                return;
            }

            let name = self.players[idx].name.clone();
            let threshold = if self.is_first_move(&name) {
                self.rules.first_move_value
            } else {
                0
            };

            let table = self.table().to_vec();
            let mv = match self.players[idx].make_move(&table, threshold) {
                Ok(mv) => mv,
                Err(err) => panic!("solver failed for AI player {name}: {err}"),
            };
            assert_eq!(
                mv.author, name,
                "solver produced a move signed by the wrong player"
            );

            let pile_before = self.pile.len();
            let (accepted, reason) = self.process_move(mv.clone());
            if !accepted {
                panic!(
                    "AI player {name}'s move was rejected: {reason}\n\
                     offending move: {mv:?}\n\
                     current table: {:?}\n\
                     player hand: {:?}",
                    self.table(),
                    self.get_player(&name).map(Player::hand),
                );
            }

            // A forfeit that drew nothing makes no progress; a full round of
            // them means nobody can move and the pile is dry.
            if reason == MoveReason::Forfeited && self.pile.len() == pile_before {
                dry_forfeits += 1;
                if dry_forfeits >= self.players.len() {
                    debug!("stalemate: every player forfeited on an empty pile");
                    return;
                }
            } else {
                dry_forfeits = 0;
            }
        }
    }
}

fn validate_players(players: &[Player]) -> Result<(), GameError> {
    if players.is_empty() {
        return Err(GameError::NoPlayers);
    }
    for (i, p) in players.iter().enumerate() {
        if players[..i].iter().any(|q| q.name == p.name) {
            return Err(GameError::DuplicatePlayerName(p.name.clone()));
        }
    }
    Ok(())
}
