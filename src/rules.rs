//! Rule-set parameters and the layered combination legality check.

use serde::{Deserialize, Serialize};

use crate::combination::{ComboFlaw, Combination};
use crate::tile::{Tile, JOKER_COLOR};

/// Parameters of a Rummikub play set.
///
/// The defaults describe the standard game: 4 colors, values 1-13, two
/// replicates of every tile, two jokers, 14-tile starting hands and a
/// first-move threshold of 14 points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    /// Ordered list of distinct tile colors.
    pub colors: Vec<String>,
    /// Highest tile value; values run `1..=values`.
    pub values: i32,
    /// Maximum number of jokers inside one combination.
    pub jokers_per_combination: usize,
    /// Number of jokers in the play set.
    pub jokers_in_play: usize,
    /// How many copies of each (value, color) tile are in play.
    pub replicates: usize,
    /// Tiles dealt to each player at game start.
    pub starting_hand_size: usize,
    /// Minimum summed value of the tiles placed on a player's first move.
    pub first_move_value: i32,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            colors: ["red", "green", "blue", "yellow"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            values: 13,
            jokers_per_combination: 1,
            jokers_in_play: 2,
            replicates: 2,
            starting_hand_size: 14,
            first_move_value: 14,
        }
    }
}

impl Rules {
    /// One copy of every (value, color) tile in the play set, jokers
    /// excluded. Enumeration order is values-outer, colors-inner and fully
    /// deterministic.
    pub fn base_tiles(&self) -> Vec<Tile> {
        let mut tiles = Vec::with_capacity(self.values as usize * self.colors.len());
        for value in 1..=self.values {
            for color in &self.colors {
                tiles.push(Tile::new(value, color.clone()));
            }
        }
        tiles
    }

    /// The full play set: `replicates` copies of the base tiles followed by
    /// the jokers.
    pub fn all_tiles(&self) -> Vec<Tile> {
        let base = self.base_tiles();
        let mut tiles = Vec::with_capacity(base.len() * self.replicates + self.jokers_in_play);
        for _ in 0..self.replicates {
            tiles.extend(base.iter().cloned());
        }
        for _ in 0..self.jokers_in_play {
            tiles.push(Tile::joker());
        }
        tiles
    }

    /// Full legality of a combination under this rule set, layered on top of
    /// the shape predicates:
    ///
    /// 1. every non-joker color must be a known color,
    /// 2. every value must lie in `1..=values`,
    /// 3. the joker count must not exceed `jokers_per_combination`,
    /// 4. the combination must be a valid run or a valid group.
    ///
    /// The first failing layer decides the returned flaw.
    pub fn check_combination(&self, c: &Combination) -> Result<(), ComboFlaw> {
        for tile in &c.tiles {
            let known = tile.color == JOKER_COLOR || self.colors.iter().any(|col| *col == tile.color);
            if !known {
                return Err(ComboFlaw::UnknownColor);
            }
        }

        for tile in &c.tiles {
            if tile.value < 1 || tile.value > self.values {
                return Err(ComboFlaw::ValueOutOfBounds);
            }
        }

        if c.joker_count() > self.jokers_per_combination {
            return Err(ComboFlaw::TooManyJokers);
        }

        // A combination may qualify as both, e.g. [joker, joker, red-1]
        // under a permissive joker limit. Either shape suffices.
        if c.is_valid_run() || c.is_valid_group() {
            Ok(())
        } else {
            Err(ComboFlaw::IllegalCombination)
        }
    }

    pub fn is_legal_combination(&self, c: &Combination) -> bool {
        self.check_combination(c).is_ok()
    }
}
