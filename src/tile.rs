//! The tile primitive and multiset helpers.
//!
//! A tile is a `(value, color)` pair. The sentinel color [`JOKER_COLOR`]
//! marks a wild tile; a joker's value carries no meaning and is normalized
//! to 1 everywhere, including deserialization, so that all jokers compare
//! and hash equal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel color of the wild tile.
pub const JOKER_COLOR: &str = "joker";

const FNV_OFFSET: u32 = 2166136261;
const FNV_PRIME: u32 = 16777619;

/// FNV-1a over a byte slice. Stable across platforms and runs.
fn fnv1a(hash: u32, bytes: &[u8]) -> u32 {
    let mut h = hash;
    for &b in bytes {
        h ^= b as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// A single tile: a value of 1 or higher and a color string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawTile")]
pub struct Tile {
    pub value: i32,
    pub color: String,
}

/// Wire form of a tile, before joker-value normalization.
#[derive(Deserialize)]
struct RawTile {
    value: i32,
    color: String,
}

impl From<RawTile> for Tile {
    fn from(raw: RawTile) -> Self {
        Tile::new(raw.value, raw.color)
    }
}

impl Tile {
    /// Build a tile, normalizing the value of jokers to 1.
    pub fn new(value: i32, color: impl Into<String>) -> Self {
        let color = color.into();
        let value = if color == JOKER_COLOR { 1 } else { value };
        Tile { value, color }
    }

    /// The wild tile.
    pub fn joker() -> Self {
        Tile {
            value: 1,
            color: JOKER_COLOR.to_string(),
        }
    }

    pub fn is_joker(&self) -> bool {
        self.color == JOKER_COLOR
    }

    /// Value of this tile for scoring purposes. Jokers score zero: they
    /// do not count toward the first-move threshold and carry no weight in
    /// the solver's value-maximizing objective.
    pub fn score_value(&self) -> i32 {
        if self.is_joker() {
            0
        } else {
            self.value
        }
    }

    /// Stable 32-bit digest of the decimal value string followed by the
    /// color bytes. Used as a multiset key and XOR-folded into combination
    /// identities, so it must not depend on platform or insertion order.
    pub fn hash32(&self) -> u32 {
        let h = fnv1a(FNV_OFFSET, self.value.to_string().as_bytes());
        fnv1a(h, self.color.as_bytes())
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_joker() {
            write!(f, "(joker)")
        } else {
            write!(f, "({} {})", self.color, self.value)
        }
    }
}

/// Count how many tiles in `set` equal `tile`.
pub fn count_occurrence(set: &[Tile], tile: &Tile) -> usize {
    set.iter().filter(|t| *t == tile).count()
}

/// Multiset difference `from − minus`: every tile of `from` that exceeds its
/// multiplicity in `minus`, in the order it appears in `from`. Respects
/// duplicates on both sides.
pub fn tile_multiset_diff(from: &[Tile], minus: &[Tile]) -> Vec<Tile> {
    let mut budget: std::collections::HashMap<&Tile, isize> = std::collections::HashMap::new();
    for t in minus {
        *budget.entry(t).or_insert(0) += 1;
    }

    let mut diff = Vec::new();
    for t in from {
        match budget.get_mut(t) {
            Some(n) if *n > 0 => *n -= 1,
            _ => diff.push(t.clone()),
        }
    }
    diff
}

/// Whether `sub` is a sub-multiset of `superset`.
pub fn is_sub_multiset(sub: &[Tile], superset: &[Tile]) -> bool {
    tile_multiset_diff(sub, superset).is_empty()
}

/// Summed score value of a tile slice. Jokers contribute zero.
pub fn summed_value(tiles: &[Tile]) -> i32 {
    tiles.iter().map(Tile::score_value).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joker_value_is_normalized() {
        let j = Tile::new(9, JOKER_COLOR);
        assert_eq!(j, Tile::joker());
        assert_eq!(j.value, 1);
        assert_eq!(j.score_value(), 0);
    }

    #[test]
    fn hash_is_stable_and_discriminating() {
        let a = Tile::new(12, "red");
        assert_eq!(a.hash32(), Tile::new(12, "red").hash32());
        assert_ne!(a.hash32(), Tile::new(2, "red").hash32());
        assert_ne!(a.hash32(), Tile::new(12, "blue").hash32());
        assert_eq!(Tile::joker().hash32(), Tile::new(5, JOKER_COLOR).hash32());
    }

    #[test]
    fn diff_respects_multiplicity() {
        let a = vec![Tile::new(1, "red"), Tile::new(1, "red"), Tile::new(2, "blue")];
        let b = vec![Tile::new(1, "red")];
        let d = tile_multiset_diff(&a, &b);
        assert_eq!(d, vec![Tile::new(1, "red"), Tile::new(2, "blue")]);
        assert!(tile_multiset_diff(&b, &a).is_empty());
    }

    #[test]
    fn diff_of_equal_multisets_is_empty_regardless_of_order() {
        let a = vec![Tile::new(3, "green"), Tile::joker(), Tile::new(5, "blue")];
        let b = vec![Tile::new(5, "blue"), Tile::new(3, "green"), Tile::joker()];
        assert!(tile_multiset_diff(&a, &b).is_empty());
        assert!(tile_multiset_diff(&b, &a).is_empty());
    }

    #[test]
    fn summed_value_ignores_jokers() {
        let tiles = vec![Tile::new(5, "red"), Tile::joker(), Tile::new(9, "blue")];
        assert_eq!(summed_value(&tiles), 14);
    }

    #[test]
    fn tile_json_roundtrip_normalizes_joker() {
        let json = r#"{"value":7,"color":"joker"}"#;
        let t: Tile = serde_json::from_str(json).unwrap();
        assert_eq!(t, Tile::joker());
    }
}
