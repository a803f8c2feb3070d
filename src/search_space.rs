//! The search space: every legal combination that can exist under a rule
//! set, enumerated once and shared read-only.
//!
//! Runs come from contiguous value windows of sizes 3-5 per color. Groups
//! come from the full color set per value plus every 3-subset of colors.
//! Each enumerated combination is then "salted" with jokers: one clone per
//! tile position with that position replaced by a joker, repeated up to
//! `jokers_per_combination` levels deep. De-duplication is by combination
//! identity, so two spaces built from equal rules always hold the same set.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::combination::{Combination, CombinationIdentity};
use crate::rules::Rules;
use crate::tile::Tile;

/// Tallies of the enumerated combinations, by shape and size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpaceStats {
    pub total_runs: usize,
    pub total_groups: usize,
    pub run_sizes: BTreeMap<usize, usize>,
    pub group_sizes: BTreeMap<usize, usize>,
}

/// All legal combinations under one rule set. Immutable after construction;
/// wrap in [`Arc`] to share across players, games and threads.
#[derive(Debug, Clone)]
pub struct SearchSpace {
    rules: Rules,
    combinations: Vec<Combination>,
    index: HashMap<CombinationIdentity, usize>,
    unique_tiles: Vec<Tile>,
    stats: SpaceStats,
}

/// Run window sizes enumerated into the space. Longer runs on the table are
/// always expressible as concatenations of these.
const RUN_SIZES: [usize; 3] = [3, 4, 5];

impl SearchSpace {
    /// Enumerate the full space for a rule set.
    pub fn new(rules: Rules) -> Self {
        let base = rules.base_tiles();

        let mut unique_tiles = base.clone();
        if rules.jokers_in_play > 0 {
            // Jokers are interchangeable, so one class represents them all.
            unique_tiles.push(Tile::joker());
        }

        let mut space = SearchSpace {
            rules,
            combinations: Vec::new(),
            index: HashMap::new(),
            unique_tiles,
            stats: SpaceStats::default(),
        };

        let runs = compute_all_runs(&base, space.rules.values);
        let groups = compute_all_groups(&base, &space.rules.colors);

        let depth = space.rules.jokers_per_combination;
        space.add_combinations(salt_with_jokers(&groups, depth));
        space.add_combinations(salt_with_jokers(&runs, depth));

        debug!(
            "search space built: {} combinations ({} runs, {} groups) over {} tile classes",
            space.combinations.len(),
            space.stats.total_runs,
            space.stats.total_groups,
            space.unique_tiles.len()
        );

        space
    }

    /// Convenience constructor for the common shared-ownership case.
    pub fn shared(rules: Rules) -> Arc<Self> {
        Arc::new(Self::new(rules))
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Every combination in the space, in enumeration order.
    pub fn combinations(&self) -> &[Combination] {
        &self.combinations
    }

    /// One tile per distinct (value, color) class, plus a single joker
    /// class when the play set has jokers.
    pub fn unique_tiles(&self) -> &[Tile] {
        &self.unique_tiles
    }

    pub fn stats(&self) -> &SpaceStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    /// Whether a combination with this tile multiset is in the space.
    pub fn contains(&self, combo: &Combination) -> bool {
        self.index.contains_key(&combo.identity())
    }

    /// Index of the combination with this identity, if present.
    pub fn position_of(&self, identity: CombinationIdentity) -> Option<usize> {
        self.index.get(&identity).copied()
    }

    /// Insert combinations, de-duplicating by identity, dropping anything
    /// the rule set rejects (salting can over-joker small combinations
    /// under permissive joker limits) and tallying shapes.
    fn add_combinations(&mut self, combos: Vec<Combination>) {
        for combo in combos {
            let id = combo.identity();
            if self.index.contains_key(&id) {
                continue;
            }
            if self.rules.check_combination(&combo).is_err() {
                continue;
            }

            if combo.is_valid_run() {
                self.stats.total_runs += 1;
                *self.stats.run_sizes.entry(combo.len()).or_insert(0) += 1;
            } else if combo.is_valid_group() {
                self.stats.total_groups += 1;
                *self.stats.group_sizes.entry(combo.len()).or_insert(0) += 1;
            } else {
                // check_combination admitted it, so one of the two holds.
                unreachable!("combination passed rules but is neither run nor group: {combo}");
            }

            self.index.insert(id, self.combinations.len());
            self.combinations.push(combo);
        }
    }
}

/// All runs over the base tiles: contiguous value windows per color.
fn compute_all_runs(base: &[Tile], max_value: i32) -> Vec<Combination> {
    let mut per_color: Vec<(&str, Vec<&Tile>)> = Vec::new();
    for tile in base {
        match per_color.iter_mut().find(|(c, _)| *c == tile.color) {
            Some((_, tiles)) => tiles.push(tile),
            None => per_color.push((tile.color.as_str(), vec![tile])),
        }
    }

    let mut runs = Vec::new();
    for (_, tiles) in &mut per_color {
        tiles.sort_by_key(|t| t.value);
        for &size in &RUN_SIZES {
            if size > max_value as usize {
                continue;
            }
            for window in tiles.windows(size) {
                runs.push(Combination::new(
                    window.iter().map(|t| (*t).clone()).collect::<Vec<_>>(),
                ));
            }
        }
    }
    runs
}

/// All groups over the base tiles: per value, the full color set plus every
/// 3-subset of colors.
fn compute_all_groups(base: &[Tile], colors: &[String]) -> Vec<Combination> {
    let mut groups = Vec::new();

    for value in base.iter().map(|t| t.value).collect::<std::collections::BTreeSet<_>>() {
        let of_value: Vec<&Tile> = base.iter().filter(|t| t.value == value).collect();

        if colors.len() >= 3 {
            groups.push(Combination::new(
                of_value.iter().map(|t| (*t).clone()).collect::<Vec<_>>(),
            ));
        }

        let n = of_value.len();
        for i in 0..n {
            for j in (i + 1)..n {
                for k in (j + 1)..n {
                    groups.push(Combination::new(vec![
                        of_value[i].clone(),
                        of_value[j].clone(),
                        of_value[k].clone(),
                    ]));
                }
            }
        }
    }

    groups
}

/// Clone each combination once per tile position with that position replaced
/// by a joker, `depth` levels deep. The originals are kept; duplicates are
/// left for identity de-duplication to drop.
fn salt_with_jokers(combinations: &[Combination], depth: usize) -> Vec<Combination> {
    let mut all: Vec<Combination> = combinations.to_vec();
    let mut frontier: Vec<Combination> = combinations.to_vec();

    for _ in 0..depth {
        let mut next = Vec::new();
        for combo in &frontier {
            for i in 0..combo.len() {
                let mut salted = combo.clone();
                salted.tiles[i] = Tile::joker();
                next.push(salted);
            }
        }
        all.extend(next.iter().cloned());
        frontier = next;
    }

    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_duplicate_identities() {
        let space = SearchSpace::new(Rules::default());
        let mut seen = HashMap::new();
        for combo in space.combinations() {
            let prior = seen.insert(combo.identity(), combo.clone());
            assert!(prior.is_none(), "identity collision: {combo} vs {:?}", prior);
        }
    }

    #[test]
    fn default_space_tallies() {
        let space = SearchSpace::new(Rules::default());
        let stats = space.stats();

        assert_eq!(stats.group_sizes.get(&4), Some(&65));
        assert_eq!(stats.group_sizes.get(&3), Some(&130));

        assert_eq!(stats.run_sizes.get(&3), Some(&136));
        assert_eq!(stats.run_sizes.get(&4), Some(&164));
        assert_eq!(stats.run_sizes.get(&5), Some(&184));
    }

    #[test]
    fn unique_tiles_hold_one_joker_class() {
        let space = SearchSpace::new(Rules::default());
        assert_eq!(space.unique_tiles().len(), 53);
        assert_eq!(
            space.unique_tiles().iter().filter(|t| t.is_joker()).count(),
            1
        );

        let mut rules = Rules::default();
        rules.jokers_in_play = 0;
        let jokerless = SearchSpace::new(rules);
        assert!(jokerless.unique_tiles().iter().all(|t| !t.is_joker()));
    }

    #[test]
    fn all_members_are_legal() {
        let space = SearchSpace::new(Rules::default());
        for combo in space.combinations() {
            assert!(
                space.rules().is_legal_combination(combo),
                "illegal combination in space: {combo}"
            );
        }
    }

    #[test]
    fn contains_by_identity() {
        let space = SearchSpace::new(Rules::default());
        let valid = Combination::new(vec![
            Tile::new(2, "yellow"),
            Tile::new(3, "yellow"),
            Tile::new(4, "yellow"),
        ]);
        let invalid = Combination::new(vec![
            Tile::new(2, "green"),
            Tile::new(3, "yellow"),
            Tile::new(4, "yellow"),
        ]);
        assert!(space.contains(&valid));
        assert!(!space.contains(&invalid));
    }

    #[test]
    fn equal_rules_give_equal_spaces() {
        let a = SearchSpace::new(Rules::default());
        let b = SearchSpace::new(Rules::default());
        assert_eq!(a.len(), b.len());
        for combo in a.combinations() {
            assert!(b.contains(combo), "{combo} missing from second space");
        }
        for combo in b.combinations() {
            assert!(a.contains(combo), "{combo} missing from first space");
        }
    }
}
