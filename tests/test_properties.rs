//! Property-based tests for the tile algebra and combination identities.

use proptest::prelude::*;

use rummikub::{
    summed_value, tile_multiset_diff, Combination, Game, Player, Rules, Tile,
};

/// Strategy: any tile of the default play set, jokers included.
fn tile_strategy() -> impl Strategy<Value = Tile> {
    (
        1..=13i32,
        prop::sample::select(vec!["red", "green", "blue", "yellow", "joker"]),
    )
        .prop_map(|(value, color)| Tile::new(value, color))
}

fn tiles_strategy(max: usize) -> impl Strategy<Value = Vec<Tile>> {
    prop::collection::vec(tile_strategy(), 0..max)
}

fn sorted_names(tiles: &[Tile]) -> Vec<String> {
    let mut names: Vec<String> = tiles.iter().map(Tile::to_string).collect();
    names.sort();
    names
}

proptest! {
    // Identity is the XOR of tile hashes, so any permutation of the tiles
    // must produce the same identity.
    #[test]
    fn identity_survives_rotation(tiles in tiles_strategy(9), k in 0usize..8) {
        let combination = Combination::new(tiles.clone());
        let mut rotated = tiles.clone();
        if !rotated.is_empty() {
            let k = k % rotated.len();
            rotated.rotate_left(k);
        }
        prop_assert_eq!(combination.identity(), Combination::new(rotated).identity());
    }

    #[test]
    fn identity_survives_reversal(tiles in tiles_strategy(9)) {
        let forward = Combination::new(tiles.clone());
        let mut backward = tiles;
        backward.reverse();
        prop_assert_eq!(forward.identity(), Combination::new(backward).identity());
    }

    // The shape predicates must not depend on input order either; this was
    // once broken for joker-first inputs.
    #[test]
    fn predicates_survive_reversal(tiles in tiles_strategy(9)) {
        let forward = Combination::new(tiles.clone());
        let mut backward = tiles;
        backward.reverse();
        let backward = Combination::new(backward);
        prop_assert_eq!(forward.check_run(), backward.check_run());
        prop_assert_eq!(forward.check_group(), backward.check_group());
    }

    #[test]
    fn tile_hash_is_pure(tile in tile_strategy()) {
        prop_assert_eq!(tile.hash32(), tile.clone().hash32());
    }

    // Multiset algebra of the diff used by the legality layer.
    #[test]
    fn diff_of_self_is_empty(tiles in tiles_strategy(12)) {
        prop_assert!(tile_multiset_diff(&tiles, &tiles).is_empty());
    }

    #[test]
    fn diff_is_a_sub_multiset_of_the_minuend(
        a in tiles_strategy(12),
        b in tiles_strategy(12),
    ) {
        let diff = tile_multiset_diff(&a, &b);
        prop_assert!(rummikub::is_sub_multiset(&diff, &a));
    }

    #[test]
    fn concat_then_diff_recovers_the_original(
        a in tiles_strategy(10),
        b in tiles_strategy(10),
    ) {
        let mut concat = a.clone();
        concat.extend(b.iter().cloned());
        let recovered = tile_multiset_diff(&concat, &b);
        prop_assert_eq!(sorted_names(&recovered), sorted_names(&a));
    }

    #[test]
    fn summed_value_is_non_negative(tiles in tiles_strategy(12)) {
        prop_assert!(summed_value(&tiles) >= 0);
    }
}

// Equal (rules, seed, players) must serialize to equal bytes, hands and
// pile included.
#[test]
fn same_seed_games_serialize_identically() {
    let build = || {
        Game::new(
            Rules::default(),
            1234,
            vec![Player::new_human("a"), Player::new_human("b")],
        )
        .unwrap()
    };
    assert_eq!(
        build().serialize().unwrap(),
        build().serialize().unwrap()
    );
}

// Forfeit rounds move tiles from the pile into hands, one per committed
// move, conserving the play set.
#[test]
fn forfeits_conserve_tiles() {
    let rules = Rules::default();
    let mut game = Game::new(
        rules.clone(),
        9,
        vec![Player::new_human("a"), Player::new_human("b")],
    )
    .unwrap();

    for _ in 0..6 {
        let author = game.current_player().name.clone();
        let (accepted, _) = game.process_move(rummikub::Move::new(author, Vec::new()));
        assert!(accepted);
    }

    let total: usize = game.pile().len()
        + game
            .players()
            .iter()
            .map(|p| p.hand().len())
            .sum::<usize>();
    assert_eq!(total, rules.all_tiles().len());
    assert_eq!(game.history().len(), 6);
}
