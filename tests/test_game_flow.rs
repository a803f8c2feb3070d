//! Black-box game flows through the public API: dealing, the AI turn
//! driver, and the human boundary.

use std::sync::Arc;

use rummikub::{dissolve, Game, IlpSolver, Player, Rules, SearchSpace};

fn ai(name: &str, space: &Arc<SearchSpace>) -> Player {
    Player::new_ai(name, Arc::new(IlpSolver::with_space(space.clone())))
}

#[test]
fn dealing_is_deterministic_per_seed() {
    let rules = Rules::default();
    let space = SearchSpace::shared(rules.clone());

    let a = Game::new(rules.clone(), 20, vec![ai("A", &space), ai("B", &space)]).unwrap();
    let b = Game::new(rules.clone(), 20, vec![ai("A", &space), ai("B", &space)]).unwrap();
    assert_eq!(a.pile(), b.pile());
    for (pa, pb) in a.players().iter().zip(b.players()) {
        assert_eq!(pa.hand(), pb.hand());
    }

    let c = Game::new(rules, 21, vec![ai("A", &space), ai("B", &space)]).unwrap();
    assert_ne!(a.pile(), c.pile());
}

#[test]
fn ai_turns_stop_at_the_human() {
    let rules = Rules::default();
    let space = SearchSpace::shared(rules.clone());
    let players = vec![
        ai("AI_1", &space),
        ai("AI_2", &space),
        Player::new_human("Human_1"),
    ];
    let mut game = Game::new(rules, 8, players).unwrap();

    game.run_ai_turns();

    // Exactly one committed move per AI, then the loop yields to the human.
    assert_eq!(game.history().len(), 2);
    assert_eq!(game.history()[0].author, "AI_1");
    assert_eq!(game.history()[1].author, "AI_2");
    assert_eq!(game.current_player().name, "Human_1");

    // The human forfeits; the AIs take another round.
    let (accepted, _) = game.process_move(rummikub::Move::new("Human_1", Vec::new()));
    assert!(accepted);
    assert_eq!(game.history()[2].author, "Human_1");

    game.run_ai_turns();
    if !game.has_been_won() {
        assert_eq!(game.history()[3].author, "AI_1");
        assert_eq!(game.history()[4].author, "AI_2");
        assert_eq!(game.current_player().name, "Human_1");
    }
}

#[test]
fn run_ai_turns_is_idempotent_at_the_boundary() {
    let rules = Rules::default();
    let space = SearchSpace::shared(rules.clone());
    let mut game = Game::new(
        rules,
        8,
        vec![ai("AI_1", &space), Player::new_human("Human_1")],
    )
    .unwrap();

    game.run_ai_turns();
    let history = game.history().len();
    game.run_ai_turns();
    assert_eq!(game.history().len(), history, "a second call must be a no-op");
}

#[test]
fn full_ai_game_terminates_with_conserved_tiles() {
    let rules = Rules::default();
    let space = SearchSpace::shared(rules.clone());
    let mut game = Game::new(
        rules.clone(),
        20,
        vec![ai("A", &space), ai("B", &space), ai("C", &space)],
    )
    .unwrap();

    game.run_ai_turns();

    // Either somebody emptied their hand or the pile ran dry under a
    // stalemate; both are terminal for the driver.
    assert!(game.has_been_won() || game.pile().is_empty());

    let mut expected: Vec<String> = rules.all_tiles().iter().map(|t| t.to_string()).collect();
    expected.sort();
    let mut actual: Vec<String> = game
        .pile()
        .iter()
        .cloned()
        .chain(game.players().iter().flat_map(|p| p.hand().to_vec()))
        .chain(dissolve(game.table()))
        .map(|t| t.to_string())
        .collect();
    actual.sort();
    assert_eq!(actual, expected);

    // The table after move k is move k's arrangement.
    if let Some(last) = game.history().last() {
        assert_eq!(game.table(), last.arrangement.as_slice());
    }
}

#[test]
fn a_committed_forfeit_ends_first_move_status() {
    let rules = Rules::default();
    let mut game = Game::new(rules, 3, vec![Player::new_human("h")]).unwrap();

    assert!(game.is_first_move("h"));
    let (accepted, _) = game.process_move(rummikub::Move::new("h", Vec::new()));
    assert!(accepted);
    assert!(
        !game.is_first_move("h"),
        "a committed forfeit counts as the player's move"
    );
}

#[test]
fn players_are_found_by_name() {
    let rules = Rules::default();
    let game = Game::new(
        rules,
        5,
        vec![Player::new_human("alice"), Player::new_human("bob")],
    )
    .unwrap();

    assert_eq!(game.get_player("bob").map(|p| p.name.as_str()), Some("bob"));
    assert!(game.get_player("carol").is_none());
    assert_eq!(game.current_player().name, "alice");
}
