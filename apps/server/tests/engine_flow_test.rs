//! Full-game drives of the engine with seeded decks.

use bisca_server::domain::engine::{BiscaEngine, GameMode, Phase, Seat};

/// Play the first legal card for whoever's turn it is; resolve completed
/// tricks immediately. Returns the number of resolved tricks.
fn drive_to_completion(engine: &mut BiscaEngine) -> u32 {
    let mut tricks = 0;
    while !engine.is_finished() {
        let seat = engine.turn();
        let hand: Vec<_> = engine.hand(seat).to_vec();
        let played = hand
            .into_iter()
            .any(|card| engine.play_card(seat, card).is_ok());
        assert!(played, "a legal play must always exist");

        if engine.table().len() == 2 {
            let deck_before = engine.deck_remaining();
            let trump = engine.trump_card();
            let record = engine.resolve_trick().expect("complete trick resolves");
            tricks += 1;

            if deck_before == 2 {
                // The exposed trump card is the last card drawn, and the
                // trick loser draws second.
                let loser = record.winner.other();
                assert!(
                    engine.hand(loser).contains(&trump),
                    "trump card must be drawn last, by the trick loser"
                );
            }
            if deck_before > 0 && engine.deck_remaining() == 0 && !engine.is_finished() {
                assert_eq!(engine.phase(), Phase::NoDraw);
            }
        }
    }
    tricks
}

#[test]
fn mode_three_finishes_exactly_at_simultaneous_emptiness() {
    for seed in [1u64, 7, 99, 1234, 987654] {
        let mut engine = BiscaEngine::new(GameMode::Three, seed);
        assert_eq!(engine.deck_remaining(), 34);

        let tricks = drive_to_completion(&mut engine);
        assert_eq!(tricks, 20, "40 cards, two per trick");
        assert_eq!(engine.deck_remaining(), 0);
        assert!(engine.hand(Seat::Player1).is_empty());
        assert!(engine.hand(Seat::Player2).is_empty());
        assert_eq!(engine.phase(), Phase::Finished);
    }
}

#[test]
fn mode_nine_runs_to_completion_too() {
    let mut engine = BiscaEngine::new(GameMode::Nine, 31337);
    assert_eq!(engine.deck_remaining(), 22);
    let tricks = drive_to_completion(&mut engine);
    assert_eq!(tricks, 20);
    assert_eq!(engine.phase(), Phase::Finished);
}

#[test]
fn points_conserve_and_winner_has_the_higher_score() {
    for seed in 0u64..25 {
        let mut engine = BiscaEngine::new(GameMode::Three, seed);
        drive_to_completion(&mut engine);

        let p1 = engine.score(Seat::Player1);
        let p2 = engine.score(Seat::Player2);
        assert_eq!(p1 + p2, 120, "seed {seed}");
        match engine.winner() {
            Some(Seat::Player1) => assert!(p1 > p2),
            Some(Seat::Player2) => assert!(p2 > p1),
            None => assert_eq!(p1, 60),
        }
    }
}

#[test]
fn trick_history_is_complete_and_ordered() {
    let mut engine = BiscaEngine::new(GameMode::Three, 5);
    drive_to_completion(&mut engine);

    let tricks = engine.tricks();
    assert_eq!(tricks.len(), 20);
    for (i, trick) in tricks.iter().enumerate() {
        assert_eq!(trick.number as usize, i + 1);
        assert_eq!(trick.trump_suit, engine.trump_suit());
        let points: u16 = trick.plays.iter().map(|(_, card)| card.value()).sum();
        assert_eq!(points, trick.points);
    }
    let total: u16 = tricks.iter().map(|t| t.points).sum();
    assert_eq!(total, 120);
}
