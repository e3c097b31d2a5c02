//! Lobby-to-game pairing through the session manager.

use std::sync::Arc;

use bisca_server::adapters::records_api::{GameRecordStore, InMemoryRecordStore};
use bisca_server::config::MatchSystemConfig;
use bisca_server::domain::engine::GameMode;
use bisca_server::protocol::game_state::GameStatus;
use bisca_server::services::sessions::PlayerRef;
use bisca_server::state::app_state::AppState;

fn player(user_id: i64) -> PlayerRef {
    PlayerRef {
        user_id,
        name: format!("user-{user_id}"),
    }
}

fn test_state() -> (AppState, Arc<InMemoryRecordStore>) {
    let records = Arc::new(InMemoryRecordStore::new());
    records.add_user(1, "Ana");
    records.add_user(2, "Bruno");
    let state = AppState::for_tests(
        MatchSystemConfig::default(),
        Arc::clone(&records) as Arc<dyn GameRecordStore>,
    );
    (state, records)
}

#[tokio::test]
async fn two_joiners_in_succession_get_one_game() {
    let (state, _records) = test_state();

    state
        .sessions
        .join_lobby(player(1), GameMode::Three, 2)
        .await;
    assert_eq!(state.sessions.active_games(), 0);
    assert!(state.sessions.game_of(1).is_none());

    state
        .sessions
        .join_lobby(player(2), GameMode::Three, 2)
        .await;
    assert_eq!(state.sessions.active_games(), 1);

    let game_id = state.sessions.game_of(1).expect("game exists");
    assert_eq!(state.sessions.game_of(2), Some(game_id));

    // Mode "3": both start with three cards, 34 left in the stock.
    let view = state.sessions.state_view(game_id, 1).expect("view for p1");
    assert_eq!(view.status, GameStatus::Playing);
    assert_eq!(view.player1.hand.len(), 3);
    assert_eq!(view.player1.hand_size, 3);
    assert_eq!(view.player2.hand_size, 3);
    assert_eq!(view.deck_remaining, 34);
    assert!(view.winner.is_none());
}

#[tokio::test]
async fn display_names_come_from_the_records_api() {
    let (state, _records) = test_state();
    state
        .sessions
        .join_lobby(player(1), GameMode::Three, 2)
        .await;
    state
        .sessions
        .join_lobby(player(2), GameMode::Three, 2)
        .await;

    let game_id = state.sessions.game_of(1).unwrap();
    let view = state.sessions.state_view(game_id, 1).unwrap();
    assert_eq!(view.player1.name, "Ana");
    assert_eq!(view.player2.name, "Bruno");
}

#[tokio::test]
async fn unknown_user_falls_back_to_the_payload_name() {
    let (state, _records) = test_state();
    state
        .sessions
        .join_lobby(player(9), GameMode::Three, 2)
        .await;
    state
        .sessions
        .join_lobby(player(2), GameMode::Three, 2)
        .await;

    let game_id = state.sessions.game_of(9).unwrap();
    let view = state.sessions.state_view(game_id, 9).unwrap();
    assert_eq!(view.player1.name, "user-9");
}

#[tokio::test]
async fn opponents_hand_is_never_revealed() {
    let (state, _records) = test_state();
    state
        .sessions
        .join_lobby(player(1), GameMode::Nine, 2)
        .await;
    state
        .sessions
        .join_lobby(player(2), GameMode::Nine, 2)
        .await;

    let game_id = state.sessions.game_of(1).unwrap();
    let for_p1 = state.sessions.state_view(game_id, 1).unwrap();
    assert_eq!(for_p1.player1.hand.len(), 9);
    assert!(for_p1.player2.hand.is_empty());
    assert_eq!(for_p1.player2.hand_size, 9);

    let for_p2 = state.sessions.state_view(game_id, 2).unwrap();
    assert!(for_p2.player1.hand.is_empty());
    assert_eq!(for_p2.player2.hand.len(), 9);
}

#[tokio::test]
async fn mismatched_stakes_wait_separately() {
    let (state, _records) = test_state();
    state
        .sessions
        .join_lobby(player(1), GameMode::Three, 2)
        .await;
    state
        .sessions
        .join_lobby(player(2), GameMode::Three, 5)
        .await;
    assert_eq!(state.sessions.active_games(), 0);
}

#[tokio::test]
async fn lobby_leave_removes_the_wait() {
    let (state, _records) = test_state();
    state
        .sessions
        .join_lobby(player(1), GameMode::Three, 2)
        .await;
    state.sessions.leave_lobby(1);

    state
        .sessions
        .join_lobby(player(2), GameMode::Three, 2)
        .await;
    // Player 1 left, so player 2 waits instead of pairing.
    assert_eq!(state.sessions.active_games(), 0);
}
