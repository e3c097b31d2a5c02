//! Typed wire messages for the realtime channel.
//!
//! A closed set of tagged variants at the transport boundary: unrecognized
//! or malformed payloads are rejected at parse time rather than failing
//! deep inside game logic. Payload keys are camelCase to match the
//! browser client.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::engine::GameMode;
use crate::protocol::game_state::{GameStateView, MatchStateView, TablePlay};

/// Inbound events from a connected client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMsg {
    #[serde(rename = "lobby:join", rename_all = "camelCase")]
    LobbyJoin {
        user_id: i64,
        name: String,
        game_type: GameMode,
        bet_amount: u32,
    },

    #[serde(rename = "lobby:leave")]
    LobbyLeave {},

    #[serde(rename = "game:play_card", rename_all = "camelCase")]
    PlayCard { game_id: Uuid, card_id: String },

    #[serde(rename = "game:surrender", rename_all = "camelCase")]
    Surrender { game_id: Uuid },

    #[serde(rename = "game:request_state", rename_all = "camelCase")]
    RequestState { game_id: Uuid },
}

/// Outbound events to a connected client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMsg {
    #[serde(rename = "lobby:waiting", rename_all = "camelCase")]
    LobbyWaiting { lobby_id: Uuid },

    /// A seat opened up for the given (mode, stake); sent to idle peers.
    #[serde(rename = "lobby:available", rename_all = "camelCase")]
    LobbyAvailable { lobby_id: Uuid },

    #[serde(rename = "game:start", rename_all = "camelCase")]
    GameStart {
        game_id: Uuid,
        match_id: Uuid,
        game_state: GameStateView,
        opponent_user_id: i64,
        bet_amount: u32,
        game_type: GameMode,
    },

    #[serde(rename = "game:state_update")]
    GameStateUpdate(GameStateView),

    /// Both cards are on the table; resolution follows after the reveal
    /// delay.
    #[serde(rename = "game:trick_complete", rename_all = "camelCase")]
    TrickComplete { table: Vec<TablePlay> },

    #[serde(rename = "game:timeout", rename_all = "camelCase")]
    GameTimeout {
        game_id: Uuid,
        winner_user_id: i64,
        loser_user_id: i64,
    },

    #[serde(rename = "game:surrendered", rename_all = "camelCase")]
    GameSurrendered {
        game_id: Uuid,
        surrendered_by: i64,
        winner_user_id: i64,
    },

    #[serde(rename = "game:opponent_disconnected", rename_all = "camelCase")]
    OpponentDisconnected {
        game_id: Uuid,
        disconnected_user_id: i64,
        winner_user_id: i64,
    },

    /// Definitive end-of-game notification, sent for every outcome path.
    #[serde(rename = "game:ended", rename_all = "camelCase")]
    GameEnded {
        game_id: Uuid,
        is_draw: bool,
        winner_user_id: Option<i64>,
        player1_score: u16,
        player2_score: u16,
    },

    #[serde(rename = "match:game_result", rename_all = "camelCase")]
    MatchGameResult {
        game_id: Uuid,
        winner_user_id: Option<i64>,
        #[serde(rename = "match")]
        match_state: MatchStateView,
    },

    #[serde(rename = "match:finished", rename_all = "camelCase")]
    MatchFinished {
        match_id: Uuid,
        winner_user_id: Option<i64>,
        total_coins_won: u32,
        total_bet: u32,
    },

    #[serde(rename = "game:error")]
    GameError { message: String },
}
