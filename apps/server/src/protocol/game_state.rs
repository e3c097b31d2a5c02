//! Per-viewer state snapshots sent over the realtime channel.
//!
//! A snapshot is always personalized: the viewer sees their own hand,
//! but only the card count of the opponent's.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::cards::Card;
use crate::domain::engine::Seat;
use crate::domain::series::{MatchSeries, SeriesStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Playing,
    Finished,
}

/// One card on the table with its owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePlay {
    pub player: Seat,
    pub card: Card,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub user_id: i64,
    pub name: String,
    pub score: u16,
    pub marks: u8,
    /// Own cards for the viewer; empty for the opponent.
    pub hand: Vec<Card>,
    /// Card count, visible for both players.
    pub hand_size: u8,
    pub trick_count: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub game_id: Uuid,
    pub status: GameStatus,
    pub current_player: Seat,
    pub turn_time_remaining_ms: u64,
    pub player1: PlayerView,
    pub player2: PlayerView,
    pub table: Vec<TablePlay>,
    pub trump_card: Card,
    pub deck_remaining: u8,
    pub winner: Option<Seat>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSideView {
    pub user_id: i64,
    pub marks: u8,
    pub coins_bet: u32,
    pub coins_won: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStateView {
    pub match_id: Uuid,
    pub player1: MatchSideView,
    pub player2: MatchSideView,
    pub marks_to_win: u8,
    pub game_count: u32,
    pub status: &'static str,
    pub winner_user_id: Option<i64>,
}

impl MatchStateView {
    pub fn from_series(series: &MatchSeries) -> Self {
        let side = |seat: Seat| {
            let s = series.side(seat);
            MatchSideView {
                user_id: s.user_id,
                marks: s.marks,
                coins_bet: s.coins_bet,
                coins_won: s.coins_won,
            }
        };
        Self {
            match_id: series.id,
            player1: side(Seat::Player1),
            player2: side(Seat::Player2),
            marks_to_win: series.marks_to_win,
            game_count: series.games.len() as u32,
            status: match series.status {
                SeriesStatus::Ongoing => "ongoing",
                SeriesStatus::Finished => "finished",
            },
            winner_user_id: series.winner.map(|seat| series.side(seat).user_id),
        }
    }
}
