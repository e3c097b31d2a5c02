//! Client for the external records API (persistence collaborator).
//!
//! The game core only consumes two narrow contracts here: storing a
//! finished game with its trick-by-trick log, and reading a user's
//! display name at session join. Persistence is best-effort from the
//! engine's perspective; callers log failures and move on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::cards::{Rank, Suit};
use crate::domain::engine::GameMode;
use crate::error::AppError;

/// Body of `POST /games`.
#[derive(Debug, Clone, Serialize)]
pub struct GameRecordRow {
    #[serde(rename = "type")]
    pub game_type: GameMode,
    pub player1_user_id: i64,
    pub player2_user_id: i64,
    pub is_draw: bool,
    pub winner_user_id: Option<i64>,
    pub loser_user_id: Option<i64>,
    pub match_id: Option<Uuid>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub began_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ended_at: OffsetDateTime,
    /// Elapsed seconds.
    pub total_time: i64,
    pub player1_points: u16,
    pub player2_points: u16,
}

/// One row of `POST /game-tricks/batch`; `game_id` is injected per batch.
#[derive(Debug, Clone, Serialize)]
pub struct TrickRow {
    pub trick_number: u8,
    pub card1_id: String,
    pub card1_suit: Suit,
    pub card1_rank: Rank,
    pub card1_value: u16,
    pub card1_player_id: i64,
    pub card2_id: String,
    pub card2_suit: Suit,
    pub card2_rank: Rank,
    pub card2_value: u16,
    pub card2_player_id: i64,
    pub winner_user_id: i64,
    pub points_won: u16,
    pub trump_suit: Suit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub name: String,
}

#[async_trait]
pub trait GameRecordStore: Send + Sync {
    /// Store a finished game; returns the opaque record id assigned by
    /// the records API.
    async fn create_game(&self, row: &GameRecordRow) -> Result<i64, AppError>;

    /// Store the trick log of a finished game in one batch.
    async fn create_tricks(&self, game_record_id: i64, rows: &[TrickRow]) -> Result<(), AppError>;

    /// Read a user's identity/display name.
    async fn fetch_user(&self, user_id: i64) -> Result<UserIdentity, AppError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct CreatedGame {
    id: i64,
}

#[derive(Serialize)]
struct TrickBatchRow<'a> {
    game_id: i64,
    #[serde(flatten)]
    row: &'a TrickRow,
}

#[derive(Serialize)]
struct TrickBatch<'a> {
    tricks: Vec<TrickBatchRow<'a>>,
}

pub struct HttpRecordsApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRecordsApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl GameRecordStore for HttpRecordsApi {
    async fn create_game(&self, row: &GameRecordRow) -> Result<i64, AppError> {
        let url = format!("{}/games", self.base_url);
        let created: Envelope<CreatedGame> = self
            .client
            .post(&url)
            .json(row)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(created.data.id)
    }

    async fn create_tricks(&self, game_record_id: i64, rows: &[TrickRow]) -> Result<(), AppError> {
        if rows.is_empty() {
            return Ok(());
        }
        let url = format!("{}/game-tricks/batch", self.base_url);
        let body = TrickBatch {
            tricks: rows
                .iter()
                .map(|row| TrickBatchRow {
                    game_id: game_record_id,
                    row,
                })
                .collect(),
        };
        self.client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn fetch_user(&self, user_id: i64) -> Result<UserIdentity, AppError> {
        let url = format!("{}/users/{user_id}", self.base_url);
        let user: Envelope<UserIdentity> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(user.data)
    }
}

/// In-memory store for tests: captures what would have been persisted.
#[derive(Default)]
pub struct InMemoryRecordStore {
    inner: parking_lot::Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    next_id: i64,
    games: Vec<(i64, GameRecordRow)>,
    tricks: Vec<(i64, Vec<TrickRow>)>,
    users: std::collections::HashMap<i64, String>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user_id: i64, name: impl Into<String>) {
        self.inner.lock().users.insert(user_id, name.into());
    }

    pub fn games(&self) -> Vec<(i64, GameRecordRow)> {
        self.inner.lock().games.clone()
    }

    pub fn tricks(&self) -> Vec<(i64, Vec<TrickRow>)> {
        self.inner.lock().tricks.clone()
    }
}

#[async_trait]
impl GameRecordStore for InMemoryRecordStore {
    async fn create_game(&self, row: &GameRecordRow) -> Result<i64, AppError> {
        let mut state = self.inner.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.games.push((id, row.clone()));
        Ok(id)
    }

    async fn create_tricks(&self, game_record_id: i64, rows: &[TrickRow]) -> Result<(), AppError> {
        self.inner
            .lock()
            .tricks
            .push((game_record_id, rows.to_vec()));
        Ok(())
    }

    async fn fetch_user(&self, user_id: i64) -> Result<UserIdentity, AppError> {
        let state = self.inner.lock();
        match state.users.get(&user_id) {
            Some(name) => Ok(UserIdentity {
                id: user_id,
                name: name.clone(),
            }),
            None => Err(AppError::upstream(format!("user {user_id} not found"))),
        }
    }
}
