//! Matchmaking lobby: waiting-room slots keyed by (game mode, stake).
//!
//! The whole lobby state sits behind one mutex so that two simultaneous
//! joiners for the same (mode, stake) can never both create entries or
//! both pair into different games.

use std::collections::HashMap;

use parking_lot::Mutex;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::domain::engine::GameMode;
use crate::services::sessions::PlayerRef;

#[derive(Debug, Clone)]
pub struct LobbyEntry {
    pub id: Uuid,
    pub mode: GameMode,
    pub bet_amount: u32,
    pub waiting: PlayerRef,
    pub created_at: OffsetDateTime,
}

#[derive(Debug)]
pub enum JoinOutcome {
    /// First compatible player; waiting for an opponent.
    Waiting { lobby_id: Uuid },
    /// Second compatible player arrived; the pair is ready to play.
    Paired {
        lobby_id: Uuid,
        opponent: PlayerRef,
    },
}

#[derive(Default)]
struct LobbyState {
    entries: HashMap<Uuid, LobbyEntry>,
    by_player: HashMap<i64, Uuid>,
}

#[derive(Default)]
pub struct LobbyManager {
    inner: Mutex<LobbyState>,
}

impl LobbyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the waiting room for (mode, stake). A player already waiting
    /// elsewhere is moved: at most one active wait per player.
    pub fn join(&self, player: PlayerRef, mode: GameMode, bet_amount: u32) -> JoinOutcome {
        let mut state = self.inner.lock();

        if let Some(prior) = state.by_player.remove(&player.user_id) {
            state.entries.remove(&prior);
        }

        let open = state
            .entries
            .values()
            .find(|entry| {
                entry.mode == mode
                    && entry.bet_amount == bet_amount
                    && entry.waiting.user_id != player.user_id
            })
            .map(|entry| entry.id);

        if let Some(lobby_id) = open {
            if let Some(entry) = state.entries.remove(&lobby_id) {
                state.by_player.remove(&entry.waiting.user_id);
                info!(
                    lobby_id = %lobby_id,
                    user_id = player.user_id,
                    opponent_user_id = entry.waiting.user_id,
                    "lobby paired"
                );
                return JoinOutcome::Paired {
                    lobby_id,
                    opponent: entry.waiting,
                };
            }
        }

        let lobby_id = Uuid::new_v4();
        state.by_player.insert(player.user_id, lobby_id);
        state.entries.insert(
            lobby_id,
            LobbyEntry {
                id: lobby_id,
                mode,
                bet_amount,
                waiting: player,
                created_at: OffsetDateTime::now_utc(),
            },
        );
        info!(lobby_id = %lobby_id, "lobby entry created");
        JoinOutcome::Waiting { lobby_id }
    }

    /// Remove the player from whatever entry holds them. Silent: nobody
    /// was ever paired with them, so there is no peer to notify.
    pub fn leave(&self, user_id: i64) -> Option<Uuid> {
        let mut state = self.inner.lock();
        let lobby_id = state.by_player.remove(&user_id)?;
        state.entries.remove(&lobby_id);
        info!(lobby_id = %lobby_id, user_id, "lobby entry removed");
        Some(lobby_id)
    }

    pub fn waiting_count(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(user_id: i64) -> PlayerRef {
        PlayerRef {
            user_id,
            name: format!("user-{user_id}"),
        }
    }

    #[test]
    fn second_compatible_joiner_pairs() {
        let lobby = LobbyManager::new();
        let first = lobby.join(player(1), GameMode::Three, 2);
        let JoinOutcome::Waiting { lobby_id } = first else {
            panic!("first joiner should wait");
        };

        let second = lobby.join(player(2), GameMode::Three, 2);
        match second {
            JoinOutcome::Paired {
                lobby_id: paired_id,
                opponent,
            } => {
                assert_eq!(paired_id, lobby_id);
                assert_eq!(opponent.user_id, 1);
            }
            other => panic!("second joiner should pair, got {other:?}"),
        }
        assert_eq!(lobby.waiting_count(), 0);
    }

    #[test]
    fn mode_and_stake_must_both_match() {
        let lobby = LobbyManager::new();
        lobby.join(player(1), GameMode::Three, 2);

        assert!(matches!(
            lobby.join(player(2), GameMode::Nine, 2),
            JoinOutcome::Waiting { .. }
        ));
        assert!(matches!(
            lobby.join(player(3), GameMode::Three, 5),
            JoinOutcome::Waiting { .. }
        ));
        assert_eq!(lobby.waiting_count(), 3);
    }

    #[test]
    fn rejoining_moves_the_player() {
        let lobby = LobbyManager::new();
        lobby.join(player(1), GameMode::Three, 2);
        lobby.join(player(1), GameMode::Nine, 5);
        assert_eq!(lobby.waiting_count(), 1);

        // The stale (mode "3", 2) entry is gone, so a new joiner waits.
        assert!(matches!(
            lobby.join(player(2), GameMode::Three, 2),
            JoinOutcome::Waiting { .. }
        ));
        // And the moved player is found under the new key.
        assert!(matches!(
            lobby.join(player(3), GameMode::Nine, 5),
            JoinOutcome::Paired { .. }
        ));
    }

    #[test]
    fn a_player_cannot_pair_with_themselves() {
        let lobby = LobbyManager::new();
        lobby.join(player(1), GameMode::Three, 2);
        assert!(matches!(
            lobby.join(player(1), GameMode::Three, 2),
            JoinOutcome::Waiting { .. }
        ));
    }

    #[test]
    fn leave_deletes_the_entry() {
        let lobby = LobbyManager::new();
        lobby.join(player(1), GameMode::Three, 2);
        assert!(lobby.leave(1).is_some());
        assert!(lobby.leave(1).is_none());
        assert_eq!(lobby.waiting_count(), 0);
    }
}
