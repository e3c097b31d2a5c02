//! Registry of live match series.
//!
//! A series is only ever mutated from the game-end path of its one active
//! game, but the registry itself is shared across games and guarded
//! accordingly. Finished series are dropped from the registry after the
//! final report is produced.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::config::MatchSystemConfig;
use crate::domain::engine::Seat;
use crate::domain::series::{MatchSeries, SeriesProgress};
use crate::protocol::game_state::MatchStateView;

/// What the session layer needs to report after a series update.
#[derive(Debug, Clone)]
pub struct SeriesReport {
    pub view: MatchStateView,
    pub finished: Option<SeriesFinish>,
}

#[derive(Debug, Clone)]
pub struct SeriesFinish {
    pub winner_user_id: Option<i64>,
    pub winner_payout: u32,
    pub total_bet: u32,
}

pub struct MatchCoordinator {
    config: Arc<MatchSystemConfig>,
    series: DashMap<Uuid, Arc<Mutex<MatchSeries>>>,
}

impl MatchCoordinator {
    pub fn new(config: Arc<MatchSystemConfig>) -> Self {
        Self {
            config,
            series: DashMap::new(),
        }
    }

    pub fn create_match(&self, player1_user_id: i64, player2_user_id: i64, bet_per_game: u32) -> Uuid {
        let series = MatchSeries::new(
            player1_user_id,
            player2_user_id,
            bet_per_game,
            self.config.marks_to_win,
        );
        let id = series.id;
        self.series.insert(id, Arc::new(Mutex::new(series)));
        id
    }

    pub fn active_count(&self) -> usize {
        self.series.len()
    }

    /// Record a naturally-completed game on its series.
    pub fn record_game_result(
        &self,
        match_id: Uuid,
        game_id: Uuid,
        scores: [u16; 2],
        winner: Option<Seat>,
    ) -> Option<SeriesReport> {
        let handle = self.series.get(&match_id).map(|s| Arc::clone(s.value()))?;
        let report = {
            let mut series = handle.lock();
            let progress = series.record_game_result(
                game_id,
                scores,
                winner,
                &self.config.marks,
                self.config.tie_break,
            );
            build_report(&series, progress)
        };
        if report.finished.is_some() {
            self.series.remove(&match_id);
        }
        Some(report)
    }

    /// A surrender (or its equivalents: timeout, disconnect) ends the
    /// series in the opponent's favor.
    pub fn record_surrender(&self, match_id: Uuid, surrendered_by_user: i64) -> Option<SeriesReport> {
        let handle = self.series.get(&match_id).map(|s| Arc::clone(s.value()))?;
        let report = {
            let mut series = handle.lock();
            let Some(seat) = series.seat_of(surrendered_by_user) else {
                warn!(
                    match_id = %match_id,
                    user_id = surrendered_by_user,
                    "surrender from a non-participant ignored"
                );
                return None;
            };
            let progress = series.record_surrender(seat);
            build_report(&series, progress)
        };
        self.series.remove(&match_id);
        Some(report)
    }
}

fn build_report(series: &MatchSeries, progress: SeriesProgress) -> SeriesReport {
    let finished = match progress {
        SeriesProgress::Ongoing => None,
        SeriesProgress::Finished { winner } => Some(SeriesFinish {
            winner_user_id: winner.map(|seat| series.side(seat).user_id),
            winner_payout: winner
                .map(|seat| series.side(seat).coins_won)
                .unwrap_or_else(|| series.side(Seat::Player1).coins_won),
            total_bet: series.total_pot(),
        }),
    };
    SeriesReport {
        view: MatchStateView::from_series(series),
        finished,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> MatchCoordinator {
        MatchCoordinator::new(Arc::new(MatchSystemConfig::default()))
    }

    #[test]
    fn records_and_finishes_a_series() {
        let coord = coordinator();
        let match_id = coord.create_match(1, 2, 2);

        let report = coord
            .record_game_result(match_id, Uuid::new_v4(), [95, 25], Some(Seat::Player1))
            .unwrap();
        assert!(report.finished.is_none());
        assert_eq!(report.view.player1.marks, 2);
        assert_eq!(coord.active_count(), 1);

        let report = coord
            .record_game_result(match_id, Uuid::new_v4(), [120, 0], Some(Seat::Player1))
            .unwrap();
        let finish = report.finished.expect("flag ends the series");
        assert_eq!(finish.winner_user_id, Some(1));
        assert_eq!(finish.total_bet, 8);
        assert_eq!(finish.winner_payout, 8);
        // Finished series leave the registry.
        assert_eq!(coord.active_count(), 0);
        assert!(coord
            .record_game_result(match_id, Uuid::new_v4(), [70, 50], Some(Seat::Player1))
            .is_none());
    }

    #[test]
    fn surrender_report_names_the_opponent() {
        let coord = coordinator();
        let match_id = coord.create_match(1, 2, 2);
        let report = coord.record_surrender(match_id, 1).unwrap();
        assert_eq!(report.finished.unwrap().winner_user_id, Some(2));
        assert_eq!(coord.active_count(), 0);
    }
}
