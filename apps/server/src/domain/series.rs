//! Best-of-N series aggregation over repeated games between the same
//! two players, with a fixed per-game coin stake.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::{MarkRules, SeriesTieBreak};
use crate::domain::engine::Seat;

#[derive(Debug, Clone)]
pub struct SeriesSide {
    pub user_id: i64,
    pub marks: u8,
    pub coins_bet: u32,
    pub coins_won: u32,
}

impl SeriesSide {
    fn new(user_id: i64) -> Self {
        Self {
            user_id,
            marks: 0,
            coins_bet: 0,
            coins_won: 0,
        }
    }
}

/// Summary of one completed game within the series.
#[derive(Debug, Clone)]
pub struct GameSummary {
    pub game_id: Uuid,
    pub winner: Option<Seat>,
    pub scores: [u16; 2],
    pub recorded_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStatus {
    Ongoing,
    Finished,
}

/// How a recorded game moved the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesProgress {
    Ongoing,
    /// `winner` is None only under the tie-break policies that allow a
    /// drawn series (pot splits evenly).
    Finished { winner: Option<Seat> },
}

#[derive(Debug, Clone)]
pub struct MatchSeries {
    pub id: Uuid,
    pub sides: [SeriesSide; 2],
    pub bet_per_game: u32,
    pub marks_to_win: u8,
    pub games: Vec<GameSummary>,
    pub status: SeriesStatus,
    pub winner: Option<Seat>,
    pub created_at: OffsetDateTime,
    pub finished_at: Option<OffsetDateTime>,
}

impl MatchSeries {
    pub fn new(player1_user_id: i64, player2_user_id: i64, bet_per_game: u32, marks_to_win: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            sides: [
                SeriesSide::new(player1_user_id),
                SeriesSide::new(player2_user_id),
            ],
            bet_per_game,
            marks_to_win,
            games: Vec::new(),
            status: SeriesStatus::Ongoing,
            winner: None,
            created_at: OffsetDateTime::now_utc(),
            finished_at: None,
        }
    }

    pub fn side(&self, seat: Seat) -> &SeriesSide {
        &self.sides[seat.idx()]
    }

    pub fn seat_of(&self, user_id: i64) -> Option<Seat> {
        if self.sides[0].user_id == user_id {
            Some(Seat::Player1)
        } else if self.sides[1].user_id == user_id {
            Some(Seat::Player2)
        } else {
            None
        }
    }

    /// Total pot accumulated so far (both ledgers).
    pub fn total_pot(&self) -> u32 {
        self.sides[0].coins_bet + self.sides[1].coins_bet
    }

    /// Record a naturally-completed game.
    ///
    /// A single game score reaching the flag threshold ends the series in
    /// that player's favor immediately, checked before any mark
    /// accumulation; otherwise marks accrue per bracket and the series
    /// finishes once a side reaches `marks_to_win`.
    pub fn record_game_result(
        &mut self,
        game_id: Uuid,
        scores: [u16; 2],
        winner: Option<Seat>,
        rules: &MarkRules,
        tie_break: SeriesTieBreak,
    ) -> SeriesProgress {
        if self.status == SeriesStatus::Finished {
            return SeriesProgress::Finished {
                winner: self.winner,
            };
        }

        // Coin bookkeeping only; settlement is the records API's concern.
        for side in self.sides.iter_mut() {
            side.coins_bet += self.bet_per_game;
        }
        if let Some(winner) = winner {
            self.sides[winner.idx()].coins_won += self.bet_per_game * 2;
        }

        self.games.push(GameSummary {
            game_id,
            winner,
            scores,
            recorded_at: OffsetDateTime::now_utc(),
        });

        // A flag is an instant series win, not just two marks.
        for seat in [Seat::Player1, Seat::Player2] {
            if rules.is_flag(scores[seat.idx()]) {
                self.sides[seat.idx()].marks += rules.marks_for(scores[seat.idx()]);
                return self.finish(Some(seat));
            }
        }

        self.sides[0].marks += rules.marks_for(scores[0]);
        self.sides[1].marks += rules.marks_for(scores[1]);

        let p1_hit = self.sides[0].marks >= self.marks_to_win;
        let p2_hit = self.sides[1].marks >= self.marks_to_win;
        match (p1_hit, p2_hit) {
            (true, false) => self.finish(Some(Seat::Player1)),
            (false, true) => self.finish(Some(Seat::Player2)),
            (true, true) => match tie_break {
                SeriesTieBreak::LastGameWinner => self.finish(winner),
                SeriesTieBreak::SplitPot => self.finish(None),
            },
            (false, false) => SeriesProgress::Ongoing,
        }
    }

    /// The non-surrendering player is awarded an immediate series win.
    /// Timeouts and mid-game disconnects take this same path.
    pub fn record_surrender(&mut self, surrendered_by: Seat) -> SeriesProgress {
        if self.status == SeriesStatus::Finished {
            return SeriesProgress::Finished {
                winner: self.winner,
            };
        }
        self.finish(Some(surrendered_by.other()))
    }

    fn finish(&mut self, winner: Option<Seat>) -> SeriesProgress {
        self.status = SeriesStatus::Finished;
        self.winner = winner;
        self.finished_at = Some(OffsetDateTime::now_utc());

        // Entire accumulated pot to the series winner; even split when the
        // tie-break policy settles without one.
        let pot = self.total_pot();
        match winner {
            Some(seat) => {
                self.sides[seat.idx()].coins_won = pot;
                self.sides[seat.other().idx()].coins_won = 0;
            }
            None => {
                self.sides[0].coins_won = pot / 2;
                self.sides[1].coins_won = pot - pot / 2;
            }
        }

        SeriesProgress::Finished { winner }
    }
}
