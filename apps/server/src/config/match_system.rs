//! Match-system rules and timings.
//!
//! The mark brackets are configurable constants rather than hardcoded law:
//! the bracket values below (61/91/120) are the standard table, but callers
//! may construct their own `MarkRules`.

use std::time::Duration;

/// Per-game mark awards derived from a final score.
#[derive(Debug, Clone)]
pub struct MarkRules {
    /// Lowest score earning any marks ("risca").
    pub risca_min: u16,
    /// Lowest score earning the higher bracket ("capote").
    pub capote_min: u16,
    /// Score that ends the series outright ("bandeira").
    pub flag_min: u16,
    pub risca_marks: u8,
    pub capote_marks: u8,
    pub flag_marks: u8,
}

impl Default for MarkRules {
    fn default() -> Self {
        Self {
            risca_min: 61,
            capote_min: 91,
            flag_min: 120,
            risca_marks: 1,
            capote_marks: 2,
            flag_marks: 2,
        }
    }
}

impl MarkRules {
    /// Marks awarded for a single game's final score.
    pub fn marks_for(&self, score: u16) -> u8 {
        if score >= self.flag_min {
            self.flag_marks
        } else if score >= self.capote_min {
            self.capote_marks
        } else if score >= self.risca_min {
            self.risca_marks
        } else {
            0
        }
    }

    /// Whether a score ends the series immediately, regardless of marks.
    pub fn is_flag(&self, score: u16) -> bool {
        score >= self.flag_min
    }
}

/// Policy for the never-expected case where both sides cross the mark
/// threshold in the same game, or a series must settle with no winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesTieBreak {
    /// The winner of the triggering game takes the series; if that game
    /// was drawn, the pot splits evenly.
    LastGameWinner,
    /// Split the pot evenly, no series winner.
    SplitPot,
}

#[derive(Debug, Clone)]
pub struct MatchSystemConfig {
    /// Time a player has to act on their turn.
    pub turn_timeout: Duration,
    /// How long both played cards stay visible before the trick resolves.
    pub reveal_delay: Duration,
    /// Cadence of the per-game state broadcast (client timer sync).
    pub broadcast_interval: Duration,
    /// Marks needed to win a series.
    pub marks_to_win: u8,
    pub marks: MarkRules,
    pub tie_break: SeriesTieBreak,
}

impl Default for MatchSystemConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(30),
            reveal_delay: Duration::from_secs(2),
            broadcast_interval: Duration::from_secs(1),
            marks_to_win: 4,
            marks: MarkRules::default(),
            tie_break: SeriesTieBreak::LastGameWinner,
        }
    }
}

impl MatchSystemConfig {
    /// Same rules with compressed timings, for tests that drive timers.
    pub fn with_timings(turn_timeout: Duration, reveal_delay: Duration) -> Self {
        Self {
            turn_timeout,
            reveal_delay,
            broadcast_interval: Duration::from_millis(50),
            ..Self::default()
        }
    }
}
