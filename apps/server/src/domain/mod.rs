pub mod cards;
pub mod deck;
pub mod engine;
pub mod series;

pub use cards::{card_value, hand_has_suit, second_card_wins, Card, Rank, Suit};
pub use engine::{BiscaEngine, GameMode, Phase, PlayOutcome, Seat, TrickRecord};
pub use series::{MatchSeries, SeriesProgress, SeriesStatus};
