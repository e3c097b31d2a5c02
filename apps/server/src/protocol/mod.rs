pub mod game_state;

pub use game_state::{GameStateView, GameStatus, MatchSideView, MatchStateView, PlayerView, TablePlay};
