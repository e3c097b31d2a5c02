#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod errors;
pub mod health;
pub mod middleware;
pub mod protocol;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod ws;

// Re-exports for public API
pub use config::{AppConfig, MarkRules, MatchSystemConfig, SeriesTieBreak, ServerConfig};
pub use domain::cards::{card_value, second_card_wins, Card, Rank, Suit};
pub use domain::engine::{BiscaEngine, GameMode, Phase, Seat};
pub use error::AppError;
pub use errors::domain::DomainError;
pub use state::app_state::AppState;

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
