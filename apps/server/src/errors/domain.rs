//! Domain-level error type used across the engine, series, and session layers.
//!
//! This error type is HTTP- and transport-agnostic. The WebSocket and session
//! layers return `Result<T, crate::error::AppError>` and convert from
//! `DomainError` using the provided `From` implementation.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Closed set of rule-violation kinds. Add new kinds here; never pass
/// ad-hoc strings as violation identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ValidationKind {
    /// Action attempted by a player out of turn
    NotPlayersTurn,
    /// Played card is not in the acting player's hand
    CardNotInHand,
    /// Off-suit play while holding the led suit in no-draw phase
    MustFollowSuit,
    /// Trick resolution requested with fewer than two cards on the table
    TrickNotComplete,
    /// Play attempted while a completed trick awaits resolution
    TrickAlreadyComplete,
    /// Action attempted on a finished game
    GameFinished,
    /// Malformed card token
    ParseCard,
}

impl ValidationKind {
    /// Canonical SCREAMING_SNAKE_CASE code for API surfaces.
    pub fn code(self) -> &'static str {
        match self {
            ValidationKind::NotPlayersTurn => "NOT_PLAYERS_TURN",
            ValidationKind::CardNotInHand => "CARD_NOT_IN_HAND",
            ValidationKind::MustFollowSuit => "MUST_FOLLOW_SUIT",
            ValidationKind::TrickNotComplete => "TRICK_NOT_COMPLETE",
            ValidationKind::TrickAlreadyComplete => "TRICK_ALREADY_COMPLETE",
            ValidationKind::GameFinished => "GAME_FINISHED",
            ValidationKind::ParseCard => "PARSE_CARD",
        }
    }
}

/// Domain-level not found entities
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    Game,
    Match,
    Lobby,
    User,
}

/// Central domain error type
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Game-rule or input violation; state is unchanged
    Validation(ValidationKind, String),
    /// Missing resource in domain terms
    NotFound(NotFoundKind, String),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::Validation(kind, d) => write!(f, "validation {kind:?}: {d}"),
            DomainError::NotFound(kind, d) => write!(f, "not found {kind:?}: {d}"),
        }
    }
}

impl Error for DomainError {}

impl DomainError {
    pub fn validation(kind: ValidationKind, detail: impl Into<String>) -> Self {
        Self::Validation(kind, detail.into())
    }

    pub fn not_found(kind: NotFoundKind, detail: impl Into<String>) -> Self {
        Self::NotFound(kind, detail.into())
    }

    /// Human-readable detail without the kind prefix, suitable for
    /// surfacing to the acting client.
    pub fn detail(&self) -> &str {
        match self {
            DomainError::Validation(_, d) => d,
            DomainError::NotFound(_, d) => d,
        }
    }
}
