//! Error handling for the Bisca game server.

pub mod domain;

pub use domain::{DomainError, NotFoundKind, ValidationKind};
