pub mod lobby;
pub mod matches;
pub mod sessions;

pub use lobby::{JoinOutcome, LobbyManager};
pub use matches::MatchCoordinator;
pub use sessions::{GameSessionManager, PlayerRef};
