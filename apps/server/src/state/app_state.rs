use std::sync::Arc;

use crate::adapters::records_api::GameRecordStore;
use crate::config::{AppConfig, MatchSystemConfig};
use crate::services::lobby::LobbyManager;
use crate::services::matches::MatchCoordinator;
use crate::services::sessions::GameSessionManager;
use crate::ws::hub::ConnectionRegistry;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub hub: Arc<ConnectionRegistry>,
    pub sessions: Arc<GameSessionManager>,
}

impl AppState {
    /// Wire up the managers around the given records store.
    pub fn new(config: AppConfig, records: Arc<dyn GameRecordStore>) -> Self {
        let config = Arc::new(config);
        let match_system = Arc::new(config.match_system.clone());
        let hub = Arc::new(ConnectionRegistry::new());
        let lobby = Arc::new(LobbyManager::new());
        let matches = Arc::new(MatchCoordinator::new(Arc::clone(&match_system)));
        let sessions = GameSessionManager::new(
            match_system,
            Arc::clone(&hub),
            lobby,
            matches,
            records,
        );

        Self {
            config,
            hub,
            sessions,
        }
    }

    /// State with compressed timings and the given store, for tests.
    pub fn for_tests(match_system: MatchSystemConfig, records: Arc<dyn GameRecordStore>) -> Self {
        let config = AppConfig {
            server: crate::config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                records_api_url: "http://localhost:0".to_string(),
            },
            match_system,
        };
        Self::new(config, records)
    }
}
