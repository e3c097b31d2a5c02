pub mod match_system;

pub use match_system::{MarkRules, MatchSystemConfig, SeriesTieBreak};

use std::env;

use crate::error::AppError;

/// Process-level configuration read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL of the records API (persistence collaborator),
    /// e.g. `http://localhost:8000/api`.
    pub records_api_url: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let host = env::var("BISCA_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("BISCA_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| AppError::config("BISCA_PORT must be a valid port number"))?;
        let records_api_url = env::var("RECORDS_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000/api".to_string());

        Ok(Self {
            host,
            port,
            records_api_url,
        })
    }
}

/// Full application configuration: process settings plus game rules.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub match_system: MatchSystemConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            match_system: MatchSystemConfig::default(),
        })
    }
}
