//! Playtime provider configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Steam app id of Squad
pub const SQUAD_GAME_ID: u32 = 393380;

/// Which playtime provider answers lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaytimeProviderKind {
    /// Steam Web API, one request per player
    Steam,
    /// Internal playtime service, one request per cohort
    Service,
}

impl std::str::FromStr for PlaytimeProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "steam" => Ok(PlaytimeProviderKind::Steam),
            "service" => Ok(PlaytimeProviderKind::Service),
            other => Err(format!("unknown playtime provider '{}'", other)),
        }
    }
}

impl std::fmt::Display for PlaytimeProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaytimeProviderKind::Steam => write!(f, "steam"),
            PlaytimeProviderKind::Service => write!(f, "service"),
        }
    }
}

/// Playtime provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaytimeSettings {
    pub provider: PlaytimeProviderKind,
    /// Game whose playtime is counted
    pub game_id: u32,
    /// Steam Web API key
    pub steam_api_key: String,
    /// Steam Web API base URL
    pub steam_api_url: String,
    /// Playtime service base URL
    pub service_url: String,
    /// Playtime service secret key
    pub service_secret_key: String,
    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
}

impl Default for PlaytimeSettings {
    fn default() -> Self {
        Self {
            provider: PlaytimeProviderKind::Steam,
            game_id: SQUAD_GAME_ID,
            steam_api_key: String::new(),
            steam_api_url: "https://api.steampowered.com".to_string(),
            service_url: String::new(),
            service_secret_key: String::new(),
            request_timeout_seconds: 10,
        }
    }
}

impl PlaytimeSettings {
    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
