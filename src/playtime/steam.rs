//! Steam Web API playtime source
//!
//! Looks up `playtime_forever` of the configured app through
//! `IPlayerService/GetOwnedGames`. Steam reports minutes.

use crate::error::{BalanceError, Result};
use crate::playtime::source::{PlayerPlaytimeSource, PlaytimeUnit};
use crate::types::PlaytimeResult;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const OWNED_GAMES_PATH: &str = "IPlayerService/GetOwnedGames/v0001/";

#[derive(Debug, Deserialize)]
struct OwnedGamesEnvelope {
    response: OwnedGamesResponse,
}

/// Private profiles answer with an empty `response` object
#[derive(Debug, Default, Deserialize)]
struct OwnedGamesResponse {
    #[serde(default)]
    games: Vec<OwnedGame>,
}

#[derive(Debug, Deserialize)]
struct OwnedGame {
    appid: u32,
    #[serde(default)]
    playtime_forever: u64,
}

/// Per-player source backed by the Steam Web API
pub struct SteamPlaytimeSource {
    client: Client,
    base_url: String,
    api_key: String,
    game_id: u32,
}

impl SteamPlaytimeSource {
    /// Create a new Steam source
    pub fn new(base_url: &str, api_key: &str, game_id: u32, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BalanceError::ConfigurationError {
                message: format!("Failed to build Steam HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            game_id,
        })
    }

    fn owned_games_url(&self) -> String {
        format!("{}/{}", self.base_url, OWNED_GAMES_PATH)
    }
}

#[async_trait]
impl PlayerPlaytimeSource for SteamPlaytimeSource {
    fn unit(&self) -> PlaytimeUnit {
        PlaytimeUnit::Minutes
    }

    async fn playtime(&self, player_id: &str) -> Result<PlaytimeResult> {
        let game_id = self.game_id.to_string();
        let response = self
            .client
            .get(self.owned_games_url())
            .query(&[
                ("key", self.api_key.as_str()),
                ("steamid", player_id),
                ("format", "json"),
                ("include_played_free_games", "1"),
                ("appids_filter[0]", game_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BalanceError::SourceFailed {
                message: format!("Steam request for {} failed: {}", player_id, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BalanceError::SourceFailed {
                message: format!("Steam answered {} for {}", status, player_id),
            }
            .into());
        }

        let envelope: OwnedGamesEnvelope =
            response
                .json()
                .await
                .map_err(|e| BalanceError::MalformedResponse {
                    reason: format!("Steam owned games for {}: {}", player_id, e),
                })?;

        let playtime = envelope
            .response
            .games
            .iter()
            .find(|game| game.appid == self.game_id)
            .map(|game| game.playtime_forever);

        debug!(
            "Steam playtime for {} in app {}: {:?} minutes",
            player_id, self.game_id, playtime
        );

        Ok(match playtime {
            Some(minutes) => PlaytimeResult::Known(minutes as f64),
            None => PlaytimeResult::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const STEAM_ID: &str = "76561198000000001";

    fn create_source(server: &MockServer) -> SteamPlaytimeSource {
        SteamPlaytimeSource::new(&server.base_url(), "test-key", 393380, Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_playtime_of_owned_game() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(GET)
                .path("/IPlayerService/GetOwnedGames/v0001/")
                .query_param("key", "test-key")
                .query_param("steamid", STEAM_ID)
                .query_param("format", "json");
            then.status(200).json_body(serde_json::json!({
                "response": {
                    "game_count": 1,
                    "games": [{ "appid": 393380, "playtime_forever": 6000 }]
                }
            }));
        }).await;

        let source = create_source(&server);
        let playtime = source.playtime(STEAM_ID).await.unwrap();

        mock.assert_async().await;
        assert_eq!(playtime, PlaytimeResult::Known(6000.0));
        assert_eq!(source.unit(), PlaytimeUnit::Minutes);
    }

    #[tokio::test]
    async fn test_private_profile_is_unknown() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/IPlayerService/GetOwnedGames/v0001/");
            then.status(200)
                .json_body(serde_json::json!({ "response": {} }));
        }).await;

        let source = create_source(&server);
        assert_eq!(
            source.playtime(STEAM_ID).await.unwrap(),
            PlaytimeResult::Unknown
        );
    }

    #[tokio::test]
    async fn test_other_games_only_is_unknown() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/IPlayerService/GetOwnedGames/v0001/");
            then.status(200).json_body(serde_json::json!({
                "response": {
                    "game_count": 1,
                    "games": [{ "appid": 730, "playtime_forever": 100 }]
                }
            }));
        }).await;

        let source = create_source(&server);
        assert_eq!(
            source.playtime(STEAM_ID).await.unwrap(),
            PlaytimeResult::Unknown
        );
    }

    #[tokio::test]
    async fn test_server_error_fails() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/IPlayerService/GetOwnedGames/v0001/");
            then.status(503);
        }).await;

        let source = create_source(&server);
        assert!(source.playtime(STEAM_ID).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_body_fails() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/IPlayerService/GetOwnedGames/v0001/");
            then.status(200).body("<html>rate limited</html>");
        }).await;

        let source = create_source(&server);
        assert!(source.playtime(STEAM_ID).await.is_err());
    }
}
