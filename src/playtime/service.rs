//! Internal playtime service source
//!
//! The playtime service keeps its own copy of player playtimes and answers
//! with the combined total of a set of players, in seconds.

use crate::error::{BalanceError, Result};
use crate::playtime::source::{BatchPlaytimeSource, PlaytimeUnit};
use crate::types::PlayerId;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const TOTAL_PLAYTIME_PATH: &str = "v1/playtime/total";
const SECRET_KEY_HEADER: &str = "X-Secret-Key";

#[derive(Debug, Serialize)]
struct TotalPlaytimeRequest<'a> {
    game_id: u32,
    steam_ids: &'a [PlayerId],
}

#[derive(Debug, Deserialize)]
struct TotalPlaytimeResponse {
    total_seconds: f64,
}

/// Batch source backed by the playtime service
pub struct PlaytimeServiceSource {
    client: Client,
    base_url: String,
    secret_key: String,
    game_id: u32,
}

impl PlaytimeServiceSource {
    /// Create a new playtime service source
    pub fn new(base_url: &str, secret_key: &str, game_id: u32, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BalanceError::ConfigurationError {
                message: format!("Failed to build playtime service HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            game_id,
        })
    }
}

#[async_trait]
impl BatchPlaytimeSource for PlaytimeServiceSource {
    fn unit(&self) -> PlaytimeUnit {
        PlaytimeUnit::Seconds
    }

    async fn total_playtime(&self, player_ids: &[PlayerId]) -> Result<f64> {
        let request = TotalPlaytimeRequest {
            game_id: self.game_id,
            steam_ids: player_ids,
        };

        let response = self
            .client
            .post(format!("{}/{}", self.base_url, TOTAL_PLAYTIME_PATH))
            .header(SECRET_KEY_HEADER, &self.secret_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BalanceError::SourceFailed {
                message: format!("Playtime service request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BalanceError::SourceFailed {
                message: format!("Playtime service answered {}", status),
            }
            .into());
        }

        let body: TotalPlaytimeResponse =
            response
                .json()
                .await
                .map_err(|e| BalanceError::MalformedResponse {
                    reason: format!("Playtime service total: {}", e),
                })?;

        if !body.total_seconds.is_finite() || body.total_seconds < 0.0 {
            return Err(BalanceError::MalformedResponse {
                reason: format!("invalid total_seconds {}", body.total_seconds),
            }
            .into());
        }

        debug!(
            "Playtime service total for {} players: {}s",
            player_ids.len(),
            body.total_seconds
        );

        Ok(body.total_seconds)
    }
}
