//! Playtime sources
//!
//! Playtime can be looked up one player at a time (Steam Web API) or for a
//! whole cohort in a single call (internal playtime service). Both shapes are
//! wrapped by [`PlaytimeSource`] so the aggregator can work with either.

pub mod service;
pub mod source;
pub mod steam;

// Re-export commonly used types
pub use service::PlaytimeServiceSource;
pub use source::{
    BatchPlaytimeSource, InMemoryPlaytimeSource, PlayerPlaytimeSource, PlaytimeSource,
    PlaytimeUnit,
};
pub use steam::SteamPlaytimeSource;

use crate::config::{PlaytimeProviderKind, PlaytimeSettings};
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Build the configured playtime source
pub fn source_from_settings(settings: &PlaytimeSettings) -> Result<PlaytimeSource> {
    info!(
        "Using {} playtime provider for game {}",
        settings.provider, settings.game_id
    );

    match settings.provider {
        PlaytimeProviderKind::Steam => {
            let source = SteamPlaytimeSource::new(
                &settings.steam_api_url,
                &settings.steam_api_key,
                settings.game_id,
                settings.request_timeout(),
            )?;
            Ok(PlaytimeSource::PerPlayer(Arc::new(source)))
        }
        PlaytimeProviderKind::Service => {
            let source = PlaytimeServiceSource::new(
                &settings.service_url,
                &settings.service_secret_key,
                settings.game_id,
                settings.request_timeout(),
            )?;
            Ok(PlaytimeSource::Batch(Arc::new(source)))
        }
    }
}
