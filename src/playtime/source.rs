//! Playtime source traits and the in-memory implementation

use crate::error::{BalanceError, Result};
use crate::types::{PlayerId, PlaytimeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Unit a playtime source reports durations in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaytimeUnit {
    Seconds,
    Minutes,
    Hours,
}

impl PlaytimeUnit {
    /// Convert a duration in this unit to hours
    pub fn to_hours(self, value: f64) -> f64 {
        match self {
            PlaytimeUnit::Seconds => value / 3600.0,
            PlaytimeUnit::Minutes => value / 60.0,
            PlaytimeUnit::Hours => value,
        }
    }
}

/// Source answering one player at a time
#[async_trait]
pub trait PlayerPlaytimeSource: Send + Sync {
    /// Unit of every value returned by [`Self::playtime`]
    fn unit(&self) -> PlaytimeUnit;

    /// Playtime of a player in the configured game
    ///
    /// Players that never played or hide their profile resolve to
    /// [`PlaytimeResult::Unknown`]; transport and decoding failures are errors.
    async fn playtime(&self, player_id: &str) -> Result<PlaytimeResult>;
}

/// Source answering a whole cohort in one call
#[async_trait]
pub trait BatchPlaytimeSource: Send + Sync {
    /// Unit of every value returned by [`Self::total_playtime`]
    fn unit(&self) -> PlaytimeUnit;

    /// Combined playtime of all given players in the configured game
    async fn total_playtime(&self, player_ids: &[PlayerId]) -> Result<f64>;
}

/// Playtime source in either shape
#[derive(Clone)]
pub enum PlaytimeSource {
    PerPlayer(Arc<dyn PlayerPlaytimeSource>),
    Batch(Arc<dyn BatchPlaytimeSource>),
}

impl PlaytimeSource {
    pub fn unit(&self) -> PlaytimeUnit {
        match self {
            PlaytimeSource::PerPlayer(source) => source.unit(),
            PlaytimeSource::Batch(source) => source.unit(),
        }
    }

    /// Metric label of the source shape
    pub fn shape(&self) -> &'static str {
        match self {
            PlaytimeSource::PerPlayer(_) => "per_player",
            PlaytimeSource::Batch(_) => "batch",
        }
    }
}

impl std::fmt::Debug for PlaytimeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaytimeSource::PerPlayer(_) => write!(f, "PlaytimeSource::PerPlayer({:?})", self.unit()),
            PlaytimeSource::Batch(_) => write!(f, "PlaytimeSource::Batch({:?})", self.unit()),
        }
    }
}

/// In-memory playtime source for testing and offline runs
///
/// Serves both source shapes from the same table. Players without an entry
/// are unknown. Failures can be injected globally or per player; a batch
/// containing a failing player fails as a whole.
#[derive(Debug)]
pub struct InMemoryPlaytimeSource {
    unit: PlaytimeUnit,
    playtimes: RwLock<HashMap<PlayerId, f64>>,
    failing_players: RwLock<HashSet<PlayerId>>,
    fail_all: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryPlaytimeSource {
    /// Create an empty source reporting in the given unit
    pub fn new(unit: PlaytimeUnit) -> Self {
        Self {
            unit,
            playtimes: RwLock::new(HashMap::new()),
            failing_players: RwLock::new(HashSet::new()),
            fail_all: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a source from `(player_id, playtime)` pairs
    pub fn with_playtimes<I, S>(unit: PlaytimeUnit, playtimes: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<PlayerId>,
    {
        let source = Self::new(unit);
        if let Ok(mut table) = source.playtimes.write() {
            for (player_id, playtime) in playtimes {
                table.insert(player_id.into(), playtime);
            }
        }
        source
    }

    /// Set the playtime of a player
    pub fn set_playtime(&self, player_id: impl Into<PlayerId>, playtime: f64) -> Result<()> {
        let mut table = self
            .playtimes
            .write()
            .map_err(|_| BalanceError::InternalError {
                message: "Failed to acquire playtimes write lock".to_string(),
            })?;
        table.insert(player_id.into(), playtime);
        Ok(())
    }

    /// Make every lookup involving this player fail
    pub fn fail_for(&self, player_id: impl Into<PlayerId>) -> Result<()> {
        let mut failing = self
            .failing_players
            .write()
            .map_err(|_| BalanceError::InternalError {
                message: "Failed to acquire failing players write lock".to_string(),
            })?;
        failing.insert(player_id.into());
        Ok(())
    }

    /// Make every lookup fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.fail_all.store(unavailable, Ordering::SeqCst);
    }

    /// Number of source calls served so far (for testing)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check_available(&self, player_ids: &[&str]) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(BalanceError::SourceFailed {
                message: "in-memory source is unavailable".to_string(),
            }
            .into());
        }

        let failing = self
            .failing_players
            .read()
            .map_err(|_| BalanceError::InternalError {
                message: "Failed to acquire failing players read lock".to_string(),
            })?;
        if let Some(player_id) = player_ids.iter().find(|id| failing.contains(**id)) {
            return Err(BalanceError::SourceFailed {
                message: format!("lookup failed for player {}", player_id),
            }
            .into());
        }

        Ok(())
    }

    fn lookup(&self, player_id: &str) -> Result<Option<f64>> {
        let table = self
            .playtimes
            .read()
            .map_err(|_| BalanceError::InternalError {
                message: "Failed to acquire playtimes read lock".to_string(),
            })?;
        Ok(table.get(player_id).copied())
    }
}

#[async_trait]
impl PlayerPlaytimeSource for InMemoryPlaytimeSource {
    fn unit(&self) -> PlaytimeUnit {
        self.unit
    }

    async fn playtime(&self, player_id: &str) -> Result<PlaytimeResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_available(&[player_id])?;

        Ok(match self.lookup(player_id)? {
            Some(playtime) => PlaytimeResult::Known(playtime),
            None => PlaytimeResult::Unknown,
        })
    }
}

#[async_trait]
impl BatchPlaytimeSource for InMemoryPlaytimeSource {
    fn unit(&self) -> PlaytimeUnit {
        self.unit
    }

    async fn total_playtime(&self, player_ids: &[PlayerId]) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ids: Vec<&str> = player_ids.iter().map(String::as_str).collect();
        self.check_available(&ids)?;

        let mut total = 0.0;
        for player_id in player_ids {
            total += self.lookup(player_id)?.unwrap_or(0.0);
        }
        Ok(total)
    }
}
