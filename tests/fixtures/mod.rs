//! Test fixtures and mock implementations for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use playtime_balance::balance::BalanceAggregator;
use playtime_balance::command::{BalanceCommandHandler, CommandTable, MessageSink};
use playtime_balance::config::{default_balance_rules, BalanceRuleConfig};
use playtime_balance::error::{BalanceError, Result};
use playtime_balance::playtime::{BatchPlaytimeSource, PlaytimeSource, PlaytimeUnit};
use playtime_balance::types::{ChatCommand, Player, PlayerId, Requester, RosterEntry};
use playtime_balance::utils::current_timestamp;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Default rules plus a role based rule with a non-ASCII alias
pub fn test_rules() -> Vec<BalanceRuleConfig> {
    let mut rules = default_balance_rules();
    rules.push(BalanceRuleConfig {
        name: "pilots".to_string(),
        commands: vec!["pilotbalance".to_string(), "Пилоты".to_string()],
        role_regex: Some("Pilot".to_string()),
        show_total: false,
        ..BalanceRuleConfig::default()
    });
    rules
}

/// Build a command handler over the test rules
pub fn create_handler(source: PlaytimeSource, sink: Arc<dyn MessageSink>) -> BalanceCommandHandler {
    let table = CommandTable::from_config(&test_rules()).expect("test rules are valid");
    BalanceCommandHandler::new(Arc::new(table), BalanceAggregator::new(source), sink)
}

/// Chat command carrying a roster snapshot
pub fn chat_command(trigger: &str, requester: &str, roster: &[Player]) -> ChatCommand {
    ChatCommand {
        command: trigger.to_string(),
        message: String::new(),
        player: Requester {
            id: requester.to_string(),
            name: format!("player-{}", requester),
        },
        players: roster.iter().map(RosterEntry::from).collect(),
        timestamp: current_timestamp(),
    }
}

/// Batch source that remembers every cohort it was asked about
#[derive(Debug)]
pub struct RecordingBatchSource {
    seconds: HashMap<PlayerId, f64>,
    failing_players: Vec<PlayerId>,
    requests: Mutex<Vec<Vec<PlayerId>>>,
}

impl RecordingBatchSource {
    pub fn new<I, S>(seconds: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<PlayerId>,
    {
        Self {
            seconds: seconds
                .into_iter()
                .map(|(id, value)| (id.into(), value))
                .collect(),
            failing_players: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every batch containing this player
    pub fn failing_for(mut self, player_id: impl Into<PlayerId>) -> Self {
        self.failing_players.push(player_id.into());
        self
    }

    /// Cohorts requested so far, in call order
    pub fn requests(&self) -> Vec<Vec<PlayerId>> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BatchPlaytimeSource for RecordingBatchSource {
    fn unit(&self) -> PlaytimeUnit {
        PlaytimeUnit::Seconds
    }

    async fn total_playtime(&self, player_ids: &[PlayerId]) -> Result<f64> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(player_ids.to_vec());
        }

        if player_ids
            .iter()
            .any(|id| self.failing_players.contains(id))
        {
            return Err(BalanceError::SourceFailed {
                message: "playtime service returned 500".to_string(),
            }
            .into());
        }

        Ok(player_ids
            .iter()
            .filter_map(|id| self.seconds.get(id))
            .sum())
    }
}

/// Sink whose every delivery fails
#[derive(Debug, Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail(&self) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(BalanceError::DeliveryFailed {
            message: "rcon connection closed".to_string(),
        }
        .into())
    }
}

#[async_trait]
impl MessageSink for FailingSink {
    async fn broadcast(&self, _text: &str) -> Result<()> {
        self.fail()
    }

    async fn warn(&self, _player_id: &str, _text: &str) -> Result<()> {
        self.fail()
    }
}

