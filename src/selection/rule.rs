//! Selection rules
//!
//! A rule is side-agnostic: it only filters players, while the side a player
//! counts for is always their team.

use crate::config::BalanceRuleConfig;
use crate::error::{BalanceError, Result};
use crate::types::Player;
use regex::Regex;

/// Squad name the game gives to the commander's squad
pub const COMMAND_SQUAD_NAME: &str = "Command Squad";

/// Compiled filter configuration for one balance command
#[derive(Debug, Clone)]
pub struct SelectionRule {
    /// Display name used in the report text
    pub name: String,
    /// Role label must match this pattern anywhere
    pub role_pattern: Option<Regex>,
    /// Player's leader flag must equal this value
    pub is_leader: Option<bool>,
    /// Only leaders of a squad with exactly this name
    pub leader_of_squad: Option<String>,
    /// Append the combined hour total to the report
    pub show_total: bool,
}

impl SelectionRule {
    /// Rule counting every player of both teams
    pub fn all_players(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role_pattern: None,
            is_leader: None,
            leader_of_squad: None,
            show_total: true,
        }
    }

    /// Rule counting squad leaders only
    pub fn squad_leaders(name: impl Into<String>) -> Self {
        Self {
            is_leader: Some(true),
            show_total: false,
            ..Self::all_players(name)
        }
    }

    /// Rule counting the leaders of the command squad only
    pub fn commanders(name: impl Into<String>) -> Self {
        Self {
            leader_of_squad: Some(COMMAND_SQUAD_NAME.to_string()),
            show_total: false,
            ..Self::all_players(name)
        }
    }

    pub fn with_role_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| BalanceError::InvalidRule {
            rule: self.name.clone(),
            reason: format!("invalid role pattern '{}': {}", pattern, e),
        })?;
        self.role_pattern = Some(regex);
        Ok(self)
    }

    /// Build a rule from its configuration entry
    pub fn from_config(config: &BalanceRuleConfig) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(BalanceError::InvalidRule {
                rule: config.name.clone(),
                reason: "rule name cannot be empty".to_string(),
            }
            .into());
        }

        let mut rule = Self {
            name: config.name.clone(),
            role_pattern: None,
            is_leader: config.is_leader,
            leader_of_squad: config.leader_of_squad.clone(),
            show_total: config.show_total,
        };

        // An empty pattern means "no role filter"
        if let Some(pattern) = config.role_regex.as_deref().filter(|p| !p.is_empty()) {
            rule = rule.with_role_pattern(pattern)?;
        }

        Ok(rule)
    }

    /// Check the non-team filters against a player
    ///
    /// Filters are applied in order: leader flag, squad leadership, role.
    /// All present filters must pass.
    pub fn matches(&self, player: &Player) -> bool {
        if let Some(is_leader) = self.is_leader {
            if player.is_leader != is_leader {
                return false;
            }
        }

        if let Some(squad) = &self.leader_of_squad {
            if !player.is_leader || player.squad_name.as_deref() != Some(squad.as_str()) {
                return false;
            }
        }

        if let Some(pattern) = &self.role_pattern {
            match player.role.as_deref() {
                Some(role) if pattern.is_match(role) => {}
                _ => return false,
            }
        }

        true
    }

    /// Whether the rule has any filter besides team affiliation
    pub fn has_filters(&self) -> bool {
        self.is_leader.is_some() || self.leader_of_squad.is_some() || self.role_pattern.is_some()
    }
}
