//! Common types used throughout the playtime balance service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Platform account identifier of a player (a Steam ID for the default game)
pub type PlayerId = String;

/// One of the two sides of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Team {
    One,
    Two,
}

impl Team {
    /// Numeric team id used by the game server
    pub fn id(self) -> u8 {
        match self {
            Team::One => 1,
            Team::Two => 2,
        }
    }
}

impl TryFrom<u8> for Team {
    type Error = String;

    fn try_from(id: u8) -> std::result::Result<Self, Self::Error> {
        match id {
            1 => Ok(Team::One),
            2 => Ok(Team::Two),
            other => Err(format!("unknown team id {}", other)),
        }
    }
}

impl From<Team> for u8 {
    fn from(team: Team) -> Self {
        team.id()
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "team {}", self.id())
    }
}

/// A connected player as seen by the balance engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
    pub role: Option<String>,
    pub is_leader: bool,
    pub squad_name: Option<String>,
}

impl Player {
    /// Plain rifleman on a team, mostly useful for tests and tooling
    pub fn new(id: impl Into<PlayerId>, team: Team) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            team,
            role: None,
            is_leader: false,
            squad_name: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn leading(mut self, squad_name: impl Into<String>) -> Self {
        self.is_leader = true;
        self.squad_name = Some(squad_name.into());
        self
    }

    pub fn in_squad(mut self, squad_name: impl Into<String>) -> Self {
        self.squad_name = Some(squad_name.into());
        self
    }
}

/// Roster entry as published by the game server
///
/// Players that are still loading in have no team yet; they are not part of
/// either side and are dropped by [`ChatCommand::roster`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    /// Raw team id; anything other than 1 or 2 is not a team
    #[serde(default)]
    pub team_id: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_leader: bool,
    #[serde(default)]
    pub squad_name: Option<String>,
}

impl RosterEntry {
    /// Convert into a [`Player`] if the entry belongs to one of the two teams
    pub fn into_player(self) -> Option<Player> {
        let id = u8::try_from(self.team_id?).ok()?;
        let team = Team::try_from(id).ok()?;
        Some(Player {
            id: self.id,
            name: self.name,
            team,
            role: self.role,
            is_leader: self.is_leader,
            squad_name: self.squad_name,
        })
    }
}

impl From<&Player> for RosterEntry {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            team_id: Some(i64::from(player.team.id())),
            role: player.role.clone(),
            is_leader: player.is_leader,
            squad_name: player.squad_name.clone(),
        }
    }
}

/// Player who typed a chat command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requester {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
}

/// Chat command event forwarded by the game server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCommand {
    /// Trigger phrase without the command prefix
    pub command: String,
    /// Remaining chat text after the trigger
    #[serde(default)]
    pub message: String,
    pub player: Requester,
    /// Snapshot of all connected players at the time of the command
    #[serde(default)]
    pub players: Vec<RosterEntry>,
    pub timestamp: DateTime<Utc>,
}

impl ChatCommand {
    /// Players of the snapshot that belong to one of the two teams
    pub fn roster(&self) -> Vec<Player> {
        self.players
            .iter()
            .cloned()
            .filter_map(RosterEntry::into_player)
            .collect()
    }
}

/// Identifiers of the players counted for one side
pub type Cohort = BTreeSet<PlayerId>;

/// Playtime of a single player in the source's unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlaytimeResult {
    Known(f64),
    /// Never played, hidden profile or otherwise undeterminable
    Unknown,
}

/// Aggregated playtime of one side in hours
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SideTotal {
    Known(f64),
    /// The playtime source failed for this side
    Unknown,
}

impl SideTotal {
    pub fn hours(&self) -> Option<f64> {
        match self {
            SideTotal::Known(hours) => Some(*hours),
            SideTotal::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, SideTotal::Unknown)
    }
}

impl std::fmt::Display for SideTotal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SideTotal::Known(hours) => write!(f, "{:.1}h", hours),
            SideTotal::Unknown => write!(f, "unknown"),
        }
    }
}

/// Both side totals for one balance request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub name: String,
    pub team_one: SideTotal,
    pub team_two: SideTotal,
}

/// Who receives a report message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    /// Server-wide broadcast
    Broadcast,
    /// Private warning to the player who asked
    Requester,
}

/// Which branch of the report was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportOutcome {
    Balance,
    Unknown,
    Unavailable,
}

impl ReportOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportOutcome::Balance => "balance",
            ReportOutcome::Unknown => "unknown",
            ReportOutcome::Unavailable => "unavailable",
        }
    }
}

/// Formatted report ready for delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceMessage {
    pub delivery: Delivery,
    pub outcome: ReportOutcome,
    pub text: String,
}

/// Broadcast request sent back to the game server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RconBroadcast {
    pub text: String,
}

/// Private warning request sent back to the game server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RconWarn {
    pub player_id: PlayerId,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_ids() {
        assert_eq!(Team::try_from(1).unwrap(), Team::One);
        assert_eq!(Team::try_from(2).unwrap(), Team::Two);
        assert!(Team::try_from(0).is_err());
        assert!(Team::try_from(3).is_err());
        assert_eq!(u8::from(Team::Two), 2);
    }

    #[test]
    fn test_team_serializes_as_number() {
        let json = serde_json::to_string(&Team::One).unwrap();
        assert_eq!(json, "1");

        let team: Team = serde_json::from_str("2").unwrap();
        assert_eq!(team, Team::Two);

        assert!(serde_json::from_str::<Team>("7").is_err());
    }

    #[test]
    fn test_roster_drops_unassigned_players() {
        let command: ChatCommand = serde_json::from_value(serde_json::json!({
            "command": "balance",
            "player": { "id": "76561198000000001", "name": "asker" },
            "players": [
                { "id": "a", "team_id": 1, "role": "USA_Rifleman_01" },
                { "id": "b", "team_id": 2, "is_leader": true, "squad_name": "Command Squad" },
                { "id": "c" },
                { "id": "d", "team_id": 0 },
                { "id": "e", "team_id": -1 },
                { "id": "f", "team_id": 256 },
                { "id": "g", "team_id": 258 }
            ],
            "timestamp": "2024-05-01T12:00:00Z"
        }))
        .unwrap();

        let roster = command.roster();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].team, Team::One);
        assert_eq!(roster[0].role.as_deref(), Some("USA_Rifleman_01"));
        assert!(roster[1].is_leader);
        assert_eq!(roster[1].squad_name.as_deref(), Some("Command Squad"));
    }

    #[test]
    fn test_side_total_helpers() {
        assert_eq!(SideTotal::Known(12.5).hours(), Some(12.5));
        assert_eq!(SideTotal::Unknown.hours(), None);
        assert!(SideTotal::Unknown.is_unknown());
        assert!(!SideTotal::Known(0.0).is_unknown());
    }
}
