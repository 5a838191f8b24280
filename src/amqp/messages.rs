//! AMQP message definitions and serialization

use crate::error::{BalanceError, Result};
use crate::types::*;
use crate::utils::generate_correlation_id;

/// AMQP queue and exchange names
pub const CHAT_COMMAND_QUEUE: &str = "playtime_balance.chat_commands";
pub const RCON_EXCHANGE: &str = "playtime_balance.rcon";

/// Routing keys for replies to the game server
pub const BROADCAST_ROUTING_KEY: &str = "rcon.broadcast";
pub const WARN_ROUTING_KEY: &str = "rcon.warn";

/// Message envelope with metadata
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageEnvelope<T> {
    pub payload: T,
    pub correlation_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub routing_key: String,
}

impl<T> MessageEnvelope<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Create a new message envelope
    pub fn new(payload: T, routing_key: String) -> Self {
        Self {
            payload,
            correlation_id: generate_correlation_id(),
            timestamp: chrono::Utc::now(),
            routing_key,
        }
    }

    /// Serialize the envelope to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            BalanceError::InternalError {
                message: format!("Failed to serialize message: {}", e),
            }
            .into()
        })
    }

    /// Deserialize envelope from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            BalanceError::InternalError {
                message: format!("Failed to deserialize message: {}", e),
            }
            .into()
        })
    }
}

/// Message serialization and validation utilities
pub struct MessageUtils;

impl MessageUtils {
    /// Serialize a chat command to bytes
    pub fn serialize_chat_command(command: &ChatCommand) -> Result<Vec<u8>> {
        Self::validate_chat_command(command)?;
        serde_json::to_vec(command).map_err(|e| {
            BalanceError::InternalError {
                message: format!("Failed to serialize chat command: {}", e),
            }
            .into()
        })
    }

    /// Deserialize a chat command from bytes
    pub fn deserialize_chat_command(bytes: &[u8]) -> Result<ChatCommand> {
        let command: ChatCommand =
            serde_json::from_slice(bytes).map_err(|e| BalanceError::InvalidChatCommand {
                reason: format!("Failed to deserialize chat command: {}", e),
            })?;

        Self::validate_chat_command(&command)?;
        Ok(command)
    }

    /// Validate a chat command
    pub fn validate_chat_command(command: &ChatCommand) -> Result<()> {
        if command.command.trim().is_empty() {
            return Err(BalanceError::InvalidChatCommand {
                reason: "Command cannot be empty".to_string(),
            }
            .into());
        }

        if command.player.id.is_empty() {
            return Err(BalanceError::InvalidChatCommand {
                reason: "Requester ID cannot be empty".to_string(),
            }
            .into());
        }

        if let Some(entry) = command.players.iter().find(|entry| entry.id.is_empty()) {
            return Err(BalanceError::InvalidChatCommand {
                reason: format!("Roster entry '{}' has no player ID", entry.name),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_command() -> ChatCommand {
        ChatCommand {
            command: "balance".to_string(),
            message: String::new(),
            player: Requester {
                id: "76561198000000001".to_string(),
                name: "Requester".to_string(),
            },
            players: vec![RosterEntry::from(&Player::new(
                "76561198000000001",
                Team::One,
            ))],
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_message_envelope_creation() {
        let envelope = MessageEnvelope::new(
            RconBroadcast {
                text: "hello".to_string(),
            },
            BROADCAST_ROUTING_KEY.to_string(),
        );

        assert_eq!(envelope.routing_key, "rcon.broadcast");
        assert!(!envelope.correlation_id.is_empty());

        let bytes = envelope.to_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["payload"]["text"], "hello");
    }

    #[test]
    fn test_chat_command_validation() {
        assert!(MessageUtils::validate_chat_command(&create_test_command()).is_ok());

        let mut command = create_test_command();
        command.command = "  ".to_string();
        assert!(MessageUtils::validate_chat_command(&command).is_err());

        let mut command = create_test_command();
        command.player.id = String::new();
        assert!(MessageUtils::validate_chat_command(&command).is_err());

        let mut command = create_test_command();
        command.players[0].id = String::new();
        assert!(MessageUtils::validate_chat_command(&command).is_err());
    }

    #[test]
    fn test_deserialize_host_payload() {
        let payload = serde_json::json!({
            "command": "баланс",
            "message": "",
            "player": { "id": "1", "name": "Requester" },
            "players": [
                { "id": "1", "name": "Alpha", "team_id": 1, "role": "USA_SL_01",
                  "is_leader": true, "squad_name": "Command Squad" },
                { "id": "2", "name": "Bravo", "team_id": 2 },
                { "id": "3", "name": "Spectator" }
            ],
            "timestamp": "2024-05-01T12:00:00Z"
        });

        let bytes = serde_json::to_vec(&payload).unwrap();
        let command = MessageUtils::deserialize_chat_command(&bytes).unwrap();

        assert_eq!(command.command, "баланс");
        assert_eq!(command.players.len(), 3);
        // Entries without a team are left out of the roster
        assert_eq!(command.roster().len(), 2);
    }

    #[test]
    fn test_malformed_payload_rejected() {
        assert!(MessageUtils::deserialize_chat_command(b"{\"command\": 5}").is_err());
        assert!(MessageUtils::deserialize_chat_command(b"not json").is_err());
    }
}
