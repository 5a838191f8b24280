//! Balance rule configuration

use serde::{Deserialize, Serialize};

/// One configured balance command
///
/// ```toml
/// [[balances]]
/// name = "pilots"
/// commands = ["pilotbalance", "пилоты"]
/// role_regex = "Pilot"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRuleConfig {
    /// Display name inserted in the report
    pub name: String,
    /// Trigger phrases, matched case-insensitively
    pub commands: Vec<String>,
    /// Optional regular expression the player's role must match
    #[serde(default)]
    pub role_regex: Option<String>,
    /// Optional required value of the player's leader flag
    #[serde(default)]
    pub is_leader: Option<bool>,
    /// Optional squad name; only that squad's leaders are counted
    #[serde(default)]
    pub leader_of_squad: Option<String>,
    /// Add a line with the combined hour total
    #[serde(default = "default_show_total")]
    pub show_total: bool,
}

fn default_show_total() -> bool {
    true
}

impl Default for BalanceRuleConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            commands: Vec::new(),
            role_regex: None,
            is_leader: None,
            leader_of_squad: None,
            show_total: true,
        }
    }
}

/// Rules used when none are configured
pub fn default_balance_rules() -> Vec<BalanceRuleConfig> {
    vec![
        BalanceRuleConfig {
            name: "teams".to_string(),
            commands: vec!["balance".to_string(), "баланс".to_string()],
            ..BalanceRuleConfig::default()
        },
        BalanceRuleConfig {
            name: "squad leaders".to_string(),
            commands: vec![
                "slbalance".to_string(),
                "слбаланс".to_string(),
                "сквадные".to_string(),
            ],
            is_leader: Some(true),
            show_total: false,
            ..BalanceRuleConfig::default()
        },
        BalanceRuleConfig {
            name: "commanders".to_string(),
            commands: vec!["cmdbalance".to_string(), "кмдбаланс".to_string()],
            leader_of_squad: Some(crate::selection::rule::COMMAND_SQUAD_NAME.to_string()),
            show_total: false,
            ..BalanceRuleConfig::default()
        },
    ]
}
