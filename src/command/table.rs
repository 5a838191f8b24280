//! Trigger phrase dispatch table

use crate::config::BalanceRuleConfig;
use crate::error::{BalanceError, Result};
use crate::selection::SelectionRule;
use crate::utils::normalize_trigger;
use std::collections::HashMap;

/// Maps trigger phrases to balance rules
///
/// Rules are stored once in configuration order; every trigger points at the
/// index of its rule. Triggers are lower-cased on insert and on lookup.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    rules: Vec<SelectionRule>,
    triggers: HashMap<String, usize>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from configured rules
    pub fn from_config(configs: &[BalanceRuleConfig]) -> Result<Self> {
        let mut table = Self::new();
        for config in configs {
            let rule = SelectionRule::from_config(config)?;
            table.add_rule(rule, &config.commands)?;
        }
        Ok(table)
    }

    /// Register a rule under one or more triggers
    pub fn add_rule<S: AsRef<str>>(&mut self, rule: SelectionRule, triggers: &[S]) -> Result<()> {
        if triggers.is_empty() {
            return Err(BalanceError::InvalidRule {
                rule: rule.name.clone(),
                reason: "no trigger phrases".to_string(),
            }
            .into());
        }

        let normalized: Vec<String> = triggers
            .iter()
            .map(|trigger| normalize_trigger(trigger.as_ref()))
            .collect();

        for (raw, trigger) in triggers.iter().zip(&normalized) {
            if trigger.is_empty() {
                return Err(BalanceError::InvalidRule {
                    rule: rule.name.clone(),
                    reason: "empty trigger phrase".to_string(),
                }
                .into());
            }
            if let Some(&index) = self.triggers.get(trigger) {
                return Err(BalanceError::InvalidRule {
                    rule: rule.name.clone(),
                    reason: format!(
                        "trigger '{}' is already bound to '{}'",
                        raw.as_ref(),
                        self.rules[index].name
                    ),
                }
                .into());
            }
        }

        let index = self.rules.len();
        self.rules.push(rule);
        for trigger in normalized {
            self.triggers.insert(trigger, index);
        }
        Ok(())
    }

    /// Find the rule bound to a trigger
    pub fn lookup(&self, trigger: &str) -> Option<&SelectionRule> {
        self.triggers
            .get(&normalize_trigger(trigger))
            .and_then(|&index| self.rules.get(index))
    }

    pub fn rules(&self) -> &[SelectionRule] {
        &self.rules
    }

    /// Triggers bound to each rule, in rule order
    pub fn bindings(&self) -> Vec<(&SelectionRule, Vec<&str>)> {
        let mut bindings: Vec<(&SelectionRule, Vec<&str>)> =
            self.rules.iter().map(|rule| (rule, Vec::new())).collect();
        for (trigger, &index) in &self.triggers {
            bindings[index].1.push(trigger.as_str());
        }
        for (_, triggers) in &mut bindings {
            triggers.sort_unstable();
        }
        bindings
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
