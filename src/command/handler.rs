//! Balance command handling
//!
//! Ties the pieces together for one chat command: find the rule, select both
//! cohorts from the roster snapshot, aggregate them concurrently, format the
//! report and deliver it.

use crate::balance::{BalanceAggregator, BalanceReporter};
use crate::command::sink::{deliver, MessageSink};
use crate::command::table::CommandTable;
use crate::metrics::MetricsCollector;
use crate::selection::{CohortSelector, SelectionRule};
use crate::types::{BalanceMessage, BalanceReport, ChatCommand, Player};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Answers balance chat commands
pub struct BalanceCommandHandler {
    table: Arc<CommandTable>,
    aggregator: BalanceAggregator,
    sink: Arc<dyn MessageSink>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl BalanceCommandHandler {
    pub fn new(
        table: Arc<CommandTable>,
        aggregator: BalanceAggregator,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            table,
            aggregator,
            sink,
            metrics: None,
        }
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Handle one chat command
    ///
    /// Returns the report that was produced, or `None` when the trigger is
    /// not bound to any rule. Delivery failures are logged and dropped.
    pub async fn handle(&self, command: &ChatCommand) -> Option<BalanceMessage> {
        let Some(rule) = self.table.lookup(&command.command) else {
            debug!("Ignoring unknown command '{}'", command.command);
            return None;
        };

        let start = Instant::now();
        let roster = command.roster();
        let message = self.compute(rule, &roster).await;

        info!(
            "Balance '{}' requested by {} ({}): {}",
            rule.name,
            command.player.name,
            command.player.id,
            message.outcome.as_str()
        );

        let delivered = match deliver(self.sink.as_ref(), &message, &command.player.id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to deliver balance '{}' for {}: {}",
                    rule.name, command.player.id, e
                );
                false
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_delivery(message.delivery, delivered);
            metrics.record_command(&rule.name, message.outcome, start.elapsed());
        }

        Some(message)
    }

    /// Compute the report of a rule for a roster without delivering it
    pub async fn compute(&self, rule: &SelectionRule, roster: &[Player]) -> BalanceMessage {
        let (team_one, team_two) = CohortSelector::select(roster, rule);
        debug!(
            "Balance '{}' cohorts: {} vs {} players",
            rule.name,
            team_one.len(),
            team_two.len()
        );

        let (team_one, team_two) = self.aggregator.aggregate_both(&team_one, &team_two).await;
        let report = BalanceReport {
            name: rule.name.clone(),
            team_one,
            team_two,
        };
        debug!(
            "Balance '{}' totals: {} vs {}",
            report.name, report.team_one, report.team_two
        );

        BalanceReporter::report_for(&report, rule.show_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::sink::MockMessageSink;
    use crate::config::default_balance_rules;
    use crate::playtime::{InMemoryPlaytimeSource, PlaytimeSource, PlaytimeUnit};
    use crate::types::{Delivery, ReportOutcome, Requester, RosterEntry, Team};
    use crate::utils::current_timestamp;
    use mockall::predicate::eq;

    fn table() -> Arc<CommandTable> {
        Arc::new(CommandTable::from_config(&default_balance_rules()).unwrap())
    }

    fn roster() -> Vec<RosterEntry> {
        vec![
            RosterEntry::from(&Player::new("a1", Team::One).leading("Alpha")),
            RosterEntry::from(&Player::new("a2", Team::One)),
            RosterEntry::from(&Player::new("b1", Team::Two).leading("Command Squad")),
            RosterEntry::from(&Player::new("b2", Team::Two)),
        ]
    }

    fn command(trigger: &str) -> ChatCommand {
        ChatCommand {
            command: trigger.to_string(),
            message: String::new(),
            player: Requester {
                id: "requester".to_string(),
                name: "Requester".to_string(),
            },
            players: roster(),
            timestamp: current_timestamp(),
        }
    }

    fn source() -> Arc<InMemoryPlaytimeSource> {
        Arc::new(InMemoryPlaytimeSource::with_playtimes(
            PlaytimeUnit::Hours,
            [("a1", 10.0), ("a2", 20.0), ("b1", 30.0), ("b2", 40.0)],
        ))
    }

    #[tokio::test]
    async fn test_team_balance_is_broadcast() {
        let mut sink = MockMessageSink::new();
        sink.expect_broadcast()
            .with(eq("Balance for teams: 30% VS 70%  │  30 VS 70 hours (100 total)\nTotal 100 hours"))
            .times(1)
            .returning(|_| Ok(()));
        sink.expect_warn().never();

        let handler = BalanceCommandHandler::new(
            table(),
            BalanceAggregator::new(PlaytimeSource::PerPlayer(source())),
            Arc::new(sink),
        );

        let message = handler.handle(&command("balance")).await.unwrap();
        assert_eq!(message.outcome, ReportOutcome::Balance);
    }

    #[tokio::test]
    async fn test_source_failure_warns_requester_only() {
        let source = source();
        source.fail_for("a2").unwrap();

        let mut sink = MockMessageSink::new();
        sink.expect_broadcast().never();
        sink.expect_warn()
            .with(
                eq("requester"),
                eq("Balance for teams is unavailable, calculation failed"),
            )
            .times(1)
            .returning(|_, _| Ok(()));

        let handler = BalanceCommandHandler::new(
            table(),
            BalanceAggregator::new(PlaytimeSource::Batch(source)),
            Arc::new(sink),
        );

        let message = handler.handle(&command("баланс")).await.unwrap();
        assert_eq!(message.delivery, Delivery::Requester);
    }

    #[tokio::test]
    async fn test_squad_leader_rules() {
        let mut sink = MockMessageSink::new();
        sink.expect_broadcast().times(2).returning(|_| Ok(()));

        let handler = BalanceCommandHandler::new(
            table(),
            BalanceAggregator::new(PlaytimeSource::PerPlayer(source())),
            Arc::new(sink),
        );

        let leaders = handler.handle(&command("SLBALANCE")).await.unwrap();
        assert_eq!(
            leaders.text,
            "Balance for squad leaders: 25% VS 75%  │  10 VS 30 hours (40 total)"
        );

        // Team one has no commander, so only team two counts
        let commanders = handler.handle(&command("cmdbalance")).await.unwrap();
        assert_eq!(
            commanders.text,
            "Balance for commanders: 0% VS 100%  │  0 VS 30 hours (30 total)"
        );
    }

    #[tokio::test]
    async fn test_unknown_command_is_ignored() {
        let source = source();
        let mut sink = MockMessageSink::new();
        sink.expect_broadcast().never();
        sink.expect_warn().never();

        let handler = BalanceCommandHandler::new(
            table(),
            BalanceAggregator::new(PlaytimeSource::PerPlayer(source.clone())),
            Arc::new(sink),
        );

        assert!(handler.handle(&command("votekick")).await.is_none());
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let mut sink = MockMessageSink::new();
        sink.expect_broadcast()
            .returning(|_| Err(anyhow::anyhow!("channel closed")));

        let handler = BalanceCommandHandler::new(
            table(),
            BalanceAggregator::new(PlaytimeSource::PerPlayer(source())),
            Arc::new(sink),
        )
        .with_metrics(metrics.clone());

        let message = handler.handle(&command("balance")).await;
        assert!(message.is_some());
        assert_eq!(
            metrics
                .commands()
                .deliveries_total
                .with_label_values(&["broadcast", "failed"])
                .get(),
            1
        );
    }
}
