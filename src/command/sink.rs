//! Outbound delivery of balance reports

use crate::error::Result;
use crate::types::{BalanceMessage, Delivery, PlayerId};
use async_trait::async_trait;
use std::sync::Mutex;

/// Channel the game server exposes for chat replies
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Show a message to every player
    async fn broadcast(&self, text: &str) -> Result<()>;

    /// Show a message to a single player
    async fn warn(&self, player_id: &str, text: &str) -> Result<()>;
}

/// A message that went through a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Broadcast(String),
    Warn { player_id: PlayerId, text: String },
}

impl SentMessage {
    pub fn text(&self) -> &str {
        match self {
            SentMessage::Broadcast(text) => text,
            SentMessage::Warn { text, .. } => text,
        }
    }
}

/// Sink that keeps every message in memory, for offline runs and tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn broadcasts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|message| match message {
                SentMessage::Broadcast(text) => Some(text),
                SentMessage::Warn { .. } => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<(PlayerId, String)> {
        self.sent()
            .into_iter()
            .filter_map(|message| match message {
                SentMessage::Warn { player_id, text } => Some((player_id, text)),
                SentMessage::Broadcast(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }

    fn record(&self, message: SentMessage) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn broadcast(&self, text: &str) -> Result<()> {
        self.record(SentMessage::Broadcast(text.to_string()));
        Ok(())
    }

    async fn warn(&self, player_id: &str, text: &str) -> Result<()> {
        self.record(SentMessage::Warn {
            player_id: player_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Send a report through the channel its delivery asks for
pub async fn deliver(sink: &dyn MessageSink, message: &BalanceMessage, requester: &str) -> Result<()> {
    match message.delivery {
        Delivery::Broadcast => sink.broadcast(&message.text).await,
        Delivery::Requester => sink.warn(requester, &message.text).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReportOutcome;

    #[tokio::test]
    async fn test_deliver_routes_by_delivery() {
        let sink = RecordingSink::new();

        let broadcast = BalanceMessage {
            delivery: Delivery::Broadcast,
            outcome: ReportOutcome::Unknown,
            text: "Balance for teams is unknown".to_string(),
        };
        let warning = BalanceMessage {
            delivery: Delivery::Requester,
            outcome: ReportOutcome::Unavailable,
            text: "Balance for teams is unavailable, calculation failed".to_string(),
        };

        deliver(&sink, &broadcast, "requester").await.unwrap();
        deliver(&sink, &warning, "requester").await.unwrap();

        assert_eq!(sink.broadcasts(), vec!["Balance for teams is unknown"]);
        assert_eq!(
            sink.warnings(),
            vec![(
                "requester".to_string(),
                "Balance for teams is unavailable, calculation failed".to_string()
            )]
        );

        sink.clear();
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();

        tokio_test::assert_ok!(tokio_test::block_on(sink.warn("p1", "first")));
        tokio_test::assert_ok!(tokio_test::block_on(sink.broadcast("second")));

        let texts: Vec<_> = sink.sent().iter().map(|m| m.text().to_string()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
