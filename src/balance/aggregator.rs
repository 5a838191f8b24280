//! Per-side playtime aggregation

use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::playtime::{BatchPlaytimeSource, PlayerPlaytimeSource, PlaytimeSource};
use crate::types::{Cohort, PlayerId, PlaytimeResult, SideTotal};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Sums the playtime of a cohort using the configured source
///
/// Source failures never escape: a side whose lookups fail resolves to
/// [`SideTotal::Unknown`]. Per-player unknown results count as zero.
#[derive(Clone)]
pub struct BalanceAggregator {
    source: PlaytimeSource,
    metrics: Option<Arc<MetricsCollector>>,
}

impl BalanceAggregator {
    pub fn new(source: PlaytimeSource) -> Self {
        Self {
            source,
            metrics: None,
        }
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn source(&self) -> &PlaytimeSource {
        &self.source
    }

    /// Aggregate one cohort into hours
    pub async fn aggregate(&self, cohort: &Cohort) -> SideTotal {
        if cohort.is_empty() {
            return SideTotal::Known(0.0);
        }

        let start = Instant::now();
        let result = match &self.source {
            PlaytimeSource::PerPlayer(source) => self.sum_per_player(source.as_ref(), cohort).await,
            PlaytimeSource::Batch(source) => self.sum_batch(source.as_ref(), cohort).await,
        };

        let shape = self.source.shape();
        if let Some(metrics) = &self.metrics {
            metrics.record_aggregation(shape, start.elapsed());
        }

        match result {
            Ok(total) => SideTotal::Known(self.source.unit().to_hours(total)),
            Err(e) => {
                debug!(
                    "Playtime lookup failed for cohort of {} players: {}",
                    cohort.len(),
                    e
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_source_failure(shape);
                }
                SideTotal::Unknown
            }
        }
    }

    /// Aggregate both sides concurrently
    ///
    /// The sides resolve independently; a failure on one does not affect the
    /// other.
    pub async fn aggregate_both(&self, team_one: &Cohort, team_two: &Cohort) -> (SideTotal, SideTotal) {
        tokio::join!(self.aggregate(team_one), self.aggregate(team_two))
    }

    async fn sum_per_player(
        &self,
        source: &dyn PlayerPlaytimeSource,
        cohort: &Cohort,
    ) -> Result<f64> {
        if let Some(metrics) = &self.metrics {
            metrics.record_lookups(self.source.shape(), cohort.len());
        }

        let lookups = cohort.iter().map(|player_id| source.playtime(player_id));
        let results = join_all(lookups).await;

        let mut total = 0.0;
        for (player_id, result) in cohort.iter().zip(results) {
            match result? {
                PlaytimeResult::Known(playtime) => total += playtime,
                PlaytimeResult::Unknown => {
                    debug!("Playtime of {} is unknown, counting as zero", player_id);
                }
            }
        }

        Ok(total)
    }

    async fn sum_batch(&self, source: &dyn BatchPlaytimeSource, cohort: &Cohort) -> Result<f64> {
        if let Some(metrics) = &self.metrics {
            metrics.record_lookups(self.source.shape(), 1);
        }

        let player_ids: Vec<PlayerId> = cohort.iter().cloned().collect();
        source.total_playtime(&player_ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playtime::{InMemoryPlaytimeSource, PlaytimeUnit};

    fn cohort(ids: &[&str]) -> Cohort {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn per_player(source: &Arc<InMemoryPlaytimeSource>) -> BalanceAggregator {
        BalanceAggregator::new(PlaytimeSource::PerPlayer(source.clone()))
    }

    fn batch(source: &Arc<InMemoryPlaytimeSource>) -> BalanceAggregator {
        BalanceAggregator::new(PlaytimeSource::Batch(source.clone()))
    }

    #[tokio::test]
    async fn test_empty_cohort_skips_source() {
        let source = Arc::new(InMemoryPlaytimeSource::new(PlaytimeUnit::Hours));
        source.set_unavailable(true);

        assert_eq!(
            per_player(&source).aggregate(&Cohort::new()).await,
            SideTotal::Known(0.0)
        );
        assert_eq!(
            batch(&source).aggregate(&Cohort::new()).await,
            SideTotal::Known(0.0)
        );
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_per_player_sum_in_hours() {
        let source = Arc::new(InMemoryPlaytimeSource::with_playtimes(
            PlaytimeUnit::Minutes,
            [("a", 600.0), ("b", 1200.0)],
        ));

        let total = per_player(&source).aggregate(&cohort(&["a", "b"])).await;

        assert_eq!(total, SideTotal::Known(30.0));
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_players_count_as_zero() {
        let source = Arc::new(InMemoryPlaytimeSource::with_playtimes(
            PlaytimeUnit::Hours,
            [("a", 5.0)],
        ));

        let total = per_player(&source)
            .aggregate(&cohort(&["a", "ghost", "private"]))
            .await;
        assert_eq!(total, SideTotal::Known(5.0));

        let all_unknown = per_player(&source).aggregate(&cohort(&["x", "y"])).await;
        assert_eq!(all_unknown, SideTotal::Known(0.0));
    }

    #[tokio::test]
    async fn test_per_player_failure_makes_side_unknown() {
        let source = Arc::new(InMemoryPlaytimeSource::with_playtimes(
            PlaytimeUnit::Hours,
            [("a", 5.0), ("b", 7.0)],
        ));
        source.fail_for("b").unwrap();

        let total = per_player(&source).aggregate(&cohort(&["a", "b"])).await;
        assert_eq!(total, SideTotal::Unknown);
    }

    #[tokio::test]
    async fn test_batch_sum_in_hours() {
        let source = Arc::new(InMemoryPlaytimeSource::with_playtimes(
            PlaytimeUnit::Seconds,
            [("a", 36_000.0), ("b", 7_200.0)],
        ));

        let total = batch(&source).aggregate(&cohort(&["a", "b", "c"])).await;

        assert_eq!(total, SideTotal::Known(12.0));
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_failure_makes_side_unknown() {
        let source = Arc::new(InMemoryPlaytimeSource::new(PlaytimeUnit::Seconds));
        source.set_unavailable(true);

        let total = batch(&source).aggregate(&cohort(&["a"])).await;
        assert_eq!(total, SideTotal::Unknown);
    }

    #[tokio::test]
    async fn test_sides_resolve_independently() {
        let source = Arc::new(InMemoryPlaytimeSource::with_playtimes(
            PlaytimeUnit::Hours,
            [("a1", 1.0), ("b1", 20.0)],
        ));
        source.fail_for("a1").unwrap();

        let (one, two) = batch(&source)
            .aggregate_both(&cohort(&["a1"]), &cohort(&["b1"]))
            .await;

        assert_eq!(one, SideTotal::Unknown);
        assert_eq!(two, SideTotal::Known(20.0));
    }

    #[tokio::test]
    async fn test_failures_are_counted() {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let source = Arc::new(InMemoryPlaytimeSource::new(PlaytimeUnit::Hours));
        source.set_unavailable(true);

        let aggregator = per_player(&source).with_metrics(metrics.clone());
        aggregator.aggregate(&cohort(&["a", "b"])).await;

        let playtime = metrics.playtime();
        assert_eq!(
            playtime.lookups_total.with_label_values(&["per_player"]).get(),
            2
        );
        assert_eq!(
            playtime
                .source_failures_total
                .with_label_values(&["per_player"])
                .get(),
            1
        );
    }
}
