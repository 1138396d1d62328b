use std::{any::Any, sync::Arc};

use super::{stats::CompositeStats, Kind, Measurements, Statistic};
use crate::{clock::Clock, Id};

struct SummaryInner {
    id: Id,
    stats: CompositeStats,
}

/// Tracks the distribution of arbitrary amounts, e.g. payload sizes.
#[derive(Clone)]
pub struct DistributionSummary {
    inner: Arc<SummaryInner>,
}

impl DistributionSummary {
    /// Record an amount. Negative amounts are ignored.
    pub fn record(&self, amount: i64) {
        if let Ok(amount) = u64::try_from(amount) {
            self.inner.stats.record(amount);
        }
    }

    pub fn count(&self) -> u64 {
        self.inner.stats.peek().count
    }

    pub fn total_amount(&self) -> u64 {
        self.inner.stats.peek().total
    }

    pub fn id(&self) -> &Id {
        &self.inner.id
    }
}

impl super::Metric for DistributionSummary {
    const KIND: Kind = Kind::DistributionSummary;

    fn build(id: Id, _clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(SummaryInner {
                id,
                stats: CompositeStats::default(),
            }),
        }
    }
}

impl super::Recordable for DistributionSummary {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn id(&self) -> &Id {
        &self.inner.id
    }

    fn kind(&self) -> Kind {
        Kind::DistributionSummary
    }

    fn measure(&self) -> Measurements {
        self.inner
            .stats
            .take()
            .into_measurements(&self.inner.id, Statistic::TotalAmount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        metrics::{Metric, Recordable},
    };

    fn summary() -> DistributionSummary {
        DistributionSummary::build(
            Id::new("payload.size", &[]),
            Arc::new(ManualClock::default()),
        )
    }

    #[test]
    fn records_amounts() {
        let ds = summary();
        ds.record(100);
        ds.record(50);
        assert_eq!(ds.count(), 2);
        assert_eq!(ds.total_amount(), 150);

        let stats: Vec<_> = ds
            .measure()
            .into_iter()
            .map(|m| (m.statistic.label(), m.value))
            .collect();
        assert_eq!(
            stats,
            vec![
                ("count", 2.0),
                ("totalAmount", 150.0),
                ("totalOfSquares", 12_500.0),
                ("max", 100.0),
            ]
        );
        assert_eq!(ds.count(), 0);
    }

    #[test]
    fn ignores_negative() {
        let ds = summary();
        ds.record(-1);
        assert_eq!(ds.count(), 0);
        ds.record(0);
        assert_eq!(ds.count(), 1);
    }
}
