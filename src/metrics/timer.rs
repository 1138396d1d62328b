use std::{any::Any, sync::Arc, time::Duration};

use super::{stats::CompositeStats, Kind, Measurements, Statistic};
use crate::{clock::Clock, Id};

struct TimerInner {
    id: Id,
    clock: Arc<dyn Clock>,
    stats: CompositeStats,
}

/// Tracks how long something takes. Reports `count`, `totalTime`,
/// `totalOfSquares` and `max`, all in nanoseconds.
#[derive(Clone)]
pub struct Timer {
    inner: Arc<TimerInner>,
}

impl Timer {
    pub fn record(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.inner.stats.record(nanos);
    }

    /// Run `f` and record how long it took according to the registry clock.
    pub fn time<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = self.inner.clock.nanos();
        let result = f();
        let end = self.inner.clock.nanos();
        self.record(Duration::from_nanos(end.saturating_sub(start)));
        result
    }

    /// Number of recordings since the last sweep.
    pub fn count(&self) -> u64 {
        self.inner.stats.peek().count
    }

    /// Total recorded time since the last sweep.
    pub fn total_time(&self) -> Duration {
        Duration::from_nanos(self.inner.stats.peek().total)
    }

    pub fn id(&self) -> &Id {
        &self.inner.id
    }
}

impl super::Metric for Timer {
    const KIND: Kind = Kind::Timer;

    fn build(id: Id, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                id,
                clock,
                stats: CompositeStats::default(),
            }),
        }
    }
}

impl super::Recordable for Timer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn id(&self) -> &Id {
        &self.inner.id
    }

    fn kind(&self) -> Kind {
        Kind::Timer
    }

    fn measure(&self) -> Measurements {
        self.inner
            .stats
            .take()
            .into_measurements(&self.inner.id, Statistic::TotalTime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        metrics::{Metric, Recordable},
    };

    const SECOND_NS: f64 = 1_000_000_000.0;

    #[test]
    fn one_second() {
        let t = Timer::build(Id::new("latency", &[]), Arc::new(ManualClock::default()));
        t.record(Duration::from_secs(1));
        assert_eq!(t.count(), 1);
        assert_eq!(t.total_time(), Duration::from_secs(1));

        let stats: Vec<_> = t
            .measure()
            .into_iter()
            .map(|m| (m.statistic, m.value))
            .collect();
        assert_eq!(
            stats,
            vec![
                (Statistic::Count, 1.0),
                (Statistic::TotalTime, SECOND_NS),
                (Statistic::TotalOfSquares, SECOND_NS * SECOND_NS),
                (Statistic::Max, SECOND_NS),
            ]
        );

        assert!(t.measure().iter().all(|m| m.value == 0.0));
    }

    #[test]
    fn time_uses_clock() {
        let clock = Arc::new(ManualClock::new(100));
        let t = Timer::build(Id::new("latency", &[]), clock.clone());
        let out = t.time(|| {
            clock.advance(Duration::from_millis(5));
            7
        });
        assert_eq!(out, 7);
        assert_eq!(t.total_time(), Duration::from_millis(5));
    }

    #[test]
    fn max_tracks_largest() {
        let t = Timer::build(Id::new("latency", &[]), Arc::new(ManualClock::default()));
        t.record(Duration::from_millis(3));
        t.record(Duration::from_millis(9));
        t.record(Duration::from_millis(1));
        let max = t
            .measure()
            .into_iter()
            .find(|m| m.statistic == Statistic::Max)
            .unwrap();
        assert_eq!(max.value, 9_000_000.0);
    }
}
