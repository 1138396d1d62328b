use std::mem;

use parking_lot::Mutex;

use super::{Measurement, Measurements, Statistic};
use crate::Id;

/// One measurement period of a composite meter. All four fields move
/// together: they are updated under one lock and swapped out as a whole.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct PeriodStats {
    pub(crate) count: u64,
    pub(crate) total: u64,
    pub(crate) total_of_squares: f64,
    pub(crate) max: u64,
}

impl PeriodStats {
    fn record(&mut self, amount: u64) {
        self.count += 1;
        self.total = self.total.saturating_add(amount);
        let amount_f = amount as f64;
        self.total_of_squares += amount_f * amount_f;
        if amount > self.max {
            self.max = amount;
        }
    }

    /// Expand into measurements, `total_stat` naming the kind-specific
    /// running total.
    pub(crate) fn into_measurements(self, id: &Id, total_stat: Statistic) -> Measurements {
        [
            (Statistic::Count, self.count as f64),
            (total_stat, self.total as f64),
            (Statistic::TotalOfSquares, self.total_of_squares),
            (Statistic::Max, self.max as f64),
        ]
        .into_iter()
        .map(|(stat, value)| Measurement::new(id, stat, value))
        .collect()
    }
}

/// The accumulator shared by timers and distribution summaries. The lock is
/// only ever held for the in-memory update or swap.
#[derive(Debug, Default)]
pub(crate) struct CompositeStats {
    current: Mutex<PeriodStats>,
}

impl CompositeStats {
    pub(crate) fn record(&self, amount: u64) {
        self.current.lock().record(amount);
    }

    /// The current period without resetting it.
    pub(crate) fn peek(&self) -> PeriodStats {
        *self.current.lock()
    }

    /// Swap in a zeroed period and return the previous one whole.
    pub(crate) fn take(&self) -> PeriodStats {
        mem::take(&mut *self.current.lock())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn take_resets() {
        let stats = CompositeStats::default();
        stats.record(3);
        stats.record(4);
        let taken = stats.take();
        assert_eq!(
            taken,
            PeriodStats {
                count: 2,
                total: 7,
                total_of_squares: 25.0,
                max: 4,
            }
        );
        assert_eq!(stats.take(), PeriodStats::default());
    }

    #[test]
    fn snapshots_stay_consistent_under_contention() {
        const THREADS: u64 = 4;
        const RECORDS: u64 = 20_000;
        let stats = &CompositeStats::default();
        let mut taken = Vec::new();
        thread::scope(|s| {
            let producers: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(move || {
                        for _ in 0..RECORDS {
                            stats.record(2);
                        }
                    })
                })
                .collect();
            while producers.iter().any(|p| !p.is_finished()) {
                taken.push(stats.take());
            }
        });
        taken.push(stats.take());

        let mut count = 0;
        for period in &taken {
            // Every value is 2, so a torn snapshot would break these.
            assert_eq!(period.total, period.count * 2);
            assert_eq!(period.total_of_squares, (period.count * 4) as f64);
            count += period.count;
        }
        assert_eq!(count, THREADS * RECORDS);
    }
}
