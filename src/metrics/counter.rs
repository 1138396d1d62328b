use std::{
    any::Any,
    sync::{atomic, Arc},
};

use smallvec::smallvec;

use super::{Kind, Measurement, Measurements, Statistic};
use crate::{clock::Clock, Id};

struct CounterInner {
    id: Id,
    count: atomic::AtomicU64,
}

/// A delta counter used to record the rate of actions happening. The value is
/// reset when measured, so each sweep reports the delta since the last one.
#[derive(Clone)]
pub struct Counter {
    inner: Arc<CounterInner>,
}

impl Counter {
    pub fn add(&self, delta: u64) {
        self.inner.count.fetch_add(delta, atomic::Ordering::Relaxed);
    }

    pub fn increment(&self) {
        self.add(1);
    }

    /// The accumulated count since the last sweep. Does not reset.
    pub fn count(&self) -> u64 {
        self.inner.count.load(atomic::Ordering::Relaxed)
    }

    pub fn id(&self) -> &Id {
        &self.inner.id
    }

    #[cfg(test)]
    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl super::Metric for Counter {
    const KIND: Kind = Kind::Counter;

    fn build(id: Id, _clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(CounterInner {
                id,
                count: Default::default(),
            }),
        }
    }
}

impl super::Recordable for Counter {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn id(&self) -> &Id {
        &self.inner.id
    }

    fn kind(&self) -> Kind {
        Kind::Counter
    }

    fn measure(&self) -> Measurements {
        let delta = self.inner.count.swap(0, atomic::Ordering::AcqRel);
        smallvec![Measurement::new(
            &self.inner.id,
            Statistic::Count,
            delta as f64
        )]
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::{
        clock::ManualClock,
        metrics::{Metric, Recordable},
    };

    fn counter() -> Counter {
        Counter::build(Id::new("requests", &[]), Arc::new(ManualClock::default()))
    }

    #[test]
    fn measure_resets() {
        let c = counter();
        c.increment();
        c.add(9);
        assert_eq!(c.count(), 10);

        let m = c.measure();
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].statistic, Statistic::Count);
        assert_eq!(m[0].value, 10.0);

        assert_eq!(c.measure()[0].value, 0.0);
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn concurrent_adds_are_not_lost() {
        const THREADS: usize = 8;
        const ADDS: usize = 10_000;
        let c = counter();
        thread::scope(|s| {
            for _ in 0..THREADS {
                let c = c.clone();
                s.spawn(move || {
                    for _ in 0..ADDS {
                        c.increment();
                    }
                });
            }
        });
        assert_eq!(c.measure()[0].value, (THREADS * ADDS) as f64);
    }

    #[test]
    fn concurrent_measure_never_double_counts() {
        const ADDS: u64 = 50_000;
        let c = counter();
        let total = thread::scope(|s| {
            let producer = {
                let c = c.clone();
                s.spawn(move || {
                    for _ in 0..ADDS {
                        c.increment();
                    }
                })
            };
            let mut seen = 0.0;
            while !producer.is_finished() {
                seen += c.measure()[0].value;
            }
            seen
        });
        assert_eq!(total + c.measure()[0].value, ADDS as f64);
    }
}
