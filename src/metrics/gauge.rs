use std::{
    any::Any,
    sync::{atomic, Arc},
};

use smallvec::{smallvec, SmallVec};

use super::{Kind, Measurement, Measurements, Statistic};
use crate::{clock::Clock, Id};

/// Bit pattern of the canonical NaN, used as the "unset" state.
const UNSET: u64 = 0x7ff8_0000_0000_0000;

struct GaugeInner {
    id: Id,
    value: atomic::AtomicU64,
}

/// Reports the last value it was set to. Gauges are read-once: a sweep moves
/// the gauge from `Set(v)` back to unset, and an unset gauge reports nothing.
/// Setting NaN is the same as leaving the gauge unset.
#[derive(Clone)]
pub struct Gauge {
    inner: Arc<GaugeInner>,
}

impl Gauge {
    pub fn set(&self, value: f64) {
        self.inner
            .value
            .store(value.to_bits(), atomic::Ordering::Release)
    }

    /// The current value, if one was set since the last sweep.
    pub fn get(&self) -> Option<f64> {
        let value = f64::from_bits(self.inner.value.load(atomic::Ordering::Acquire));
        (!value.is_nan()).then_some(value)
    }

    pub fn id(&self) -> &Id {
        &self.inner.id
    }
}

impl super::Metric for Gauge {
    const KIND: Kind = Kind::Gauge;

    fn build(id: Id, _clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(GaugeInner {
                id,
                value: atomic::AtomicU64::new(UNSET),
            }),
        }
    }
}

impl super::Recordable for Gauge {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn id(&self) -> &Id {
        &self.inner.id
    }

    fn kind(&self) -> Kind {
        Kind::Gauge
    }

    fn measure(&self) -> Measurements {
        let value = f64::from_bits(self.inner.value.swap(UNSET, atomic::Ordering::AcqRel));
        if value.is_nan() {
            return SmallVec::new();
        }
        smallvec![Measurement::new(&self.inner.id, Statistic::Gauge, value)]
    }
}
