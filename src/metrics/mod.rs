use std::{any::Any, fmt, sync::Arc};

use serde::Serialize;
use smallvec::SmallVec;

use crate::{clock::Clock, Id};

pub(crate) mod counter;
pub(crate) mod distribution_summary;
pub(crate) mod gauge;
pub(crate) mod stats;
pub(crate) mod timer;

/// The four meter kinds a registry can hold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Kind {
    Counter,
    Gauge,
    Timer,
    DistributionSummary,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Counter => "Counter",
            Kind::Gauge => "Gauge",
            Kind::Timer => "Timer",
            Kind::DistributionSummary => "DistributionSummary",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the backend combines values of a statistic reported by many sources.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    Add = 0,
    Max = 10,
}

/// A named facet of a meter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Statistic {
    Count,
    Gauge,
    TotalTime,
    TotalAmount,
    TotalOfSquares,
    Max,
}

impl Statistic {
    pub fn label(&self) -> &'static str {
        match self {
            Statistic::Count => "count",
            Statistic::Gauge => "gauge",
            Statistic::TotalTime => "totalTime",
            Statistic::TotalAmount => "totalAmount",
            Statistic::TotalOfSquares => "totalOfSquares",
            Statistic::Max => "max",
        }
    }

    pub fn op(&self) -> Op {
        match self {
            Statistic::Count
            | Statistic::TotalTime
            | Statistic::TotalAmount
            | Statistic::TotalOfSquares => Op::Add,
            Statistic::Gauge | Statistic::Max => Op::Max,
        }
    }
}

/// One value taken from a meter during a sweep. For sum-combined statistics
/// this is the delta since the previous sweep.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub id: Id,
    pub statistic: Statistic,
    pub value: f64,
}

impl Measurement {
    pub(crate) fn new(id: &Id, statistic: Statistic, value: f64) -> Self {
        Self {
            id: id.clone(),
            statistic,
            value,
        }
    }
}

pub(crate) type Measurements = SmallVec<[Measurement; 4]>;

/// The public, typed side of a meter. Lets the registry build a fresh meter of
/// the requested kind on first use.
pub trait Metric: Sized {
    const KIND: Kind;

    fn build(id: Id, clock: Arc<dyn Clock>) -> Self;
}

/// The type-erased side of a meter, as stored in the registry and visited by
/// sweeps.
pub trait Recordable: Send + Sync + 'static {
    /// Lets the registry turn a `dyn Recordable` back into the concrete
    /// [`Metric`] the caller expects.
    fn as_any(&self) -> &dyn Any;

    fn id(&self) -> &Id;

    fn kind(&self) -> Kind;

    /// Take the current statistics and reset the accumulator.
    fn measure(&self) -> Measurements;
}

/// A handle to any registered meter.
#[derive(Clone)]
pub struct Meter {
    inner: Arc<dyn Recordable>,
}

impl Meter {
    pub(crate) fn new(inner: Arc<dyn Recordable>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> &Id {
        self.inner.id()
    }

    pub fn kind(&self) -> Kind {
        self.inner.kind()
    }

    /// Take the current statistics of this meter, resetting it.
    pub fn measure(&self) -> Vec<Measurement> {
        self.inner.measure().into_vec()
    }

    pub(crate) fn downcast<M: Metric + Clone + 'static>(&self) -> Option<M> {
        self.inner.as_any().downcast_ref::<M>().cloned()
    }
}

impl fmt::Debug for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meter")
            .field("id", self.id())
            .field("kind", &self.kind())
            .finish()
    }
}
