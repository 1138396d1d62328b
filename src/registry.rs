use std::{fmt, sync::Arc, time::Instant};

use dashmap::DashMap;

use crate::{
    clock::Clock,
    collector::Collector,
    config::Config,
    error::{Error, Result},
    export::{self, Snapshot},
    id::BuildIdHasher,
    logger::Logger,
    metrics::{Measurement, Meter, Metric, Recordable},
    transport::{HttpTransport, Transport},
    Counter, DistributionSummary, Gauge, Id, Timer,
};

struct Inner {
    config: Config,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
    /// Only ever grows, meters live as long as the registry.
    meters: DashMap<Id, Meter, BuildIdHasher>,
    collector: Collector,
}

/// Holds exactly one meter per [`Id`] and publishes all of them on a fixed
/// schedule once started. Cloning is cheap and every clone shares the same
/// meters.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

impl Registry {
    /// Build a registry that publishes over HTTP.
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build a registry that hands its payloads to `transport`.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                clock: config.clock(),
                logger: config.logger(),
                config,
                meters: DashMap::with_hasher(BuildIdHasher),
                collector: Collector::new(transport),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    pub(crate) fn logger(&self) -> &dyn Logger {
        self.inner.logger.as_ref()
    }

    pub fn new_id(&self, name: &str, tags: &[(&str, &str)]) -> Id {
        Id::new(name, tags)
    }

    /// Lookups of existing meters only take a shard read lock. Creation takes
    /// the shard write lock through the entry API, so concurrent first use of
    /// one id builds exactly one meter.
    fn register<M>(&self, id: Id) -> Result<M>
    where
        M: Metric + Recordable + Clone,
    {
        // The read guard must be gone before `entry` locks the same shard.
        let existing = self.inner.meters.get(&id).map(|e| e.value().clone());
        let meter = match existing {
            Some(existing) => existing,
            None => self
                .inner
                .meters
                .entry(id.clone())
                .or_insert_with(|| {
                    Meter::new(Arc::new(M::build(id.clone(), self.inner.clock.clone())))
                })
                .value()
                .clone(),
        };
        meter.downcast::<M>().ok_or_else(|| Error::KindMismatch {
            id,
            registered: meter.kind(),
            requested: M::KIND,
        })
    }

    fn must<M>(&self, id: Id) -> M
    where
        M: Metric + Recordable + Clone,
    {
        self.register(id).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Get or create the counter for `name` and `tags`.
    ///
    /// # Panics
    /// If the id is already registered as another kind of meter.
    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> Counter {
        self.must(Id::new(name, tags))
    }

    pub fn counter_with_id(&self, id: Id) -> Counter {
        self.must(id)
    }

    pub fn try_counter(&self, name: &str, tags: &[(&str, &str)]) -> Result<Counter> {
        self.register(Id::new(name, tags))
    }

    /// Get or create the gauge for `name` and `tags`.
    ///
    /// # Panics
    /// If the id is already registered as another kind of meter.
    pub fn gauge(&self, name: &str, tags: &[(&str, &str)]) -> Gauge {
        self.must(Id::new(name, tags))
    }

    pub fn gauge_with_id(&self, id: Id) -> Gauge {
        self.must(id)
    }

    pub fn try_gauge(&self, name: &str, tags: &[(&str, &str)]) -> Result<Gauge> {
        self.register(Id::new(name, tags))
    }

    /// Get or create the timer for `name` and `tags`.
    ///
    /// # Panics
    /// If the id is already registered as another kind of meter.
    pub fn timer(&self, name: &str, tags: &[(&str, &str)]) -> Timer {
        self.must(Id::new(name, tags))
    }

    pub fn timer_with_id(&self, id: Id) -> Timer {
        self.must(id)
    }

    pub fn try_timer(&self, name: &str, tags: &[(&str, &str)]) -> Result<Timer> {
        self.register(Id::new(name, tags))
    }

    /// Get or create the distribution summary for `name` and `tags`.
    ///
    /// # Panics
    /// If the id is already registered as another kind of meter.
    pub fn distribution_summary(&self, name: &str, tags: &[(&str, &str)]) -> DistributionSummary {
        self.must(Id::new(name, tags))
    }

    pub fn distribution_summary_with_id(&self, id: Id) -> DistributionSummary {
        self.must(id)
    }

    pub fn try_distribution_summary(
        &self,
        name: &str,
        tags: &[(&str, &str)],
    ) -> Result<DistributionSummary> {
        self.register(Id::new(name, tags))
    }

    /// A point in time copy of every registered meter handle.
    pub fn meters(&self) -> Vec<Meter> {
        self.inner
            .meters
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Sweep every meter, taking and resetting its statistics. The map is
    /// only locked while copying handles, never while measuring.
    pub fn measurements(&self) -> Vec<Measurement> {
        let start = Instant::now();
        let meters = self.meters();
        let measurements: Vec<Measurement> = meters.iter().flat_map(Meter::measure).collect();
        self.logger().debug(format_args!(
            "swept {} meters into {} measurements in {:?}",
            meters.len(),
            measurements.len(),
            start.elapsed()
        ));
        measurements
    }

    /// Sweep every meter into a structured snapshot for pull based exposition.
    pub fn export(&self) -> Snapshot {
        export::snapshot(self)
    }

    /// Run one publish cycle right now.
    pub async fn publish(&self) {
        self.inner.collector.publish(self).await
    }

    /// Start publishing every `frequency` on the current tokio runtime.
    pub fn start(&self) -> Result<()> {
        self.inner.collector.start(self.clone())
    }

    /// Stop publishing. Once this returns no publish is in flight and none
    /// will be started. Calling it on a stopped registry does nothing.
    pub async fn stop(&self) {
        self.inner.collector.stop(self.logger()).await
    }

    pub fn is_running(&self) -> bool {
        self.inner.collector.is_running()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.inner.config)
            .field("meters", &self.inner.meters.len())
            .finish_non_exhaustive()
    }
}
