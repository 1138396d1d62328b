//! A dimensional metrics client. Meters are identified by a name plus a set
//! of tags and live in a [`Registry`], which periodically sweeps them and
//! publishes the results to an aggregation backend.
//!
//! ```no_run
//! # async fn demo() -> atlas_meter::Result<()> {
//! use atlas_meter::{Config, Registry};
//!
//! let mut config = Config::default();
//! config.uri = "http://localhost:7101/api/v4/publish".into();
//! let registry = Registry::new(config)?;
//! registry.start()?;
//! registry.counter("server.requests", &[("status", "200")]).increment();
//! registry.stop().await;
//! # Ok(())
//! # }
//! ```

mod clock;
mod codec;
mod collector;
mod config;
mod error;
mod export;
mod id;
mod logger;
mod metrics;
mod registry;
mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use export::{MetricSnapshot, Snapshot, Tag, TaggedValues, Value};
pub use id::Id;
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use metrics::{
    counter::Counter, distribution_summary::DistributionSummary, gauge::Gauge, timer::Timer,
    Kind, Measurement, Meter, Op, Statistic,
};
pub use registry::Registry;
pub use transport::{HttpTransport, Transport};
