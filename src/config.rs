use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use serde::Deserialize;

use crate::{
    clock::{Clock, SystemClock},
    error::{Error, Result},
    logger::{Logger, NoopLogger},
};

pub(crate) type EnabledFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Registry configuration. Loading it is left to the host; anything that
/// speaks serde can produce one.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// How often the publisher sweeps and sends all meters.
    #[serde(with = "humantime_serde", default = "default_frequency")]
    pub frequency: Duration,
    /// Upper bound for a single publish request.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
    /// Where payloads are POSTed. Empty means pull-only: meters are still
    /// swept on schedule but nothing is sent.
    #[serde(default)]
    pub uri: String,
    /// Maximum number of records per payload.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Tags added to every published record.
    #[serde(default)]
    pub common_tags: BTreeMap<String, String>,
    #[serde(skip)]
    pub(crate) is_enabled: Option<EnabledFn>,
    #[serde(skip)]
    pub(crate) logger: Option<Arc<dyn Logger>>,
    #[serde(skip)]
    pub(crate) clock: Option<Arc<dyn Clock>>,
}

fn default_frequency() -> Duration {
    Duration::from_secs(5)
}

fn default_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_batch_size() -> usize {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
            timeout: default_timeout(),
            uri: String::new(),
            batch_size: default_batch_size(),
            common_tags: BTreeMap::new(),
            is_enabled: None,
            logger: None,
            clock: None,
        }
    }
}

impl Config {
    /// Gate every publish tick on `f`. While it returns false ticks are
    /// skipped entirely and meters keep accumulating.
    pub fn with_enabled<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.is_enabled = Some(Arc::new(f));
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.frequency.is_zero() {
            return Err(Error::InvalidConfig("frequency must be non-zero".into()));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be non-zero".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be non-zero".into()));
        }
        if !self.uri.is_empty() {
            reqwest::Url::parse(&self.uri)
                .map_err(|e| Error::InvalidConfig(format!("uri {:?}: {e}", self.uri)))?;
        }
        Ok(())
    }

    pub(crate) fn logger(&self) -> Arc<dyn Logger> {
        self.logger
            .clone()
            .unwrap_or_else(|| Arc::new(NoopLogger))
    }

    pub(crate) fn clock(&self) -> Arc<dyn Clock> {
        self.clock
            .clone()
            .unwrap_or_else(|| Arc::new(SystemClock::new()))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("frequency", &self.frequency)
            .field("timeout", &self.timeout)
            .field("uri", &self.uri)
            .field("batch_size", &self.batch_size)
            .field("common_tags", &self.common_tags)
            .field("is_enabled", &self.is_enabled.is_some())
            .finish_non_exhaustive()
    }
}
