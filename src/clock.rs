use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

/// A source of "now", expressed as nanoseconds since the unix epoch.
pub trait Clock: Send + Sync + 'static {
    fn nanos(&self) -> u64;

    fn millis(&self) -> u64 {
        self.nanos() / 1_000_000
    }
}

/// Instead of using a non-monotonic system time call for every reading we use
/// a base timestamp and a monotonic offset. Regardless of clock skew that
/// happens after construction the reported time never goes backwards.
/// NOTE: this doesn't handle the case where the clock is skewed from the start.
#[derive(Copy, Clone)]
pub struct SystemClock {
    instant: Instant,
    unix_ns: u64,
}

impl SystemClock {
    pub fn new() -> Self {
        let unix_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self {
            instant: Instant::now(),
            unix_ns,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn nanos(&self) -> u64 {
        self.unix_ns + self.instant.elapsed().as_nanos() as u64
    }
}

impl fmt::Debug for SystemClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemClock")
            .field("unix_ns", &self.unix_ns)
            .finish()
    }
}

/// A clock that only moves when told to. Meant for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new(nanos: u64) -> Self {
        Self {
            nanos: AtomicU64::new(nanos),
        }
    }

    pub fn set_nanos(&self, nanos: u64) {
        self.nanos.store(nanos, Ordering::Relaxed);
    }

    pub fn advance(&self, by: Duration) {
        self.nanos
            .fetch_add(by.as_nanos() as u64, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn nanos(&self) -> u64 {
        self.nanos.load(Ordering::Relaxed)
    }
}
