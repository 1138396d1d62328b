use std::{mem, sync::Arc, time::Instant};

use parking_lot::Mutex;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    codec::{self, Record},
    error::{Error, Result},
    logger::Logger,
    metrics::Op,
    transport::Transport,
    Measurement, Registry,
};

struct Running {
    token: CancellationToken,
    /// Cancelled once the task body, including any in-flight send, is gone.
    exited: CancellationToken,
    handle: JoinHandle<()>,
}

enum State {
    Stopped,
    Running(Running),
    /// Cancellation was requested but the task may still be unwinding.
    Stopping(CancellationToken),
}

impl State {
    /// A `Stopping` task that already exited counts as stopped, even if the
    /// caller that cancelled it never came back to clean up.
    fn is_idle(&self) -> bool {
        match self {
            State::Stopped => true,
            State::Running(_) => false,
            State::Stopping(exited) => exited.is_cancelled(),
        }
    }
}

/// The collector runs the periodic sweep of a registry and ships the results
/// to the backend.
pub(crate) struct Collector {
    transport: Arc<dyn Transport>,
    state: Mutex<State>,
}

/// Sum-combined statistics with nothing to add, and anything NaN or infinite,
/// are not worth a record.
fn should_send(m: &Measurement) -> bool {
    m.value.is_finite() && (m.statistic.op() == Op::Max || m.value > 0.0)
}

impl Collector {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: Mutex::new(State::Stopped),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.state.lock().is_idle()
    }

    pub(crate) fn start(&self, registry: Registry) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let mut state = self.state.lock();
        match &*state {
            State::Running(_) => return Err(Error::AlreadyRunning),
            State::Stopping(_) if !state.is_idle() => return Err(Error::Stopping),
            _ => {}
        }
        registry.logger().info(format_args!(
            "starting publisher, frequency={:?} uri={:?}",
            registry.config().frequency,
            registry.config().uri
        ));
        let token = CancellationToken::new();
        let exited = CancellationToken::new();
        let handle = runtime.spawn({
            let token = token.clone();
            let exited = exited.clone().drop_guard();
            async move {
                let _exited = exited;
                run(registry, token).await
            }
        });
        *state = State::Running(Running {
            token,
            exited,
            handle,
        });
        Ok(())
    }

    /// Cancel the task and wait until it has exited. Every concurrent caller
    /// waits, not just the first one.
    pub(crate) async fn stop(&self, logger: &dyn Logger) {
        // Never hold the lock across the awaits below.
        let running = {
            let mut state = self.state.lock();
            match mem::replace(&mut *state, State::Stopped) {
                State::Stopped => return,
                State::Stopping(exited) => {
                    *state = State::Stopping(exited.clone());
                    Err(exited)
                }
                State::Running(running) => {
                    running.token.cancel();
                    *state = State::Stopping(running.exited.clone());
                    Ok(running)
                }
            }
        };

        match running {
            Ok(Running { handle, .. }) => {
                if let Err(e) = handle.await {
                    logger.error(format_args!("publisher task failed: {e}"));
                }
                let mut state = self.state.lock();
                // A start may already have replaced us.
                if matches!(&*state, State::Stopping(e) if e.is_cancelled()) {
                    *state = State::Stopped;
                }
                drop(state);
                logger.info(format_args!("publisher stopped"));
            }
            Err(exited) => exited.cancelled().await,
        }
    }

    /// One tick: sweep, encode, send. Failures are logged and the affected
    /// batch dropped, nothing is retried.
    pub(crate) async fn publish(&self, registry: &Registry) {
        let config = registry.config();
        let logger = registry.logger();
        if let Some(is_enabled) = &config.is_enabled {
            if !is_enabled() {
                logger.debug(format_args!("publishing is disabled, skipping tick"));
                return;
            }
        }

        let measurements = registry.measurements();
        if config.uri.is_empty() {
            logger.debug(format_args!(
                "no uri configured, dropping {} measurements",
                measurements.len()
            ));
            return;
        }

        let records: Vec<Record<'_>> = measurements
            .iter()
            .filter(|m| should_send(m))
            .map(|m| Record::new(&config.common_tags, m))
            .collect();
        let publish_start = Instant::now();
        let mut sent = 0;
        for payload in codec::batches(&records, config.batch_size) {
            let body = match payload.to_vec() {
                Ok(body) => body,
                Err(e) => {
                    logger.error(format_args!("aborting publish: {e}"));
                    return;
                }
            };
            match self.transport.send(&config.uri, body, config.timeout).await {
                Ok(()) => sent += payload.len(),
                Err(e) => logger.error(format_args!(
                    "failed to publish {} records to {}: {e}",
                    payload.len(),
                    config.uri
                )),
            }
        }
        logger.debug(format_args!(
            "published {sent} of {} records in {:?}",
            records.len(),
            publish_start.elapsed()
        ));
    }
}

async fn run(registry: Registry, token: CancellationToken) {
    let frequency = registry.config().frequency;
    let mut ticker = time::interval_at(time::Instant::now() + frequency, frequency);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        // A slow publish is abandoned mid-flight once cancelled.
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = registry.publish() => {}
        }
    }
}
