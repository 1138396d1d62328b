use std::{sync::Arc, time::Duration};

use atlas_meter::{Config, Registry, TracingLogger};

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let uri = std::env::args().nth(1).unwrap_or_default();
    let mut config = Config::default();
    config.frequency = Duration::from_secs(1);
    config.uri = uri;
    config.common_tags = [("nf.app".to_string(), "demo".to_string())].into();
    let registry = Registry::new(config.with_logger(Arc::new(TracingLogger)))?;
    registry.start()?;

    let counter = registry.counter("demo.requests", &[("status", "ok")]);
    let latency = registry.timer("demo.latency", &[]);
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    for _ in 0..30 {
        ticker.tick().await;
        latency.time(|| counter.increment());
    }
    registry.stop().await;

    println!("{}", serde_json::to_string_pretty(&registry.export())?);
    Ok(())
}
