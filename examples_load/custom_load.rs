use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use tracing_discord_sink::noop_sink::NoopTransport;
use tracing_discord_sink::{DiscordLayer, DiscordLogger, ExceptionInfo, NoContext, Severity, SinkConfig};

/// Load test for the exception path: every event carries exception fields,
/// so each one builds an `exception-details.txt` attachment.
#[tokio::main]
async fn main() {
    let config = SinkConfig::default()
        .application_name("custom-load")
        .environment_name("bench")
        .delivery_timeout(Duration::from_secs(5));
    let logger = DiscordLogger::new(config, Arc::new(NoopTransport), Arc::new(NoContext));
    let stats = logger.stats().clone();
    let subscriber = Registry::default().with(DiscordLayer::new(logger.clone(), Severity::Error));
    tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");

    let n: u64 = 50_000;
    let start = Instant::now();

    for i in 0..n {
        error!(
            exception.kind = "LoadError",
            exception.message = "synthetic failure",
            exception.stacktrace = "at custom_load::main",
            exception.data.iteration = i,
            "custom load test error"
        );
    }

    let elapsed = start.elapsed();
    println!("layer: formatted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // The same path, awaited directly instead of through the layer.
    let start = Instant::now();
    for i in 0..n {
        let exception = ExceptionInfo::new("LoadError", "synthetic failure").with_data("iteration", i.to_string());
        let _ = logger
            .log(Severity::Error, Some(exception), Some(|_: Option<&ExceptionInfo>| "custom load test error".to_string()))
            .await;
    }
    println!("direct: delivered {} events in {:?}", n, start.elapsed());

    logger.flush().await;
    println!("delivered: {}, failed: {}",
        stats.delivered.load(Ordering::Relaxed),
        stats.failed.load(Ordering::Relaxed)
    );
}
