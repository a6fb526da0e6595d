use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use tracing_discord_sink::noop_sink::NoopTransport;
use tracing_discord_sink::{DiscordLayer, DiscordLogger, NoContext, Severity, SinkConfig};

#[tokio::main]
async fn main() {
    let logger = DiscordLogger::new(
        SinkConfig::default().application_name("default-load"),
        Arc::new(NoopTransport),
        Arc::new(NoContext),
    );
    let stats = logger.stats().clone();
    let subscriber = Registry::default().with(DiscordLayer::new(logger.clone(), Severity::Trace));
    tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: formatted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    logger.flush().await;
    println!("delivered: {}", stats.delivered.load(Ordering::Relaxed));
}
