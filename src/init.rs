use crate::config::{SinkConfig, WebhookUrl};
use crate::context::{ContextProvider, NoContext};
use crate::env::webhook_url_from_env;
use crate::error::InitError;
use crate::layer::DiscordLayer;
use crate::logger::DiscordLogger;
use crate::record::Severity;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the logging layer.
///
/// **Fields**
/// - `min_severity`: events below this severity never reach the webhook.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top of [`DiscordLayer`] so events are also printed to the
///   console.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub min_severity: Severity,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            min_severity: Severity::Trace,
            enable_stdout: true,
        }
    }
}

/// Build a [`DiscordLayer`] posting to `webhook_url`.
///
/// The URL is validated here; a missing or malformed endpoint fails
/// registration instead of the first send.
pub fn discord_layer(
    webhook_url: &str,
    sink_config: SinkConfig,
    layer_config: &LayerConfig,
    context: Arc<dyn ContextProvider>,
) -> Result<DiscordLayer, InitError> {
    let url = WebhookUrl::parse(webhook_url)?;
    let logger = DiscordLogger::discord(url, sink_config, context);
    Ok(DiscordLayer::new(logger, layer_config.min_severity))
}

/// Initialize the global `tracing` subscriber with a Discord layer.
///
/// **Parameters**
/// - `webhook_url`: webhook endpoint, validated before anything is
///   installed.
/// - `sink_config`: fields and author name shown on every message.
/// - `layer_config`: [`LayerConfig`] controlling filtering and console
///   output.
/// - `context`: source of claim values and request data.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`DiscordLayer`] as the global
/// default subscriber. Returns the logger so callers can read its
/// [`SinkStats`](crate::logger::SinkStats).
pub fn init_tracing_with_config(
    webhook_url: &str,
    sink_config: SinkConfig,
    layer_config: LayerConfig,
    context: Arc<dyn ContextProvider>,
) -> Result<DiscordLogger, InitError> {
    let layer = discord_layer(webhook_url, sink_config, &layer_config, context)?;
    install(layer, layer_config.enable_stdout)
}

fn install(layer: DiscordLayer, enable_stdout: bool) -> Result<DiscordLogger, InitError> {
    let logger = layer.logger().clone();

    // Both branches produce different subscriber types, so each installs
    // its own.
    if enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(logger)
}

/// Initialize tracing with sensible defaults and no ambient context.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`] and [`NoContext`].
pub fn init_tracing(webhook_url: &str, sink_config: SinkConfig) -> Result<DiscordLogger, InitError> {
    init_tracing_with_config(webhook_url, sink_config, LayerConfig::default(), Arc::new(NoContext))
}

/// Initialize tracing from the `DISCORD_SINK_*` environment variables.
pub fn init_tracing_from_env() -> Result<DiscordLogger, InitError> {
    let url = webhook_url_from_env()?;
    let sink_config = SinkConfig::from_env()?;
    let layer_config = LayerConfig::default();
    let logger = DiscordLogger::discord(url, sink_config, Arc::new(NoContext));
    install(DiscordLayer::new(logger, layer_config.min_severity), layer_config.enable_stdout)
}
