use std::error::Error;
use std::time::Duration;

use reqwest::StatusCode;

/// Error returned when the sink cannot be registered.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("webhook URL is missing or empty")]
    MissingWebhookUrl,

    #[error("invalid webhook URL {url:?}: {reason}")]
    InvalidWebhookUrl { url: String, reason: String },

    #[error("invalid value for {key}: {reason}")]
    InvalidEnv { key: &'static str, reason: String },
}

/// Caller contract violations surfaced from a log call.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SinkError {
    #[error("message render function is required")]
    MissingRenderer,
}

/// Failure reported by a [`WebhookTransport`](crate::transport::WebhookTransport).
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("message too large for inline delivery ({len} > {limit})")]
    Oversized { len: usize, limit: usize },

    #[error("rate limited by webhook endpoint (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("webhook endpoint refused credentials: {0}")]
    Unauthorized(StatusCode),

    #[error("webhook request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("webhook request failed: {0}")]
    Network(#[source] Box<dyn Error + Send + Sync>),
}

impl TransportError {
    pub fn is_oversized(&self) -> bool {
        matches!(self, TransportError::Oversized { .. })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(Box::new(err))
    }
}

/// Outcome of a failed delivery attempt. Never surfaced through the logging
/// call itself.
#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("delivery failed: {0}")]
    Transport(#[source] TransportError),

    #[error("inline message rejected as oversized and file fallback failed: {0}")]
    FallbackFailed(#[source] TransportError),

    #[error("delivery did not complete within {0:?}")]
    TimedOut(Duration),
}

/// Error returned while installing the sink as a global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet(#[from] tracing::subscriber::SetGlobalDefaultError),
}
