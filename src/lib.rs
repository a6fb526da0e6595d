//! Tracing sink that posts log events to a Discord webhook.
//!
//! Short operational messages are sent inline; exception details always
//! travel as an `exception-details.txt` attachment, and inline messages the
//! platform rejects for their size are re-sent once as `message.txt`.

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod env;
pub mod error;
pub mod formatter;
pub mod init;
pub mod layer;
pub mod logger;
pub mod noop_sink;
pub mod payload;
pub mod record;
pub mod transport;
pub mod webhook;

pub use config::{ClaimFieldMapping, SinkConfig, WebhookUrl};
pub use context::{ContextProvider, NoContext, RequestContext};
pub use dispatcher::{Delivery, Dispatcher};
pub use error::{ConfigError, DeliveryError, InitError, SinkError, TransportError};
pub use formatter::Formatter;
pub use layer::DiscordLayer;
pub use logger::{DiscordLogger, SinkStats};
pub use payload::{Attachment, ContextField, NotificationPayload};
pub use record::{ExceptionInfo, LogEvent, Severity};
pub use transport::WebhookTransport;
pub use webhook::DiscordWebhookClient;
