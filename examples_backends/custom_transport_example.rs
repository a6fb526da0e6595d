use std::sync::Arc;

use async_trait::async_trait;
use tracing_discord_sink::{
    Attachment, DiscordLogger, ExceptionInfo, NoContext, NotificationPayload, Severity, SinkConfig, TransportError,
    WebhookTransport,
};

/// Example of delivering to a completely custom endpoint by implementing
/// the `WebhookTransport` trait directly. Imagine this talks to some chat
/// service this crate does not ship a client for.
struct StdoutTransport;

#[async_trait]
impl WebhookTransport for StdoutTransport {
    async fn send_inline(&self, message: &NotificationPayload) -> Result<(), TransportError> {
        println!("[chat] {} {:?}", message.headline, message.body_text);
        for field in &message.fields {
            println!("  {}: {}", field.name, field.value);
        }
        Ok(())
    }

    async fn send_with_attachment(
        &self,
        message: &NotificationPayload,
        attachment: &Attachment,
    ) -> Result<(), TransportError> {
        println!("[chat] {} with {} ({} bytes)", message.headline, attachment.filename, attachment.bytes.len());
        println!("{}", attachment.as_text());
        Ok(())
    }

    fn inline_limit(&self) -> usize {
        500
    }
}

#[tokio::main]
async fn main() {
    let logger = DiscordLogger::new(
        SinkConfig::default().application_name("custom-transport"),
        Arc::new(StdoutTransport),
        Arc::new(NoContext),
    );

    let exception = ExceptionInfo::new("std::io::Error", "connection refused")
        .with_source("db::pool")
        .with_data("host", "10.0.0.7");

    let result = logger
        .log(
            Severity::Error,
            Some(exception),
            Some(|e: Option<&ExceptionInfo>| format!("database unavailable: {}", e.map_or("", |e| e.message.as_str()))),
        )
        .await;

    if let Err(e) = result {
        eprintln!("log call rejected: {}", e);
    }
}
