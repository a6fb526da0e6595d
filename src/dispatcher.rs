use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::DeliveryError;
use crate::payload::NotificationPayload;
use crate::transport::WebhookTransport;

/// How a payload ended up being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent as a regular inline message.
    Inline,
    /// Sent with the payload's own attachment.
    Attachment,
    /// Rejected inline as oversized, then accepted as a file.
    FallbackAttachment,
    /// Payload had no content; the transport was not called.
    Skipped,
}

/// Delivers payloads through a shared [`WebhookTransport`].
///
/// Every call is independent: the only fallback is a single resend as a
/// file attachment after an inline message was rejected for its size.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn WebhookTransport>,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn WebhookTransport>) -> Self {
        Self { transport, timeout: None }
    }

    /// Bound the whole attempt, fallback included. Expiry is reported as
    /// [`DeliveryError::TimedOut`].
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn dispatch(&self, payload: NotificationPayload) -> Result<Delivery, DeliveryError> {
        if !payload.has_content() {
            debug!(headline = %payload.headline, "payload has no content, skipping delivery");
            return Ok(Delivery::Skipped);
        }

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.attempt(payload))
                .await
                .map_err(|_| DeliveryError::TimedOut(limit))?,
            None => self.attempt(payload).await,
        }
    }

    async fn attempt(&self, payload: NotificationPayload) -> Result<Delivery, DeliveryError> {
        if let Some(attachment) = payload.attachment.as_ref() {
            self.transport
                .send_with_attachment(&payload, attachment)
                .await
                .map_err(DeliveryError::Transport)?;
            return Ok(Delivery::Attachment);
        }

        let limit = self.transport.inline_limit();
        let len = payload.inline_len();
        if len > limit {
            debug!(len, limit, "payload exceeds inline limit, expecting rejection");
        }

        match self.transport.send_inline(&payload).await {
            Ok(()) => Ok(Delivery::Inline),
            Err(err) if err.is_oversized() => {
                debug!(error = %err, "inline message rejected as oversized, resending as file");
                let fallback = payload.into_fallback_attachment();
                if let Some(attachment) = fallback.attachment.as_ref() {
                    self.transport
                        .send_with_attachment(&fallback, attachment)
                        .await
                        .map_err(DeliveryError::FallbackFailed)?;
                }
                Ok(Delivery::FallbackAttachment)
            }
            Err(err) => Err(DeliveryError::Transport(err)),
        }
    }
}
