use crate::error::TransportError;
use crate::payload::{Attachment, NotificationPayload};
use crate::transport::WebhookTransport;
use async_trait::async_trait;

/// A transport that accepts every message and sends nothing.
///
/// Useful for measuring the overhead of formatting and dispatch without any
/// network I/O, and for tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopTransport;

#[async_trait]
impl WebhookTransport for NoopTransport {
    async fn send_inline(&self, _message: &NotificationPayload) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send_with_attachment(
        &self,
        _message: &NotificationPayload,
        _attachment: &Attachment,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}
