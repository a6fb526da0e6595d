use crate::error::TransportError;
use crate::payload::{Attachment, NotificationPayload};
use async_trait::async_trait;

/// Inline text ceiling of Discord webhook messages, in characters.
pub const DEFAULT_INLINE_LIMIT: usize = 2000;

/// Asynchronous client for a webhook-based messaging endpoint.
///
/// Implementations own the HTTP round trip and enforce the platform's
/// payload constraints. A single instance is shared by every log call, so
/// implementations must not keep per-call state.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Post `message` as regular inline content.
    ///
    /// **Returns**
    /// - `Ok(())` if the endpoint accepted the message.
    /// - `Err(TransportError::Oversized { .. })` if the content is above
    ///   [`inline_limit`](Self::inline_limit) or the endpoint rejected it
    ///   for its size. The dispatcher answers this with one retry as a file.
    /// - any other `Err(..)` for network, auth, rate limit or status
    ///   failures. These are never retried.
    async fn send_inline(&self, message: &NotificationPayload) -> Result<(), TransportError>;

    /// Post `message` with `attachment` uploaded as a file. Headline, body
    /// and fields of `message` still travel as message metadata.
    async fn send_with_attachment(
        &self,
        message: &NotificationPayload,
        attachment: &Attachment,
    ) -> Result<(), TransportError>;

    /// Maximum number of characters accepted inline.
    ///
    /// Default implementation returns [`DEFAULT_INLINE_LIMIT`].
    fn inline_limit(&self) -> usize {
        DEFAULT_INLINE_LIMIT
    }
}
