//! A recording transport for exercising the sink without a network.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_discord_sink::{Attachment, NotificationPayload, TransportError, WebhookTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Inline(NotificationPayload),
    File(NotificationPayload, Attachment),
}

impl Sent {
    pub fn payload(&self) -> &NotificationPayload {
        match self {
            Sent::Inline(p) | Sent::File(p, _) => p,
        }
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        match self {
            Sent::Inline(_) => None,
            Sent::File(_, a) => Some(a),
        }
    }
}

/// Records every call and rejects inline messages longer than
/// `inline_limit`, the way the Discord client does.
#[derive(Clone)]
pub struct MockTransport {
    pub sent: Arc<Mutex<Vec<Sent>>>,
    pub inline_limit: usize,
    pub fail_files: bool,
    /// Time every call takes before it is recorded.
    pub delay: Option<Duration>,
    notify: Option<mpsc::UnboundedSender<Sent>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            inline_limit: 2000,
            fail_files: false,
            delay: None,
            notify: None,
        }
    }

    /// Also forward every call to a channel, for tests that wait on
    /// deliveries running in background tasks.
    pub fn with_channel() -> (Self, mpsc::UnboundedReceiver<Sent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut transport = Self::new();
        transport.notify = Some(tx);
        (transport, rx)
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn push(&self, sent: Sent) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(tx) = &self.notify {
            let _ = tx.send(sent.clone());
        }
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait]
impl WebhookTransport for MockTransport {
    async fn send_inline(&self, message: &NotificationPayload) -> Result<(), TransportError> {
        self.push(Sent::Inline(message.clone())).await;
        let len = message.inline_len();
        if len > self.inline_limit {
            return Err(TransportError::Oversized {
                len,
                limit: self.inline_limit,
            });
        }
        Ok(())
    }

    async fn send_with_attachment(
        &self,
        message: &NotificationPayload,
        attachment: &Attachment,
    ) -> Result<(), TransportError> {
        self.push(Sent::File(message.clone(), attachment.clone())).await;
        if self.fail_files {
            return Err(TransportError::Oversized {
                len: attachment.bytes.len(),
                limit: self.inline_limit,
            });
        }
        Ok(())
    }

    fn inline_limit(&self) -> usize {
        self.inline_limit
    }
}
