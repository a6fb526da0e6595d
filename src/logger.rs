use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::config::{SinkConfig, WebhookUrl};
use crate::context::ContextProvider;
use crate::dispatcher::{Delivery, Dispatcher};
use crate::error::{DeliveryError, SinkError};
use crate::formatter::Formatter;
use crate::payload::NotificationPayload;
use crate::record::{ExceptionInfo, LogEvent, Severity};
use crate::transport::WebhookTransport;
use crate::webhook::DiscordWebhookClient;

/// Delivery counters, shared between a logger and its clones.
#[derive(Debug, Default)]
pub struct SinkStats {
    /// Log calls that produced a payload.
    pub events: AtomicU64,
    pub delivered: AtomicU64,
    /// Deliveries that needed the file fallback.
    pub fallbacks: AtomicU64,
    pub failed: AtomicU64,
    /// Events whose delivery never finished: no runtime was available, or
    /// the runtime shut down while the delivery task was pending.
    pub dropped: AtomicU64,
}

impl SinkStats {
    fn record(&self, result: &Result<Delivery, DeliveryError>) {
        match result {
            Ok(Delivery::Skipped) => {}
            Ok(Delivery::FallbackAttachment) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Deliveries running as background tasks.
#[derive(Debug, Default)]
struct InFlight {
    pending: AtomicU64,
    idle: Notify,
}

/// Held by a background delivery. Dropping it before [`finish`](Self::finish)
/// means the task was cancelled, which is counted as a dropped event.
struct InFlightGuard {
    tasks: Arc<InFlight>,
    stats: Arc<SinkStats>,
    finished: bool,
}

impl InFlightGuard {
    fn new(tasks: Arc<InFlight>, stats: Arc<SinkStats>) -> Self {
        tasks.pending.fetch_add(1, Ordering::AcqRel);
        Self {
            tasks,
            stats,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            eprintln!("webhook log delivery cancelled before it finished");
        }
        if self.tasks.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tasks.idle.notify_waiters();
        }
    }
}

/// Sink boundary: formats log calls and delivers them, keeping delivery
/// failures away from the calling application.
#[derive(Clone)]
pub struct DiscordLogger {
    formatter: Formatter,
    dispatcher: Dispatcher,
    context: Arc<dyn ContextProvider>,
    stats: Arc<SinkStats>,
    tasks: Arc<InFlight>,
}

impl DiscordLogger {
    /// Build a logger over any transport.
    pub fn new(config: SinkConfig, transport: Arc<dyn WebhookTransport>, context: Arc<dyn ContextProvider>) -> Self {
        let dispatcher = Dispatcher::new(transport).with_timeout(config.delivery_timeout);
        Self {
            formatter: Formatter::new(Arc::new(config)),
            dispatcher,
            context,
            stats: Arc::new(SinkStats::default()),
            tasks: Arc::new(InFlight::default()),
        }
    }

    /// Build a logger posting to a Discord webhook.
    pub fn discord(url: WebhookUrl, config: SinkConfig, context: Arc<dyn ContextProvider>) -> Self {
        if !url.is_discord() {
            warn!(url = ?url, "webhook URL is not a discord.com webhook; posting anyway");
        }
        Self::new(config, Arc::new(DiscordWebhookClient::new(url)), context)
    }

    pub fn stats(&self) -> &Arc<SinkStats> {
        &self.stats
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    /// Number of background deliveries that have not finished yet.
    pub fn in_flight(&self) -> u64 {
        self.tasks.pending.load(Ordering::Acquire)
    }

    /// Wait until every background delivery started by
    /// [`spawn_send`](Self::spawn_send) has finished.
    ///
    /// Call this before shutting the runtime down; deliveries still pending
    /// when the runtime stops are cancelled and counted as dropped.
    pub async fn flush(&self) {
        loop {
            let idle = self.tasks.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Log entry point for host integrations.
    ///
    /// `render` produces the message text and is invoked exactly once. A
    /// missing renderer is a caller bug and is the only error returned;
    /// delivery failures are logged and counted, never returned.
    pub async fn log<F>(
        &self,
        severity: Severity,
        exception: Option<ExceptionInfo>,
        render: Option<F>,
    ) -> Result<(), SinkError>
    where
        F: FnOnce(Option<&ExceptionInfo>) -> String,
    {
        let render = render.ok_or(SinkError::MissingRenderer)?;
        let message = render(exception.as_ref());

        let mut event = LogEvent::new(severity, message);
        event.exception = exception;

        // Outcome is already counted and logged.
        let _ = self.deliver(&event).await;
        Ok(())
    }

    /// Format and deliver `event`, reporting the outcome to the caller.
    ///
    /// Returns `Ok(Delivery::Skipped)` when the event renders to nothing.
    pub async fn deliver(&self, event: &LogEvent) -> Result<Delivery, DeliveryError> {
        match self.prepare(event) {
            Some(payload) => self.send(event.severity, payload).await,
            None => Ok(Delivery::Skipped),
        }
    }

    /// Formatting half of [`deliver`](Self::deliver). Runs on the calling
    /// thread so the context provider sees the caller's ambient state.
    pub fn prepare(&self, event: &LogEvent) -> Option<NotificationPayload> {
        let payload = self.formatter.format(event, self.context.as_ref())?;
        self.stats.events.fetch_add(1, Ordering::Relaxed);
        Some(payload)
    }

    /// Delivery half of [`deliver`](Self::deliver).
    pub async fn send(&self, severity: Severity, payload: NotificationPayload) -> Result<Delivery, DeliveryError> {
        let result = self.dispatcher.dispatch(payload).await;
        self.stats.record(&result);
        match &result {
            Ok(delivery) => debug!(%severity, ?delivery, "log event delivered"),
            Err(err) => warn!(%severity, error = %err, "failed to deliver log event"),
        }
        result
    }

    /// Run [`send`](Self::send) as a task on `handle`, tracked by
    /// [`flush`](Self::flush).
    pub fn spawn_send(&self, handle: &Handle, severity: Severity, payload: NotificationPayload) {
        let guard = InFlightGuard::new(self.tasks.clone(), self.stats.clone());
        let logger = self.clone();
        handle.spawn(async move {
            // Outcome is counted and logged by `send`.
            let _ = logger.send(severity, payload).await;
            guard.finish();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoContext;
    use crate::noop_sink::NoopTransport;
    use std::cell::Cell;

    fn logger() -> DiscordLogger {
        DiscordLogger::new(
            SinkConfig::default().application_name("billing-api"),
            Arc::new(NoopTransport),
            Arc::new(NoContext),
        )
    }

    #[tokio::test]
    async fn missing_renderer_is_rejected_before_delivery() {
        let logger = logger();
        let result = logger
            .log(Severity::Error, None, None::<fn(Option<&ExceptionInfo>) -> String>)
            .await;

        assert_eq!(result, Err(SinkError::MissingRenderer));
        assert_eq!(logger.stats().events.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn renderer_runs_once_and_sees_the_exception() {
        let logger = logger();
        let calls = Cell::new(0);
        let exception = ExceptionInfo::new("E", "boom");

        logger
            .log(
                Severity::Error,
                Some(exception),
                Some(|e: Option<&ExceptionInfo>| {
                    calls.set(calls.get() + 1);
                    format!("failed: {}", e.map(|e| e.message.as_str()).unwrap_or_default())
                }),
            )
            .await
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(logger.stats().delivered.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn flush_waits_for_spawned_deliveries() {
        let logger = logger();
        let event = LogEvent::new(Severity::Warning, "disk at 91%");
        let handle = Handle::current();

        for _ in 0..3 {
            let payload = logger.prepare(&event).unwrap();
            logger.spawn_send(&handle, Severity::Warning, payload);
        }
        logger.flush().await;

        assert_eq!(logger.in_flight(), 0);
        assert_eq!(logger.stats().delivered.load(Ordering::Relaxed), 3);
        assert_eq!(logger.stats().dropped.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn flush_without_deliveries_returns_immediately() {
        logger().flush().await;
    }

    #[tokio::test]
    async fn empty_render_skips_delivery() {
        let logger = logger();
        logger
            .log(Severity::Info, None, Some(|_: Option<&ExceptionInfo>| String::new()))
            .await
            .unwrap();

        assert_eq!(logger.stats().events.load(Ordering::Relaxed), 0);
        assert_eq!(logger.stats().delivered.load(Ordering::Relaxed), 0);
    }
}
