use crate::logger::DiscordLogger;
use crate::record::{base_message, ExceptionInfo, LogEvent, Severity};
use std::error::Error;
use std::fmt::Write as _;
use std::sync::atomic::Ordering;
use tracing::field::{Field, Visit};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets of the HTTP stack used by the transport. Their events below
/// `WARN` are ignored so that posting a message never triggers another one.
const HTTP_TARGETS: &[&str] = &["reqwest", "hyper", "hyper_util", "h2", "rustls"];

/// `tracing_subscriber` layer that turns events into webhook messages.
///
/// Formatting runs on the thread that emitted the event, so a
/// [`ContextProvider`](crate::context::ContextProvider) can read
/// thread- or task-local request state. Delivery of each event runs as
/// its own Tokio task; there is no queue and no batching. Await
/// [`DiscordLogger::flush`] before shutdown to let pending deliveries finish.
pub struct DiscordLayer {
    logger: DiscordLogger,
    min_severity: Severity,
}

impl DiscordLayer {
    pub fn new(logger: DiscordLogger, min_severity: Severity) -> Self {
        Self { logger, min_severity }
    }

    pub fn logger(&self) -> &DiscordLogger {
        &self.logger
    }

    fn accepts_target(meta: &Metadata<'_>) -> bool {
        let target = meta.target();
        let crate_name = env!("CARGO_CRATE_NAME");
        if target == crate_name || target.starts_with(&format!("{}::", crate_name)) {
            return false;
        }

        let from_http_stack = HTTP_TARGETS
            .iter()
            .any(|t| target == *t || target.starts_with(&format!("{}::", t)));
        !(from_http_stack && *meta.level() > tracing::Level::WARN)
    }
}

impl<S> Layer<S> for DiscordLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if !Self::accepts_target(meta) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let severity = Severity::from_level(meta.level(), visitor.critical);
        if severity < self.min_severity {
            return;
        }

        let log_event = visitor.into_event(severity);
        let Some(payload) = self.logger.prepare(&log_event) else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => self.logger.spawn_send(&handle, severity, payload),
            Err(_) => {
                self.logger.stats().dropped.fetch_add(1, Ordering::Relaxed);
                eprintln!("no tokio runtime available, dropping webhook log message");
            }
        }
    }
}

/// Collects the message, exception and extra fields of one event.
#[derive(Default)]
pub struct EventVisitor {
    message: String,
    extra: Vec<(String, String)>,
    critical: bool,
    exception: Option<ExceptionInfo>,
    error_type_hint: Option<String>,
}

impl EventVisitor {
    fn exception(&mut self) -> &mut ExceptionInfo {
        self.exception.get_or_insert_with(ExceptionInfo::default)
    }

    fn record_value(&mut self, field: &Field, value: String) {
        let name = field.name();
        match name {
            "message" => self.message = value,
            "exception.type" | "exception.kind" => self.exception().type_name = value,
            "exception.message" => self.exception().message = value,
            "exception.source" => self.exception().source = Some(value),
            "exception.stacktrace" => self.exception().stack_trace = Some(value),
            "exception.base_message" => self.exception().base_message = Some(value),
            _ => match name.strip_prefix("exception.data.") {
                Some(key) => self.exception().data.push((key.to_string(), value)),
                None => self.extra.push((name.to_string(), value)),
            },
        }
    }

    /// Render the message the way `fmt` does: text followed by `key=value`
    /// pairs in the order they were recorded.
    pub fn into_event(self, severity: Severity) -> LogEvent {
        let mut message = self.message;
        for (key, value) in &self.extra {
            if !message.is_empty() {
                message.push(' ');
            }
            let _ = write!(message, "{}={}", key, value);
        }

        let mut event = LogEvent::new(severity, message);
        event.exception = self.exception.map(|mut exception| {
            if exception.type_name.is_empty() {
                exception.type_name = self.error_type_hint.unwrap_or_else(|| "Error".to_string());
            }
            exception
        });
        event
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "critical" {
            self.critical = value;
        } else {
            self.record_value(field, value.to_string());
        }
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn Error + 'static)) {
        let type_hint = debug_type_name(value);
        let exception = self.exception();
        if exception.message.is_empty() {
            exception.message = value.to_string();
        }
        if exception.base_message.is_none() {
            exception.base_message = base_message(value);
        }
        self.error_type_hint = type_hint;
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_value(field, format!("{:?}", value));
    }
}

/// Type name of a type-erased error, when it can be told reliably.
///
/// `std::io::Error` is recognised by downcasting. Otherwise the leading
/// identifier of the `Debug` output is used only when it names an error
/// type (`ParseIntError { kind: .. }` -> `ParseIntError`); enum variants
/// such as `Os { .. }` or a bare `Error(..)` yield `None`.
fn debug_type_name(err: &(dyn Error + 'static)) -> Option<String> {
    if err.is::<std::io::Error>() {
        return Some("std::io::Error".to_string());
    }

    let debug = format!("{:?}", err);
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    let last = name.rsplit("::").next().unwrap_or_default();
    let names_error_type = last.len() > "Error".len()
        && last.ends_with("Error")
        && last.chars().next().is_some_and(char::is_uppercase);
    names_error_type.then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_type_name_of_struct_error() {
        let err = "x".parse::<i32>().unwrap_err();
        assert_eq!(debug_type_name(&err).as_deref(), Some("ParseIntError"));
    }

    #[test]
    fn io_errors_are_named_by_type_not_variant() {
        let os = std::fs::File::open("/definitely/not/here").unwrap_err();
        assert_eq!(debug_type_name(&os).as_deref(), Some("std::io::Error"));

        let custom = std::io::Error::new(std::io::ErrorKind::Other, "pool exhausted");
        assert_eq!(debug_type_name(&custom).as_deref(), Some("std::io::Error"));
    }

    #[test]
    fn enum_variant_debug_output_is_not_a_type_name() {
        #[derive(Debug)]
        enum StoreFailure {
            Timeout { after_ms: u64 },
        }
        impl std::fmt::Display for StoreFailure {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "store failure")
            }
        }
        impl Error for StoreFailure {}

        let err = StoreFailure::Timeout { after_ms: 30 };
        assert_eq!(debug_type_name(&err), None);
    }

    #[test]
    fn debug_type_name_rejects_plain_strings() {
        let err: Box<dyn Error + Send + Sync> = "plain".into();
        assert_eq!(debug_type_name(err.as_ref()), None);
    }

    #[test]
    fn extra_fields_follow_message() {
        let visitor = EventVisitor {
            message: "disk at 91%".to_string(),
            extra: vec![("mount".to_string(), "/var".to_string())],
            ..Default::default()
        };
        let event = visitor.into_event(Severity::Warning);
        assert_eq!(event.message, "disk at 91% mount=/var");
        assert!(event.exception.is_none());
    }
}
