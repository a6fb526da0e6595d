use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt;
use tracing::Level;

/// Closed set of severities understood by the sink.
///
/// Host frameworks map their own levels onto this enum; the formatter never
/// sees a host type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Trace => "Trace",
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Critical => "Critical",
        }
    }

    /// Map a `tracing` level. `critical` promotes an `ERROR` event to
    /// [`Severity::Critical`]; it is ignored for every other level.
    pub fn from_level(level: &Level, critical: bool) -> Self {
        match *level {
            Level::TRACE => Severity::Trace,
            Level::DEBUG => Severity::Debug,
            Level::INFO => Severity::Info,
            Level::WARN => Severity::Warning,
            _ if critical => Severity::Critical,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Read-only description of an error attached to a log call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionInfo {
    /// Fully qualified type name, e.g. `std::num::ParseIntError`.
    pub type_name: String,
    pub message: String,
    pub source: Option<String>,
    pub stack_trace: Option<String>,
    /// Message of the innermost error in the `source()` chain.
    pub base_message: Option<String>,
    /// Extra key/value pairs, kept in insertion order.
    pub data: Vec<(String, String)>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Build a view over an error value. The base message is taken from the
    /// last error in the `source()` chain, if the chain is non-empty.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: Error + 'static,
    {
        let mut info = Self::new(std::any::type_name::<E>(), err.to_string());
        info.base_message = base_message(err);
        info
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn with_base_message(mut self, base_message: impl Into<String>) -> Self {
        self.base_message = Some(base_message.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.push((key.into(), value.into()));
        self
    }

    /// Base message only when it says something the top message does not.
    pub fn distinct_base_message(&self) -> Option<&str> {
        self.base_message
            .as_deref()
            .filter(|base| !base.is_empty() && *base != self.message)
    }
}

pub(crate) fn base_message(err: &(dyn Error + 'static)) -> Option<String> {
    let mut current = err.source()?;
    while let Some(next) = current.source() {
        current = next;
    }
    Some(current.to_string())
}

/// A single normalized log call.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub severity: Severity,
    /// Rendered message text.
    pub message: String,
    pub exception: Option<ExceptionInfo>,
    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            exception: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }
}
