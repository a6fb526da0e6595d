use std::fmt::Write as _;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::config::SinkConfig;
use crate::context::{ContextProvider, RequestContext};
use crate::payload::{Attachment, ContextField, NotificationPayload, EXCEPTION_DETAILS_FILENAME};
use crate::record::{ExceptionInfo, LogEvent, Severity};

pub const APPLICATION_NAME_FIELD: &str = "Application name";
pub const ENVIRONMENT_NAME_FIELD: &str = "Environment name";
pub const EXCEPTION_TYPE_FIELD: &str = "Exception type";
pub const SOURCE_FIELD: &str = "Source";

/// Accent colors, as RGB integers.
pub const INFO_COLOR: u32 = 31743;
pub const WARNING_COLOR: u32 = 16761095;
pub const ERROR_COLOR: u32 = 14431557;
pub const CRITICAL_COLOR: u32 = 16711680;

/// Glyph and accent color for each severity.
pub fn presentation(severity: Severity) -> (Option<&'static str>, Option<u32>) {
    match severity {
        Severity::Trace => (None, None),
        Severity::Debug => (Some("\u{1F578}\u{FE0F}"), None),
        Severity::Info => (Some("\u{2139}\u{FE0F}"), Some(INFO_COLOR)),
        Severity::Warning => (Some("\u{26A0}\u{FE0F}"), Some(WARNING_COLOR)),
        Severity::Error => (Some("\u{1F480}"), Some(ERROR_COLOR)),
        Severity::Critical => (Some("\u{2622}\u{FE0F}"), Some(CRITICAL_COLOR)),
    }
}

pub fn headline(severity: Severity) -> String {
    match presentation(severity).0 {
        Some(glyph) => format!("{} {}", glyph, severity.label()),
        None => severity.label().to_string(),
    }
}

/// Turns [`LogEvent`]s into [`NotificationPayload`]s.
///
/// Pure and reentrant: the only inputs are the shared config, the event and
/// whatever the context provider answers. Nothing here touches the network.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: Arc<SinkConfig>,
}

impl Formatter {
    pub fn new(config: Arc<SinkConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Build the payload for `event`, or `None` when the rendered message is
    /// empty and there is nothing to send.
    pub fn format(&self, event: &LogEvent, context: &dyn ContextProvider) -> Option<NotificationPayload> {
        if event.message.is_empty() {
            return None;
        }

        let (_, color) = presentation(event.severity);
        let mut fields = self.context_fields(context);

        let (body_text, attachment) = match &event.exception {
            Some(exception) => {
                fields.extend(ContextField::new(EXCEPTION_TYPE_FIELD, exception.type_name.as_str()));
                if let Some(source) = exception.source.as_deref() {
                    fields.extend(ContextField::new(SOURCE_FIELD, source));
                }

                let summary = if exception.message.is_empty() {
                    &event.message
                } else {
                    &exception.message
                };
                let details = exception_details(&event.message, exception, context.current_request().as_ref());

                (
                    Some(format!("**{}**", summary)),
                    Some(Attachment::text(EXCEPTION_DETAILS_FILENAME, details)),
                )
            }
            None => (Some(event.message.clone()), None),
        };

        Some(NotificationPayload {
            headline: headline(event.severity),
            author_name: self.config.user_name.clone(),
            color,
            body_text,
            fields,
            attachment,
            timestamp: Some(event.timestamp),
        })
    }

    fn context_fields(&self, context: &dyn ContextProvider) -> Vec<ContextField> {
        let mut fields = Vec::new();
        fields.extend(ContextField::new(APPLICATION_NAME_FIELD, self.config.application_name.as_str()));
        fields.extend(ContextField::new(ENVIRONMENT_NAME_FIELD, self.config.environment_name.as_str()));

        for mapping in &self.config.claim_fields {
            if mapping.display_name.is_empty() {
                continue;
            }
            if let Some(value) = context.principal_claim(&mapping.claim_key) {
                fields.extend(ContextField::new(mapping.display_name.as_str(), value));
            }
        }

        fields
    }
}

/// Full text of the `exception-details.txt` attachment.
fn exception_details(message: &str, exception: &ExceptionInfo, request: Option<&RequestContext>) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "Message: {}", message);
    let _ = writeln!(out, "Exception type: {}", exception.type_name);
    if !exception.message.is_empty() && exception.message != message {
        let _ = writeln!(out, "Exception message: {}", exception.message);
    }
    if let Some(source) = exception.source.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "Source: {}", source);
    }
    if let Some(base) = exception.distinct_base_message() {
        let _ = writeln!(out, "Base exception: {}", base);
    }

    if !exception.data.is_empty() {
        out.push('\n');
        for (key, value) in &exception.data {
            let _ = writeln!(out, "{}: {}", key, value);
        }
    }

    if let Some(stack_trace) = exception.stack_trace.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(out, "\nStack trace:\n{}\n", stack_trace.trim_end());
    }

    if let Some(request) = request {
        let _ = write!(out, "\nURL: {}\n", request.url());

        let headers = HeaderDump::new(request);
        if !headers.is_empty() {
            if let Ok(json) = serde_json::to_string_pretty(&headers) {
                let _ = write!(out, "\nRequest headers:\n{}\n", json);
            }
        }
    }

    out
}

/// Request headers as an ordered JSON object, without `Cookie` and without
/// headers that carry no value.
struct HeaderDump<'a> {
    entries: Vec<(&'a str, String)>,
}

impl<'a> HeaderDump<'a> {
    fn new(request: &'a RequestContext) -> Self {
        let entries = request
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("cookie"))
            .filter_map(|(name, values)| {
                let values: Vec<&str> = values.iter().map(String::as_str).filter(|v| !v.is_empty()).collect();
                if values.is_empty() {
                    None
                } else {
                    Some((name.as_str(), values.join(",")))
                }
            })
            .collect();
        Self { entries }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for HeaderDump<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
