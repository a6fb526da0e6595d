use chrono::{DateTime, Utc};

/// File name used for exception detail uploads.
pub const EXCEPTION_DETAILS_FILENAME: &str = "exception-details.txt";

/// File name used when an inline message is re-sent as a file.
pub const FALLBACK_FILENAME: &str = "message.txt";

/// Name/value pair appended to every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextField {
    pub name: String,
    pub value: String,
}

impl ContextField {
    /// Returns `None` when either side is blank, so empty fields never reach
    /// a payload.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let value = value.into();
        if name.trim().is_empty() || value.trim().is_empty() {
            return None;
        }
        Some(Self { name, value })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn text(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            bytes: text.into().into_bytes(),
        }
    }

    /// Lossy view of the file content, for logging and assertions.
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Wire-ready notification content, built fresh for every log call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub headline: String,
    pub author_name: String,
    /// RGB accent color.
    pub color: Option<u32>,
    pub body_text: Option<String>,
    pub fields: Vec<ContextField>,
    pub attachment: Option<Attachment>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl NotificationPayload {
    /// A payload is only worth sending if it carries a body, a file or at
    /// least one field.
    pub fn has_content(&self) -> bool {
        self.body_text.as_deref().is_some_and(|b| !b.is_empty())
            || self.attachment.is_some()
            || !self.fields.is_empty()
    }

    /// Character count of everything that would be sent as inline text.
    pub fn inline_len(&self) -> usize {
        let fields: usize = self
            .fields
            .iter()
            .map(|f| f.name.chars().count() + f.value.chars().count())
            .sum();
        self.headline.chars().count()
            + self.body_text.as_deref().map_or(0, |b| b.chars().count())
            + fields
    }

    /// Move the body text into a generically named file attachment.
    pub(crate) fn into_fallback_attachment(mut self) -> Self {
        let text = self.body_text.take().unwrap_or_default();
        self.attachment = Some(Attachment::text(FALLBACK_FILENAME, text));
        self
    }
}
