use crate::config::WebhookUrl;
use crate::error::TransportError;
use crate::payload::{Attachment, NotificationPayload};
use crate::transport::{WebhookTransport, DEFAULT_INLINE_LIMIT};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Platform limits on embed content, in characters.
const MAX_DESCRIPTION_LEN: usize = 4096;
const MAX_FIELD_NAME_LEN: usize = 256;
const MAX_FIELD_VALUE_LEN: usize = 1024;
const MAX_FIELDS: usize = 25;
/// Combined length of every text in one embed.
const MAX_EMBED_TOTAL_LEN: usize = 6000;

/// Discord webhook implementation of [`WebhookTransport`].
///
/// The underlying [`reqwest::Client`] is reference counted, so cloning the
/// transport shares one connection pool between all clones.
#[derive(Clone)]
pub struct DiscordWebhookClient {
    client: Client,
    url: WebhookUrl,
    inline_limit: usize,
}

impl DiscordWebhookClient {
    /// Construct a client for an already validated endpoint.
    pub fn new(url: WebhookUrl) -> Self {
        Self::with_client(url, Client::new())
    }

    /// Reuse an existing HTTP client (and its pool and proxy settings).
    pub fn with_client(url: WebhookUrl, client: Client) -> Self {
        Self {
            client,
            url,
            inline_limit: DEFAULT_INLINE_LIMIT,
        }
    }

    pub fn with_inline_limit(mut self, inline_limit: usize) -> Self {
        self.inline_limit = inline_limit;
        self
    }

    fn endpoint(&self) -> Url {
        let mut url = self.url.as_url().clone();
        url.query_pairs_mut().append_pair("wait", "true");
        url
    }

    async fn check_response(&self, resp: Response, len: usize) -> Result<(), TransportError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let retry_after_header = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok());
        let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
        debug!(status = %status, body = %body, "webhook endpoint rejected message");

        let err = match status {
            StatusCode::PAYLOAD_TOO_LARGE => TransportError::Oversized {
                len,
                limit: self.inline_limit,
            },
            StatusCode::BAD_REQUEST if is_length_violation(&body) => TransportError::Oversized {
                len,
                limit: self.inline_limit,
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                TransportError::Unauthorized(status)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = retry_after_header
                    .or_else(|| {
                        serde_json::from_str::<RateLimitBody>(&body)
                            .ok()
                            .map(|b| b.retry_after)
                    })
                    .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
                TransportError::RateLimited { retry_after }
            }
            _ => TransportError::Status { status, body },
        };
        Err(err)
    }
}

#[async_trait]
impl WebhookTransport for DiscordWebhookClient {
    async fn send_inline(&self, message: &NotificationPayload) -> Result<(), TransportError> {
        let len = message.inline_len();
        if len > self.inline_limit {
            return Err(TransportError::Oversized {
                len,
                limit: self.inline_limit,
            });
        }

        let body = WebhookMessage::new(message, None);
        let resp = self.client.post(self.endpoint()).json(&body).send().await?;
        self.check_response(resp, len).await
    }

    async fn send_with_attachment(
        &self,
        message: &NotificationPayload,
        attachment: &Attachment,
    ) -> Result<(), TransportError> {
        let payload_json = serde_json::to_string(&WebhookMessage::new(message, Some(attachment)))
            .map_err(|e| TransportError::Network(Box::new(e)))?;

        let file = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.filename.clone())
            .mime_str("text/plain; charset=utf-8")?;
        let form = Form::new().text("payload_json", payload_json).part("files[0]", file);

        let resp = self.client.post(self.endpoint()).multipart(form).send().await?;
        self.check_response(resp, message.inline_len()).await
    }

    fn inline_limit(&self) -> usize {
        self.inline_limit
    }
}

fn is_length_violation(body: &str) -> bool {
    body.contains("BASE_TYPE_MAX_LENGTH")
        || (body.contains("50035") && body.to_ascii_lowercase().contains("length"))
}

#[derive(Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// JSON body of a webhook execution.
#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct WebhookMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<Embed<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentRef<'a>>,
}

#[derive(Debug, Serialize, PartialEq)]
struct Embed<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
struct EmbedField<'a> {
    name: &'a str,
    value: &'a str,
    inline: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct AttachmentRef<'a> {
    id: u32,
    filename: &'a str,
}

impl<'a> WebhookMessage<'a> {
    pub(crate) fn new(message: &'a NotificationPayload, attachment: Option<&'a Attachment>) -> Self {
        let mut budget = MAX_EMBED_TOTAL_LEN;
        let description = message
            .body_text
            .as_deref()
            .filter(|b| !b.is_empty())
            .map(|b| {
                let description = truncate(b, MAX_DESCRIPTION_LEN.min(budget));
                budget -= description.chars().count();
                description.to_string()
            });

        let mut fields: Vec<EmbedField<'a>> = Vec::new();
        for field in message.fields.iter().take(MAX_FIELDS) {
            let name = truncate(&field.name, MAX_FIELD_NAME_LEN);
            let name_len = name.chars().count();
            // A field needs at least one character of value.
            if name_len >= budget {
                break;
            }
            let value = truncate(&field.value, MAX_FIELD_VALUE_LEN.min(budget - name_len));
            budget -= name_len + value.chars().count();
            fields.push(EmbedField {
                name,
                value,
                inline: false,
            });
        }

        let embeds = if description.is_none() && fields.is_empty() {
            Vec::new()
        } else {
            vec![Embed {
                description,
                color: message.color,
                fields,
                timestamp: message.timestamp.map(|t| t.to_rfc3339()),
            }]
        };

        Self {
            username: Some(message.author_name.as_str()).filter(|u| !u.is_empty()),
            content: &message.headline,
            embeds,
            attachments: attachment
                .map(|a| AttachmentRef {
                    id: 0,
                    filename: &a.filename,
                })
                .into_iter()
                .collect(),
        }
    }
}

/// Cut `text` to at most `max` characters on a char boundary.
fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
