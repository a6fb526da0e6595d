use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

/// A webhook endpoint that has already been validated.
///
/// Construction is the only place a bad URL is rejected, so a sink holding a
/// `WebhookUrl` can never fail on its first send because of a malformed
/// endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookUrl(Url);

impl WebhookUrl {
    /// Parse and validate an absolute `http`/`https` URL with a host.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingWebhookUrl);
        }

        let invalid = |reason: String| ConfigError::InvalidWebhookUrl {
            url: redact(trimmed),
            reason,
        };

        let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self(url))
    }

    /// Whether this looks like a Discord-hosted webhook
    /// (`https://discord.com/api/webhooks/...`).
    pub fn is_discord(&self) -> bool {
        self.0.scheme() == "https"
            && matches!(self.0.host_str(), Some("discord.com") | Some("discordapp.com"))
            && self.0.path().to_ascii_lowercase().starts_with("/api/webhooks")
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

// The webhook token is a credential; keep it out of Debug output and errors.
impl fmt::Debug for WebhookUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WebhookUrl").field(&redact(self.0.as_str())).finish()
    }
}

fn redact(raw: &str) -> String {
    match raw.rfind('/') {
        Some(idx) if idx + 1 < raw.len() && raw[..idx].contains("://") => {
            format!("{}/***", &raw[..idx])
        }
        _ => raw.to_string(),
    }
}

/// Maps a claim of the current principal onto a message field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimFieldMapping {
    pub claim_key: String,
    pub display_name: String,
}

impl ClaimFieldMapping {
    pub fn new(claim_key: impl AsRef<str>, display_name: impl AsRef<str>) -> Self {
        Self {
            claim_key: claim_key.as_ref().trim().to_string(),
            display_name: display_name.as_ref().trim().to_string(),
        }
    }
}

/// Process-wide formatting and delivery settings.
///
/// Built once at registration and shared read-only between log calls.
#[derive(Debug, Clone, Default)]
pub struct SinkConfig {
    pub application_name: String,
    pub environment_name: String,
    /// Author name shown on every message.
    pub user_name: String,
    pub claim_fields: Vec<ClaimFieldMapping>,
    /// Upper bound for one delivery attempt, fallback included.
    pub delivery_timeout: Option<Duration>,
}

impl SinkConfig {
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    pub fn environment_name(mut self, name: impl Into<String>) -> Self {
        self.environment_name = name.into();
        self
    }

    pub fn user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = name.into();
        self
    }

    pub fn claim_field(mut self, claim_key: impl AsRef<str>, display_name: impl AsRef<str>) -> Self {
        self.claim_fields.push(ClaimFieldMapping::new(claim_key, display_name));
        self
    }

    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = Some(timeout);
        self
    }
}
