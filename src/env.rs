//! Environment variable names used by this crate for convenient
//! configuration of the sink from services.
//!
//! These are purely helpers; the core types remain decoupled from
//! environment access.

use std::time::Duration;

use crate::config::{ClaimFieldMapping, SinkConfig, WebhookUrl};
use crate::error::ConfigError;

/// Webhook endpoint, e.g. `https://discord.com/api/webhooks/<id>/<token>`.
pub const DISCORD_SINK_WEBHOOK_URL_ENV: &str = "DISCORD_SINK_WEBHOOK_URL";

/// Application name shown as a field on every message.
pub const DISCORD_SINK_APPLICATION_NAME_ENV: &str = "DISCORD_SINK_APPLICATION_NAME";

/// Environment name shown as a field on every message.
pub const DISCORD_SINK_ENVIRONMENT_NAME_ENV: &str = "DISCORD_SINK_ENVIRONMENT_NAME";

/// Author name the webhook posts as.
pub const DISCORD_SINK_USER_NAME_ENV: &str = "DISCORD_SINK_USER_NAME";

/// Delivery deadline in milliseconds.
pub const DISCORD_SINK_TIMEOUT_MS_ENV: &str = "DISCORD_SINK_TIMEOUT_MS";

/// Claim mappings as `claim=Display name` pairs separated by `;`.
pub const DISCORD_SINK_CLAIM_FIELDS_ENV: &str = "DISCORD_SINK_CLAIM_FIELDS";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and validate the webhook endpoint.
pub fn webhook_url_from_env() -> Result<WebhookUrl, ConfigError> {
    WebhookUrl::parse(&env_or(DISCORD_SINK_WEBHOOK_URL_ENV, ""))
}

impl SinkConfig {
    /// Build a config from the `DISCORD_SINK_*` variables. Unset variables
    /// leave the corresponding setting empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let delivery_timeout = match std::env::var(DISCORD_SINK_TIMEOUT_MS_ENV) {
            Ok(raw) => Some(parse_timeout(&raw)?),
            Err(_) => None,
        };

        Ok(SinkConfig {
            application_name: env_or(DISCORD_SINK_APPLICATION_NAME_ENV, ""),
            environment_name: env_or(DISCORD_SINK_ENVIRONMENT_NAME_ENV, ""),
            user_name: env_or(DISCORD_SINK_USER_NAME_ENV, ""),
            claim_fields: parse_claim_fields(&env_or(DISCORD_SINK_CLAIM_FIELDS_ENV, ""))?,
            delivery_timeout,
        })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ConfigError::InvalidEnv {
            key: DISCORD_SINK_TIMEOUT_MS_ENV,
            reason: e.to_string(),
        })
}

pub(crate) fn parse_claim_fields(raw: &str) -> Result<Vec<ClaimFieldMapping>, ConfigError> {
    raw.split(';')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((claim, display)) => Ok(ClaimFieldMapping::new(claim, display)),
            None => Err(ConfigError::InvalidEnv {
                key: DISCORD_SINK_CLAIM_FIELDS_ENV,
                reason: format!("expected claim=Display name, got {:?}", pair.trim()),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_fields_parse_in_order() {
        let fields = parse_claim_fields("sub=User id; email = E-mail ;;").unwrap();
        assert_eq!(
            fields,
            vec![ClaimFieldMapping::new("sub", "User id"), ClaimFieldMapping::new("email", "E-mail")]
        );
    }

    #[test]
    fn claim_field_without_separator_is_rejected() {
        assert!(parse_claim_fields("sub").is_err());
    }

    #[test]
    fn empty_display_name_is_kept_for_the_formatter_to_skip() {
        let fields = parse_claim_fields("sub=").unwrap();
        assert_eq!(fields[0].display_name, "");
    }

    #[test]
    fn timeout_must_be_numeric() {
        assert_eq!(parse_timeout(" 1500 ").unwrap(), Duration::from_millis(1500));
        assert!(parse_timeout("soon").is_err());
    }
}
