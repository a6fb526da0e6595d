use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info, warn};

use tracing_discord_sink::env::{env_or, DISCORD_SINK_WEBHOOK_URL_ENV};
use tracing_discord_sink::init::{init_tracing_with_config, LayerConfig};
use tracing_discord_sink::{ContextProvider, RequestContext, Severity, SinkConfig};

/// Pretends every event happens while serving one request for one user.
struct DemoRequest;

impl ContextProvider for DemoRequest {
    fn principal_claim(&self, claim_key: &str) -> Option<String> {
        match claim_key {
            "sub" => Some("user-42".to_string()),
            "email" => Some("gunnar@somecompany.com".to_string()),
            _ => None,
        }
    }

    fn current_request(&self) -> Option<RequestContext> {
        Some(RequestContext {
            scheme: "https".to_string(),
            host: "billing.example.com".to_string(),
            port: None,
            path: "/api/invoices/42".to_string(),
            query: Some("expand=lines".to_string()),
            headers: vec![
                ("Accept".to_string(), vec!["application/json".to_string()]),
                ("Cookie".to_string(), vec!["session=never-sent".to_string()]),
            ],
        })
    }
}

#[tokio::main]
async fn main() {
    let webhook_url = env_or(DISCORD_SINK_WEBHOOK_URL_ENV, "");
    let config = SinkConfig::default()
        .application_name("billing-api")
        .environment_name("staging")
        .user_name("billing-bot")
        .claim_field("sub", "User id")
        .claim_field("email", "E-mail")
        .delivery_timeout(Duration::from_secs(10));
    let layer_config = LayerConfig {
        min_severity: Severity::Info,
        enable_stdout: true,
    };

    let logger = match init_tracing_with_config(&webhook_url, config, layer_config, Arc::new(DemoRequest)) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("cannot install discord sink: {}", e);
            return;
        }
    };

    info!("billing-api started");
    warn!(usage = "91%", "disk almost full");

    let err = "12a".parse::<u16>().unwrap_err();
    error!(
        error = &err as &(dyn std::error::Error + 'static),
        exception.data.invoice = "42",
        "could not parse invoice port"
    );

    // Above the inline limit: rejected inline, then re-sent as message.txt
    info!("{}", "0".repeat(2300));

    logger.flush().await;
}
