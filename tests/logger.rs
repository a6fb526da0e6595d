mod helpers;

use helpers::mock_transport::{MockTransport, Sent};
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing_discord_sink::{
    ContextField, ContextProvider, Delivery, DeliveryError, DiscordLogger, ExceptionInfo, LogEvent, NoContext,
    RequestContext, Severity, SinkConfig, SinkError,
};

struct RequestScope;

impl ContextProvider for RequestScope {
    fn principal_claim(&self, claim_key: &str) -> Option<String> {
        match claim_key {
            "nameidentifier" => Some("SomeValueHere".to_string()),
            "name" => Some("gunnar@somecompany.com".to_string()),
            _ => None,
        }
    }

    fn current_request(&self) -> Option<RequestContext> {
        Some(RequestContext {
            scheme: "https".to_string(),
            host: "billing.example.com".to_string(),
            port: Some(443),
            path: "/api/invoices".to_string(),
            query: Some("?page=3".to_string()),
            headers: vec![
                ("Accept".to_string(), vec!["application/json".to_string()]),
                ("Cookie".to_string(), vec!["auth=secret-session".to_string()]),
            ],
        })
    }
}

fn logger(transport: &MockTransport, config: SinkConfig, context: Arc<dyn ContextProvider>) -> DiscordLogger {
    DiscordLogger::new(config, Arc::new(transport.clone()), context)
}

#[tokio::test]
async fn warning_is_sent_inline_with_application_field() {
    let transport = MockTransport::new();
    let logger = logger(
        &transport,
        SinkConfig::default().application_name("billing-api"),
        Arc::new(NoContext),
    );

    let delivery = logger
        .deliver(&LogEvent::new(Severity::Warning, "disk at 91%"))
        .await
        .unwrap();

    assert_eq!(delivery, Delivery::Inline);
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let payload = match &sent[0] {
        Sent::Inline(p) => p,
        other => panic!("expected inline message, got {other:?}"),
    };
    assert!(payload.headline.contains("Warning"));
    assert!(payload.headline.contains('\u{26A0}'));
    assert_eq!(payload.color, Some(16761095));
    assert_eq!(payload.fields, vec![ContextField::new("Application name", "billing-api").unwrap()]);
    assert_eq!(payload.body_text.as_deref(), Some("disk at 91%"));
    assert_eq!(payload.attachment, None);
}

#[tokio::test]
async fn exception_is_sent_as_details_file() {
    let transport = MockTransport::new();
    let logger = logger(
        &transport,
        SinkConfig::default()
            .application_name("Application Name Test")
            .environment_name("Name of environment")
            .user_name("discord-logger-test")
            .claim_field("nameidentifier", "Name identifier")
            .claim_field("name", "Name"),
        Arc::new(RequestScope),
    );
    let exception = ExceptionInfo::new("DivideByZero", "Attempted to divide by zero.")
        .with_stack_trace("at Calculator.Divide()")
        .with_data("Extra info 1", "x")
        .with_data("Extra info 2", "Extra info 2 value");

    let delivery = logger
        .deliver(&LogEvent::new(Severity::Error, "division failed").with_exception(exception))
        .await
        .unwrap();

    assert_eq!(delivery, Delivery::Attachment);
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);

    let payload = sent[0].payload();
    assert_eq!(payload.author_name, "discord-logger-test");
    assert_eq!(
        payload.fields,
        vec![
            ContextField::new("Application name", "Application Name Test").unwrap(),
            ContextField::new("Environment name", "Name of environment").unwrap(),
            ContextField::new("Name identifier", "SomeValueHere").unwrap(),
            ContextField::new("Name", "gunnar@somecompany.com").unwrap(),
            ContextField::new("Exception type", "DivideByZero").unwrap(),
        ]
    );

    let attachment = sent[0].attachment().unwrap();
    assert_eq!(attachment.filename, "exception-details.txt");
    let text = attachment.as_text();
    assert!(text.contains("division failed"));
    assert!(text.contains("at Calculator.Divide()"));
    assert!(text.contains("Extra info 1: x"));
    assert!(text.find("Extra info 1: x").unwrap() < text.find("Extra info 2: Extra info 2 value").unwrap());
    assert!(text.contains("URL: https://billing.example.com:443/api/invoices?page=3"));
    assert!(text.contains("\"Accept\": \"application/json\""));
    assert!(!text.contains("Cookie"));
    assert!(!text.contains("secret-session"));
}

#[tokio::test]
async fn oversized_message_falls_back_to_file_once() {
    let transport = MockTransport::new();
    let logger = logger(&transport, SinkConfig::default(), Arc::new(NoContext));
    let body = "0".repeat(2300);

    let delivery = logger.deliver(&LogEvent::new(Severity::Info, body.clone())).await.unwrap();

    assert_eq!(delivery, Delivery::FallbackAttachment);
    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert!(matches!(sent[0], Sent::Inline(_)));
    let attachment = sent[1].attachment().unwrap();
    assert_eq!(attachment.filename, "message.txt");
    assert_eq!(attachment.as_text(), body);
    assert_eq!(logger.stats().fallbacks.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn second_failure_is_returned_not_retried() {
    let mut transport = MockTransport::new();
    transport.fail_files = true;
    let logger = logger(&transport, SinkConfig::default(), Arc::new(NoContext));

    let err = logger
        .deliver(&LogEvent::new(Severity::Info, "0".repeat(2300)))
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::FallbackFailed(_)));
    assert_eq!(transport.sent().len(), 2);
    assert_eq!(logger.stats().failed.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn log_swallows_delivery_failures() {
    let mut transport = MockTransport::new();
    transport.fail_files = true;
    let logger = logger(&transport, SinkConfig::default(), Arc::new(NoContext));

    let result = logger
        .log(
            Severity::Critical,
            Some(ExceptionInfo::new("Panic", "worker died")),
            Some(|_: Option<&ExceptionInfo>| "worker pool degraded".to_string()),
        )
        .await;

    assert_eq!(result, Ok(()));
    assert_eq!(logger.stats().failed.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn missing_renderer_is_the_only_error_surfaced() {
    let transport = MockTransport::new();
    let logger = logger(&transport, SinkConfig::default(), Arc::new(NoContext));

    let result = logger
        .log(Severity::Info, None, None::<fn(Option<&ExceptionInfo>) -> String>)
        .await;

    assert_eq!(result, Err(SinkError::MissingRenderer));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn empty_message_is_not_delivered() {
    let transport = MockTransport::new();
    let logger = logger(
        &transport,
        SinkConfig::default().application_name("billing-api"),
        Arc::new(NoContext),
    );

    let delivery = logger.deliver(&LogEvent::new(Severity::Error, "")).await.unwrap();

    assert_eq!(delivery, Delivery::Skipped);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn concurrent_calls_are_independent() {
    let transport = MockTransport::new();
    let logger = logger(&transport, SinkConfig::default(), Arc::new(NoContext));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let logger = logger.clone();
            tokio::spawn(async move { logger.deliver(&LogEvent::new(Severity::Info, format!("event {i}"))).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), Delivery::Inline);
    }

    assert_eq!(transport.sent().len(), 16);
    assert_eq!(logger.stats().delivered.load(Ordering::Relaxed), 16);
}
