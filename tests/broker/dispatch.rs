//! Action routing against fake capabilities.

use broker_rust::bus::{BusConnection, EventEmitter, InMemoryBroker, LOG_INFO};
use broker_rust::capability::BusCapability;
use broker_rust::{ActionEnvelope, Capabilities, Credentials, Dispatcher, LogEvent, MailRequest, Reply, TransportError};
use serde_json::json;
use std::sync::Arc;

use crate::support::{Fake, Fakes};

fn credentials() -> Credentials {
    Credentials {
        email: "admin@example.com".into(),
        password: "verysecret".into(),
    }
}

fn mail_to(to: &str) -> MailRequest {
    MailRequest {
        from: "a@x.com".into(),
        to: to.into(),
        subject: "Hi".into(),
        template_data: json!("Hello"),
        ..Default::default()
    }
}

#[tokio::test]
async fn auth_success_carries_downstream_data() {
    let fakes = Fakes {
        auth: Fake::with(|| Ok(Reply::new("Logged in user").with_data(Some(json!({"id": 1}))))),
        ..Default::default()
    };

    let response = fakes.dispatcher().handle(ActionEnvelope::auth(credentials())).await;

    assert_eq!(response.status, 202);
    assert!(response.is_success());
    assert_eq!(response.body.message, "Authenticated successfully!");
    assert_eq!(response.body.data, Some(json!({"id": 1})));
    assert_eq!(fakes.auth.requests(), vec![credentials()]);
    assert_eq!(fakes.total_calls(), 1);
}

#[tokio::test]
async fn auth_401_is_invalid_credentials() {
    let fakes = Fakes {
        auth: Fake::failing(|| TransportError::Status(401)),
        ..Default::default()
    };

    let response = fakes.dispatcher().handle(ActionEnvelope::auth(credentials())).await;

    assert_eq!(response.status, 401);
    assert!(response.body.error);
    assert_eq!(response.body.message, "invalid credentials");
}

#[tokio::test]
async fn auth_other_status_is_a_service_error() {
    let fakes = Fakes {
        auth: Fake::failing(|| TransportError::Status(500)),
        ..Default::default()
    };

    let response = fakes.dispatcher().handle(ActionEnvelope::auth(credentials())).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.body.message, "error calling auth service");
}

#[tokio::test]
async fn auth_rejection_is_unauthorized() {
    let fakes = Fakes {
        auth: Fake::failing(|| TransportError::Rejected("account locked".into())),
        ..Default::default()
    };

    let response = fakes.dispatcher().handle(ActionEnvelope::auth(credentials())).await;

    assert_eq!(response.status, 401);
    assert_eq!(response.body.message, "account locked");
}

#[tokio::test]
async fn unknown_action_calls_nothing() {
    let fakes = Fakes::default();
    let envelope = ActionEnvelope {
        action: "sms".into(),
        ..Default::default()
    };

    let response = fakes.dispatcher().handle(envelope).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.body.message, "invalid action");
    assert_eq!(fakes.total_calls(), 0);
}

#[tokio::test]
async fn missing_payload_calls_nothing() {
    let fakes = Fakes::default();
    let envelope = ActionEnvelope {
        action: "mail".into(),
        log: Some(LogEvent::new("log", "x")),
        ..Default::default()
    };

    let response = fakes.dispatcher().handle(envelope).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.body.message, "missing mail payload");
    assert_eq!(fakes.total_calls(), 0);
}

#[tokio::test]
async fn log_returns_rpc_reply() {
    let fakes = Fakes::default();

    let response = fakes
        .dispatcher()
        .handle(ActionEnvelope::log(LogEvent::new("log", "hello")))
        .await;

    assert_eq!(response.status, 202);
    assert_eq!(response.body.message, "logged via rpc");
    assert_eq!(fakes.log.requests(), vec![LogEvent::new("log", "hello")]);
    assert_eq!(fakes.log_grpc.calls(), 0);
}

#[tokio::test]
async fn log_rpc_failure_is_reported() {
    let fakes = Fakes {
        log: Fake::failing(|| TransportError::Remote("disk full".into())),
        ..Default::default()
    };

    let response = fakes
        .dispatcher()
        .handle(ActionEnvelope::log(LogEvent::new("log", "hello")))
        .await;

    assert_eq!(response.status, 400);
    assert!(response.body.message.contains("disk full"));
}

#[tokio::test]
async fn mail_success_message_names_recipient() {
    let fakes = Fakes::default();

    let response = fakes.dispatcher().handle(ActionEnvelope::mail(mail_to("b@x.com"))).await;

    assert_eq!(response.status, 202);
    assert_eq!(response.body.message, "Mail sent successfully! tob@x.com");
    assert_eq!(fakes.mail.requests()[0].to, "b@x.com");
}

#[tokio::test]
async fn mail_failures_map_to_fixed_messages() {
    let status = Fakes {
        mail: Fake::failing(|| TransportError::Status(500)),
        ..Default::default()
    };
    let response = status.dispatcher().handle(ActionEnvelope::mail(mail_to("b@x.com"))).await;
    assert_eq!(response.body.message, "error calling mailer service");

    let rejected = Fakes {
        mail: Fake::failing(|| TransportError::Rejected("smtp down".into())),
        ..Default::default()
    };
    let response = rejected.dispatcher().handle(ActionEnvelope::mail(mail_to("b@x.com"))).await;
    assert_eq!(response.body.message, "error sending mail");
}

#[tokio::test]
async fn grpc_path_ignores_action_and_defaults_missing_log() {
    let fakes = Fakes::default();

    let response = fakes.dispatcher().log_via_grpc(ActionEnvelope::mail(mail_to("b@x.com"))).await;

    assert_eq!(response.status, 202);
    assert!(!response.body.error);
    assert_eq!(response.body.message, "Logged successfully! via gRPC");
    assert_eq!(fakes.log_grpc.requests(), vec![LogEvent::default()]);
    assert_eq!(fakes.mail.calls(), 0);
}

#[tokio::test]
async fn grpc_failure_is_reported() {
    let fakes = Fakes {
        log_grpc: Fake::failing(|| TransportError::Timeout(std::time::Duration::from_secs(1))),
        ..Default::default()
    };

    let response = fakes
        .dispatcher()
        .log_via_grpc(ActionEnvelope::log(LogEvent::new("log", "x")))
        .await;

    assert!(response.body.error);
    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn event_path_publishes_on_fixed_routing_key() {
    let broker = InMemoryBroker::new();
    let conn = BusConnection::from_broker(broker.clone());
    let emitter = Arc::new(EventEmitter::new(&conn).await.unwrap());
    let fakes = Fakes::default();
    let dispatcher = Dispatcher::new(Capabilities {
        auth: fakes.auth.clone(),
        log: fakes.log.clone(),
        log_grpc: fakes.log_grpc.clone(),
        log_event: Arc::new(BusCapability::new(emitter, LOG_INFO)),
        mail: fakes.mail.clone(),
    });

    let response = dispatcher
        .log_via_event(ActionEnvelope::log(LogEvent::new("event", "clicked")))
        .await;

    assert_eq!(response.status, 202);
    assert_eq!(response.body.message, "Logged successfully! via RabbitMQ");
    let published = broker.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].1.routing_key, LOG_INFO);
    assert_eq!(
        LogEvent::from_slice(&published[0].1.body).unwrap(),
        LogEvent::new("event", "clicked")
    );
}

#[tokio::test]
async fn event_path_requires_log_payload() {
    let fakes = Fakes::default();

    let response = fakes.dispatcher().log_via_event(ActionEnvelope::auth(credentials())).await;

    assert_eq!(response.status, 400);
    assert_eq!(fakes.log_event.calls(), 0);
}

#[tokio::test]
async fn event_path_reports_closed_bus() {
    let broker = InMemoryBroker::new();
    let conn = BusConnection::from_broker(broker.clone());
    let emitter = Arc::new(EventEmitter::new(&conn).await.unwrap());
    conn.close().await.unwrap();

    let fakes = Fakes::default();
    let dispatcher = Dispatcher::new(Capabilities {
        auth: fakes.auth.clone(),
        log: fakes.log.clone(),
        log_grpc: fakes.log_grpc.clone(),
        log_event: Arc::new(BusCapability::new(emitter, LOG_INFO)),
        mail: fakes.mail.clone(),
    });

    let response = dispatcher
        .log_via_event(ActionEnvelope::log(LogEvent::new("log", "x")))
        .await;

    assert!(response.body.error);
    assert!(response.body.message.starts_with("error pushing to queue"));
}
