//! Dispatcher - routes one action envelope to exactly one capability transport.
//!
//! | Entry point     | Action  | Transport                | Success message                       |
//! |-----------------|---------|--------------------------|---------------------------------------|
//! | `handle`        | `auth`  | HTTP `/authenticate`     | `Authenticated successfully!`         |
//! | `handle`        | `log`   | RPC `RPCServer.LogInfo`  | whatever the RPC returns              |
//! | `handle`        | `mail`  | HTTP `/send`             | `Mail sent successfully! to<to>`      |
//! | `log_via_grpc`  | -       | gRPC `WriteLog`          | `Logged successfully! via gRPC`       |
//! | `log_via_event` | -       | bus, routing key fixed   | `Logged successfully! via RabbitMQ`   |
//!
//! No transport is retried; the first downstream failure ends the request.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::DispatchError;
use crate::capability::{Reply, Transport, TransportError};
use crate::envelope::{Action, ActionEnvelope, Credentials, MailRequest, ResponseEnvelope};
use crate::event::LogEvent;

/// The downstream transports a dispatcher routes to.
pub struct Capabilities {
    pub auth: Arc<dyn Transport<Credentials>>,
    /// Log writes for the `log` action.
    pub log: Arc<dyn Transport<LogEvent>>,
    pub log_grpc: Arc<dyn Transport<LogEvent>>,
    /// Log writes pushed onto the event fabric.
    pub log_event: Arc<dyn Transport<LogEvent>>,
    pub mail: Arc<dyn Transport<MailRequest>>,
}

/// Response from a dispatch: HTTP-style status plus the uniform envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub status: u16,
    pub body: ResponseEnvelope,
}

impl DispatchResponse {
    pub fn accepted(body: ResponseEnvelope) -> Self {
        Self { status: 202, body }
    }

    pub fn is_success(&self) -> bool {
        !self.body.error
    }
}

impl From<DispatchError> for DispatchResponse {
    fn from(err: DispatchError) -> Self {
        Self {
            status: err.status_code(),
            body: ResponseEnvelope::error(err.to_string()),
        }
    }
}

impl From<Result<ResponseEnvelope, DispatchError>> for DispatchResponse {
    fn from(result: Result<ResponseEnvelope, DispatchError>) -> Self {
        match result {
            Ok(body) => Self::accepted(body),
            Err(err) => err.into(),
        }
    }
}

pub struct Dispatcher {
    capabilities: Capabilities,
}

impl Dispatcher {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    /// Interpret `envelope.action` and invoke the matching capability.
    pub async fn handle(&self, envelope: ActionEnvelope) -> DispatchResponse {
        tracing::debug!(action = %envelope.action, "received request");

        let action = match Action::try_from(envelope) {
            Ok(action) => action,
            Err(err) => {
                tracing::warn!(error = %err, "rejecting request");
                return err.into();
            }
        };

        let result = match &action {
            Action::Auth(credentials) => self.authenticate(credentials).await,
            Action::Log(event) => self.log_item(event).await,
            Action::Mail(mail) => self.send_mail(mail).await,
        };
        if let Err(err) = &result {
            tracing::warn!(action = action.name(), error = %err, "dispatch failed");
        }
        result.into()
    }

    /// Deliver the envelope's `log` payload over gRPC.
    ///
    /// A missing `log` field is sent as an empty event.
    pub async fn log_via_grpc(&self, envelope: ActionEnvelope) -> DispatchResponse {
        let event = envelope.log.unwrap_or_default();
        let result = invoke(self.capabilities.log_grpc.as_ref(), "log", &event)
            .await
            .map(|_| ResponseEnvelope::ok("Logged successfully! via gRPC"))
            .map_err(|e| DispatchError::Downstream(format!("error calling logger service: {e}")));
        result.into()
    }

    /// Push the envelope's `log` payload onto the event fabric.
    ///
    /// Returns before any consumer has necessarily seen the event.
    pub async fn log_via_event(&self, envelope: ActionEnvelope) -> DispatchResponse {
        let Some(event) = envelope.log else {
            return DispatchError::MissingPayload("log").into();
        };
        let result = invoke(self.capabilities.log_event.as_ref(), "log", &event)
            .await
            .map(|_| ResponseEnvelope::ok("Logged successfully! via RabbitMQ"))
            .map_err(|e| DispatchError::Downstream(format!("error pushing to queue: {e}")));
        result.into()
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<ResponseEnvelope, DispatchError> {
        let reply = invoke(self.capabilities.auth.as_ref(), "auth", credentials)
            .await
            .map_err(|e| match e {
                TransportError::Status(401) => DispatchError::InvalidCredentials,
                TransportError::Status(_) => {
                    DispatchError::Downstream("error calling auth service".into())
                }
                TransportError::Rejected(message) if message.is_empty() => {
                    DispatchError::Unauthorized("authentication rejected".into())
                }
                TransportError::Rejected(message) => DispatchError::Unauthorized(message),
                other => DispatchError::Downstream(other.to_string()),
            })?;

        Ok(ResponseEnvelope::ok_with_data(
            "Authenticated successfully!",
            reply.data,
        ))
    }

    async fn log_item(&self, event: &LogEvent) -> Result<ResponseEnvelope, DispatchError> {
        let reply = invoke(self.capabilities.log.as_ref(), "log", event)
            .await
            .map_err(|e| DispatchError::Downstream(e.to_string()))?;
        Ok(ResponseEnvelope::ok(reply.message))
    }

    async fn send_mail(&self, mail: &MailRequest) -> Result<ResponseEnvelope, DispatchError> {
        invoke(self.capabilities.mail.as_ref(), "mail", mail)
            .await
            .map_err(|e| match e {
                TransportError::Status(_) => {
                    DispatchError::Downstream("error calling mailer service".into())
                }
                TransportError::Rejected(_) => DispatchError::Downstream("error sending mail".into()),
                other => DispatchError::Downstream(other.to_string()),
            })?;

        // No separator between "to" and the address.
        Ok(ResponseEnvelope::ok(format!(
            "Mail sent successfully! to{}",
            mail.to
        )))
    }
}

/// One logged transport attempt.
async fn invoke<Req: Send + Sync>(
    transport: &dyn Transport<Req>,
    action: &'static str,
    request: &Req,
) -> Result<Reply, TransportError> {
    let kind = transport.kind();
    tracing::info!(action, transport = kind, "calling capability");
    transport.call(request).await.map_err(|e| {
        tracing::warn!(action, transport = kind, error = %e, "capability call failed");
        e
    })
}
