//! Inbound action envelope and the uniform response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broker::DispatchError;
use crate::event::LogEvent;

/// Email/password pair forwarded to the authentication capability unchecked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// A mail send request forwarded to the mail capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MailRequest {
    #[serde(default)]
    pub from: String,
    #[serde(default, alias = "fromName")]
    pub from_name: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    /// Template data rendered by the mail capability. Accepted as `message`
    /// (what the broker's callers send) or `templateData`.
    #[serde(default, rename = "message", alias = "templateData")]
    pub template_data: Value,
}

/// The tagged-union request the dispatcher interprets.
///
/// `action` selects which one of the optional payloads is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Credentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<MailRequest>,
}

impl ActionEnvelope {
    pub fn auth(credentials: Credentials) -> Self {
        Self {
            action: "auth".into(),
            auth: Some(credentials),
            ..Default::default()
        }
    }

    pub fn log(event: LogEvent) -> Self {
        Self {
            action: "log".into(),
            log: Some(event),
            ..Default::default()
        }
    }

    pub fn mail(request: MailRequest) -> Self {
        Self {
            action: "mail".into(),
            mail: Some(request),
            ..Default::default()
        }
    }
}

/// A validated action: the discriminant resolved to its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Auth(Credentials),
    Log(LogEvent),
    Mail(MailRequest),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Auth(_) => "auth",
            Action::Log(_) => "log",
            Action::Mail(_) => "mail",
        }
    }
}

impl TryFrom<ActionEnvelope> for Action {
    type Error = DispatchError;

    fn try_from(envelope: ActionEnvelope) -> Result<Self, Self::Error> {
        match envelope.action.as_str() {
            "auth" => envelope
                .auth
                .map(Action::Auth)
                .ok_or(DispatchError::MissingPayload("auth")),
            "log" => envelope
                .log
                .map(Action::Log)
                .ok_or(DispatchError::MissingPayload("log")),
            "mail" => envelope
                .mail
                .map(Action::Mail)
                .ok_or(DispatchError::MissingPayload("mail")),
            other => Err(DispatchError::UnknownAction(other.to_string())),
        }
    }
}

/// `{error, message, data}`: the only contract the broker guarantees its callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseEnvelope {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn ok_with_data(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }
}
