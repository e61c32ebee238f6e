//! JSON-over-HTTP capability adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use super::{Reply, Transport, TransportError};
use crate::envelope::ResponseEnvelope;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// How the body of a 202 response is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Decode a `ResponseEnvelope`; `error: true` becomes `Rejected`.
    #[default]
    Envelope,
    /// Only the status matters; the body is ignored.
    StatusOnly,
}

/// POSTs the request as JSON to a fixed URL and expects `202 Accepted`.
#[derive(Debug, Clone)]
pub struct HttpCapability {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    mode: ResponseMode,
}

impl HttpCapability {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    /// Share a connection pool across adapters.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: DEFAULT_HTTP_TIMEOUT,
            mode: ResponseMode::default(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn status_only(mut self) -> Self {
        self.mode = ResponseMode::StatusOnly;
        self
    }

    fn map_send_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl<Req> Transport<Req> for HttpCapability
where
    Req: Serialize + Send + Sync,
{
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn call(&self, request: &Req) -> Result<Reply, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            return Err(TransportError::Status(status.as_u16()));
        }

        match self.mode {
            ResponseMode::StatusOnly => Ok(Reply::default()),
            ResponseMode::Envelope => {
                let body: ResponseEnvelope = response
                    .json()
                    .await
                    .map_err(|e| TransportError::Decode(e.to_string()))?;
                if body.error {
                    return Err(TransportError::Rejected(body.message));
                }
                Ok(Reply::new(body.message).with_data(body.data))
            }
        }
    }
}
