//! gRPC logger capability.
//!
//! Uses tonic for the transport and prost for message serialization (standard
//! protobuf wire format, no `.proto` file). The service is `logs.Logger` with a
//! single unary RPC, `WriteLog`.
//!
//! ```ignore
//! let grpc = GrpcCapability::connect_lazy("http://logger-service:50001", Duration::from_secs(1))?;
//! let reply = grpc.call(&LogEvent::new("log", "hello")).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};

use super::{Reply, Transport, TransportError};
use crate::event::LogEvent;

pub const DEFAULT_GRPC_TIMEOUT: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Message types (prost - standard protobuf wire format)
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct Log {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub data: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LogRequest {
    #[prost(message, optional, tag = "1")]
    pub log_entry: Option<Log>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LogResponse {
    #[prost(string, tag = "1")]
    pub message: String,
}

impl From<&LogEvent> for Log {
    fn from(event: &LogEvent) -> Self {
        Log {
            name: event.name.clone(),
            data: event.data.clone(),
        }
    }
}

impl From<Log> for LogEvent {
    fn from(log: Log) -> Self {
        LogEvent::new(log.name, log.data)
    }
}

// ---------------------------------------------------------------------------
// Generated service trait + server/client
// ---------------------------------------------------------------------------

include!(concat!(env!("OUT_DIR"), "/logs.Logger.rs"));

pub use logger_client::LoggerClient;
pub use logger_server::{Logger, LoggerServer};

// ---------------------------------------------------------------------------
// Client adapter
// ---------------------------------------------------------------------------

/// Calls `WriteLog` with a deadline covering the whole call.
#[derive(Debug, Clone)]
pub struct GrpcCapability {
    client: LoggerClient<Channel>,
    timeout: Duration,
}

impl GrpcCapability {
    /// Build a client whose channel connects on first use.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect_lazy(url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let channel = Endpoint::from_shared(url.to_string())
            .map_err(|e| TransportError::Request(format!("invalid gRPC endpoint {url}: {e}")))?
            .connect_lazy();
        Ok(Self::from_channel(channel, timeout))
    }

    pub fn from_channel(channel: Channel, timeout: Duration) -> Self {
        Self {
            client: LoggerClient::new(channel),
            timeout,
        }
    }
}

#[async_trait]
impl Transport<LogEvent> for GrpcCapability {
    fn kind(&self) -> &'static str {
        "grpc"
    }

    async fn call(&self, request: &LogEvent) -> Result<Reply, TransportError> {
        let mut client = self.client.clone();
        let request = LogRequest {
            log_entry: Some(Log::from(request)),
        };

        let response = tokio::time::timeout(self.timeout, client.write_log(request))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))??;

        Ok(Reply::new(response.into_inner().message))
    }
}

/// Wrap a `Logger` implementation as a tonic service.
pub fn logger_server<L: Logger>(logger: L) -> LoggerServer<L> {
    LoggerServer::new(logger)
}
