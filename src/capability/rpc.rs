//! Binary RPC over TCP.
//!
//! Each call opens a connection, writes one length-delimited frame holding a
//! bitcode-encoded `RpcRequest`, and reads one `RpcResponse` frame back.
//!
//! ```text
//! ┌──────────────┬───────────────────────────────────────────┐
//! │ u32 BE len   │ bitcode(RpcRequest { seq, method, params })│
//! └──────────────┴───────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use super::{Reply, Transport, TransportError};
use crate::event::LogEvent;

/// Method name the logger registers for log writes.
pub const LOG_INFO_METHOD: &str = "RPCServer.LogInfo";

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest<P> {
    pub seq: u64,
    pub method: String,
    pub params: P,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub seq: u64,
    pub error: Option<String>,
    pub reply: String,
}

/// Client side of the log RPC.
#[derive(Debug)]
pub struct RpcCapability {
    addr: String,
    method: String,
    timeout: Duration,
    seq: AtomicU64,
}

impl RpcCapability {
    /// Call `RPCServer.LogInfo` on `addr` (`host:port`).
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            method: LOG_INFO_METHOD.to_string(),
            timeout: DEFAULT_RPC_TIMEOUT,
            seq: AtomicU64::new(0),
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn round_trip(&self, params: &LogEvent) -> Result<RpcResponse, TransportError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| TransportError::Request(format!("dial {}: {e}", self.addr)))?;
        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            seq,
            method: self.method.clone(),
            params,
        };
        let frame =
            bitcode::serialize(&request).map_err(|e| TransportError::Encode(e.to_string()))?;
        framed
            .send(Bytes::from(frame))
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let frame = framed
            .next()
            .await
            .ok_or_else(|| TransportError::Request("connection closed before reply".into()))?
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let response: RpcResponse =
            bitcode::deserialize(&frame).map_err(|e| TransportError::Decode(e.to_string()))?;
        if response.seq != seq {
            return Err(TransportError::Decode(format!(
                "reply for call {} while waiting on {seq}",
                response.seq
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport<LogEvent> for RpcCapability {
    fn kind(&self) -> &'static str {
        "rpc"
    }

    async fn call(&self, request: &LogEvent) -> Result<Reply, TransportError> {
        let response = tokio::time::timeout(self.timeout, self.round_trip(request))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))??;

        match response.error {
            Some(err) => Err(TransportError::Remote(err)),
            None => Ok(Reply::new(response.reply)),
        }
    }
}

/// Serve the log RPC on `listener`, calling `handler(method, params)` per request.
///
/// Connections are served concurrently; each may carry several sequential calls.
pub async fn serve_rpc<H, Fut>(listener: TcpListener, handler: H) -> std::io::Result<()>
where
    H: Fn(String, LogEvent) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<String, String>> + Send + 'static,
{
    loop {
        let (stream, peer) = listener.accept().await?;
        let handler = handler.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, handler).await {
                tracing::warn!(%peer, error = %e, "rpc connection failed");
            }
        });
    }
}

async fn serve_connection<H, Fut>(stream: TcpStream, handler: H) -> Result<(), TransportError>
where
    H: Fn(String, LogEvent) -> Fut,
    Fut: Future<Output = Result<String, String>>,
{
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    while let Some(frame) = framed.next().await {
        let frame = frame.map_err(|e| TransportError::Request(e.to_string()))?;
        let request: RpcRequest<LogEvent> =
            bitcode::deserialize(&frame).map_err(|e| TransportError::Decode(e.to_string()))?;

        tracing::debug!(method = %request.method, seq = request.seq, "rpc call");
        let response = match handler(request.method, request.params).await {
            Ok(reply) => RpcResponse {
                seq: request.seq,
                error: None,
                reply,
            },
            Err(err) => RpcResponse {
                seq: request.seq,
                error: Some(err),
                reply: String::new(),
            },
        };

        let frame =
            bitcode::serialize(&response).map_err(|e| TransportError::Encode(e.to_string()))?;
        framed
            .send(Bytes::from(frame))
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
    }
    Ok(())
}
