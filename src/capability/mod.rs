//! Capability transports - one interface over HTTP, binary RPC, gRPC and the bus.
//!
//! The dispatcher only ever sees `Transport<Req>`. Each adapter owns the wire
//! details of its protocol and reduces every outcome to `Reply` or a
//! `TransportError`, so action routing can be exercised against in-process fakes.
//!
//! | Adapter          | Wire                                  | Used for            |
//! |------------------|---------------------------------------|---------------------|
//! | `HttpCapability` | JSON over HTTP, 202 = accepted        | auth, mail, log     |
//! | `RpcCapability`  | bitcode frames over TCP               | log (`LogInfo`)     |
//! | `GrpcCapability` | `logs.Logger/WriteLog`                | log                 |
//! | `BusCapability`  | JSON on the `logs_topic` exchange     | log (async)         |

mod bus;
mod error;
pub mod grpc;
mod http;
pub mod rpc;

use async_trait::async_trait;
use serde_json::Value;

pub use bus::BusCapability;
pub use error::TransportError;
pub use grpc::GrpcCapability;
pub use http::{HttpCapability, ResponseMode};
pub use rpc::{serve_rpc, RpcCapability};

/// Successful downstream outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    /// Message reported by the downstream service, if it reports one.
    pub message: String,
    pub data: Option<Value>,
}

impl Reply {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Option<Value>) -> Self {
        self.data = data;
        self
    }
}

/// A single attempt to invoke a downstream capability.
///
/// Implementations never retry; a failure is terminal for the request.
#[async_trait]
pub trait Transport<Req>: Send + Sync
where
    Req: Send + Sync,
{
    /// Short protocol name for logs (`"http"`, `"rpc"`, ...).
    fn kind(&self) -> &'static str;

    async fn call(&self, request: &Req) -> Result<Reply, TransportError>;
}
