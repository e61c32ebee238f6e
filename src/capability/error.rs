//! Error type for capability transports.

use std::time::Duration;

use thiserror::Error;

use crate::bus::BusError;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent (connect refused, DNS, broken pipe).
    #[error("request failed: {0}")]
    Request(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The downstream answered with an unexpected HTTP status.
    #[error("unexpected status {0}")]
    Status(u16),
    /// The downstream accepted the call but flagged an error in its body.
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
    /// The RPC server returned an error for the call.
    #[error("remote error: {0}")]
    Remote(String),
    #[error("grpc error: {0}")]
    Grpc(String),
    #[error(transparent)]
    Bus(#[from] BusError),
}

impl From<tonic::Status> for TransportError {
    fn from(status: tonic::Status) -> Self {
        TransportError::Grpc(format!("{}: {}", status.code(), status.message()))
    }
}
