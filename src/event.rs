//! The log event: one logical entity carried over every transport.

use serde::{Deserialize, Serialize};

/// A named, opaque textual payload.
///
/// The same `{name, data}` pair travels as JSON over HTTP and the event bus,
/// as a bitcode frame over binary RPC, and as a protobuf `Log` over gRPC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data: String,
}

impl LogEvent {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Encode as the JSON body published on the event bus.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a bus message body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}
