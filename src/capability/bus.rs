//! Log capability reached through the event fabric.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Reply, Transport, TransportError};
use crate::bus::EventEmitter;
use crate::event::LogEvent;

/// Pushes the event onto the topic exchange under a fixed routing key.
///
/// Success means the channel accepted the publish, not that any consumer has
/// processed the event.
pub struct BusCapability {
    emitter: Arc<EventEmitter>,
    routing_key: String,
}

impl BusCapability {
    pub fn new(emitter: Arc<EventEmitter>, routing_key: impl Into<String>) -> Self {
        Self {
            emitter,
            routing_key: routing_key.into(),
        }
    }
}

#[async_trait]
impl Transport<LogEvent> for BusCapability {
    fn kind(&self) -> &'static str {
        "bus"
    }

    async fn call(&self, request: &LogEvent) -> Result<Reply, TransportError> {
        self.emitter.emit(request, &self.routing_key).await?;
        Ok(Reply::default())
    }
}
