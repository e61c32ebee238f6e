//! Publishes events onto the topic exchange.

use super::topology::EXCHANGE;
use super::{BusChannel, BusConnection, BusError};
use crate::event::LogEvent;

/// Fire-and-forget publisher bound to one channel on the shared connection.
///
/// A publish that the channel accepts counts as success, even when no queue
/// is bound to the routing key.
pub struct EventEmitter {
    channel: Box<dyn BusChannel>,
    exchange: String,
}

impl EventEmitter {
    /// Open a channel and declare the topic exchange.
    pub async fn new(connection: &BusConnection) -> Result<Self, BusError> {
        Self::with_exchange(connection, EXCHANGE).await
    }

    pub async fn with_exchange(
        connection: &BusConnection,
        exchange: impl Into<String>,
    ) -> Result<Self, BusError> {
        let exchange = exchange.into();
        let channel = connection.open_channel().await.map_err(|e| {
            tracing::error!(error = %e, "emitter failed to open channel");
            e
        })?;
        channel.declare_topic_exchange(&exchange).await.map_err(|e| {
            tracing::error!(%exchange, error = %e, "emitter failed to declare exchange");
            e
        })?;
        Ok(Self { channel, exchange })
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Publish `payload` as the message body under `routing_key`.
    pub async fn push(&self, payload: &str, routing_key: &str) -> Result<(), BusError> {
        tracing::debug!(exchange = %self.exchange, routing_key, "pushing event");
        self.channel
            .publish(&self.exchange, routing_key, payload.as_bytes())
            .await
            .map_err(|e| {
                tracing::warn!(exchange = %self.exchange, routing_key, error = %e, "push failed");
                e
            })
    }

    /// Publish a `LogEvent` encoded as JSON.
    pub async fn emit(&self, event: &LogEvent, routing_key: &str) -> Result<(), BusError> {
        let body = event.to_json().map_err(|e| BusError::Publish {
            exchange: self.exchange.clone(),
            routing_key: routing_key.to_string(),
            reason: e.to_string(),
        })?;
        self.push(&body, routing_key).await
    }
}
