//! Error type for bus operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    /// Dialing the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// The broker stayed unreachable for the whole retry budget.
    #[error("broker unreachable after {attempts} attempts: {last_error}")]
    ConnectionExhausted {
        attempts: u32,
        last_error: Box<BusError>,
    },
    #[error("channel open failed: {0}")]
    Channel(String),
    #[error("exchange declare failed for {exchange}: {reason}")]
    ExchangeDeclare { exchange: String, reason: String },
    #[error("queue declare failed: {0}")]
    QueueDeclare(String),
    #[error("binding {pattern} on {queue} failed: {reason}")]
    Bind {
        queue: String,
        pattern: String,
        reason: String,
    },
    #[error("publish to {exchange}/{routing_key} failed: {reason}")]
    Publish {
        exchange: String,
        routing_key: String,
        reason: String,
    },
    #[error("consume failed: {0}")]
    Consume(String),
    #[error("connection close failed: {0}")]
    Close(String),
}
