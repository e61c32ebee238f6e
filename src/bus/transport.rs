//! Broker and channel traits the emitter and consumer are written against.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::BusError;

/// A message delivered from a bound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub routing_key: String,
    pub body: Vec<u8>,
}

impl Delivery {
    pub fn new(routing_key: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            routing_key: routing_key.into(),
            body,
        }
    }
}

pub type DeliveryStream = BoxStream<'static, Result<Delivery, BusError>>;

/// A live connection to a message broker.
///
/// Implementations:
/// - `AmqpBroker` - RabbitMQ via lapin (feature `amqp`)
/// - `InMemoryBroker` - in-process topic exchange for tests
#[async_trait]
pub trait Broker: Send + Sync {
    async fn open_channel(&self) -> Result<Box<dyn BusChannel>, BusError>;

    async fn close(&self) -> Result<(), BusError> {
        Ok(())
    }
}

/// One channel on a broker connection.
#[async_trait]
pub trait BusChannel: Send + Sync {
    /// Declare a durable, non-autodelete topic exchange. Idempotent.
    async fn declare_topic_exchange(&self, exchange: &str) -> Result<(), BusError>;

    /// Publish `body` under `routing_key`. Does not wait for a broker confirm.
    async fn publish(&self, exchange: &str, routing_key: &str, body: &[u8])
        -> Result<(), BusError>;

    /// Declare an exclusive, auto-deleting queue with a broker-generated name.
    async fn declare_anonymous_queue(&self) -> Result<String, BusError>;

    async fn bind_queue(&self, queue: &str, exchange: &str, pattern: &str)
        -> Result<(), BusError>;

    /// Start consuming with auto-acknowledge.
    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BusError>;
}
