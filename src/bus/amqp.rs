//! RabbitMQ broker on lapin.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};

use super::{Broker, BusChannel, BusError, Delivery, DeliveryStream};

pub struct AmqpBroker {
    connection: Connection,
}

impl AmqpBroker {
    /// One connection attempt; retries belong to `BusConnection::establish`.
    pub async fn dial(url: &str) -> Result<Self, BusError> {
        let properties = ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current())
            .with_reactor(tokio_reactor_trait::Tokio);

        let connection = Connection::connect(url, properties)
            .await
            .map_err(|e| BusError::ConnectionFailed(e.to_string()))?;
        tracing::info!("connected to message bus");
        Ok(Self { connection })
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn open_channel(&self) -> Result<Box<dyn BusChannel>, BusError> {
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| BusError::Channel(e.to_string()))?;
        Ok(Box::new(AmqpChannel { channel }))
    }

    async fn close(&self) -> Result<(), BusError> {
        self.connection
            .close(200, "shutdown")
            .await
            .map_err(|e| BusError::Close(e.to_string()))
    }
}

struct AmqpChannel {
    channel: Channel,
}

#[async_trait]
impl BusChannel for AmqpChannel {
    async fn declare_topic_exchange(&self, exchange: &str) -> Result<(), BusError> {
        let options = ExchangeDeclareOptions {
            durable: true,
            auto_delete: false,
            ..ExchangeDeclareOptions::default()
        };
        self.channel
            .exchange_declare(exchange, ExchangeKind::Topic, options, FieldTable::default())
            .await
            .map_err(|e| BusError::ExchangeDeclare {
                exchange: exchange.to_string(),
                reason: e.to_string(),
            })
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) -> Result<(), BusError> {
        // The returned confirm is dropped: publishing is fire-and-forget.
        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default().with_content_type("text/plain".into()),
            )
            .await
            .map(drop)
            .map_err(|e| BusError::Publish {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn declare_anonymous_queue(&self) -> Result<String, BusError> {
        let options = QueueDeclareOptions {
            exclusive: true,
            auto_delete: true,
            durable: false,
            ..QueueDeclareOptions::default()
        };
        let queue = self
            .channel
            .queue_declare("", options, FieldTable::default())
            .await
            .map_err(|e| BusError::QueueDeclare(e.to_string()))?;
        Ok(queue.name().as_str().to_string())
    }

    async fn bind_queue(&self, queue: &str, exchange: &str, pattern: &str) -> Result<(), BusError> {
        self.channel
            .queue_bind(
                queue,
                exchange,
                pattern,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::Bind {
                queue: queue.to_string(),
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BusError> {
        let options = BasicConsumeOptions {
            no_ack: true,
            ..BasicConsumeOptions::default()
        };
        let consumer = self
            .channel
            .basic_consume(queue, "", options, FieldTable::default())
            .await
            .map_err(|e| BusError::Consume(e.to_string()))?;

        Ok(consumer
            .map(|delivery| {
                delivery
                    .map(|d| Delivery::new(d.routing_key.as_str().to_string(), d.data))
                    .map_err(|e| BusError::Consume(e.to_string()))
            })
            .boxed())
    }
}
