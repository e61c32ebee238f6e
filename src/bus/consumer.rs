//! Standing subscriber that forwards bus events to the log capability.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Semaphore;

use super::topology::EXCHANGE;
use super::{BusConnection, BusError, Delivery};
use crate::capability::Transport;
use crate::event::LogEvent;

/// What the consumer does with a decoded event, chosen by its `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Forward to the log capability.
    Log,
    /// Deliberately dropped.
    Ignore,
}

impl Route {
    pub fn for_name(name: &str) -> Self {
        match name {
            "log" | "event" => Route::Log,
            // No auth consumer exists yet; the event is acknowledged and dropped.
            "auth" => Route::Ignore,
            _ => Route::Log,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConsumerOptions {
    /// Upper bound on concurrently running handlers. `None` spawns one task per
    /// message with no limit.
    pub max_in_flight: Option<usize>,
}

/// Binds an exclusive anonymous queue to a set of topics and dispatches every
/// delivery on its own task.
///
/// Deliveries are auto-acknowledged: a message counts as handled the moment it
/// arrives, whatever the downstream outcome.
pub struct EventConsumer {
    connection: BusConnection,
    exchange: String,
    sink: Arc<dyn Transport<LogEvent>>,
    limiter: Option<Arc<Semaphore>>,
}

impl EventConsumer {
    /// Open a channel and declare the topic exchange.
    pub async fn new(
        connection: &BusConnection,
        sink: Arc<dyn Transport<LogEvent>>,
    ) -> Result<Self, BusError> {
        Self::with_options(connection, sink, ConsumerOptions::default()).await
    }

    pub async fn with_options(
        connection: &BusConnection,
        sink: Arc<dyn Transport<LogEvent>>,
        options: ConsumerOptions,
    ) -> Result<Self, BusError> {
        let channel = connection.open_channel().await.map_err(|e| {
            tracing::error!(error = %e, "consumer failed to open channel");
            e
        })?;
        channel.declare_topic_exchange(EXCHANGE).await.map_err(|e| {
            tracing::error!(exchange = EXCHANGE, error = %e, "consumer failed to declare exchange");
            e
        })?;

        Ok(Self {
            connection: connection.clone(),
            exchange: EXCHANGE.to_string(),
            sink,
            limiter: options
                .max_in_flight
                .map(|n| Arc::new(Semaphore::new(n.max(1)))),
        })
    }

    /// Bind to `topics` and consume until the delivery stream ends.
    ///
    /// Only returns early with an error if channel, queue, binding or consume
    /// setup fails, or if the stream itself reports a failure.
    pub async fn listen<I, S>(&self, topics: I) -> Result<(), BusError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let channel = self.connection.open_channel().await?;
        let queue = channel.declare_anonymous_queue().await.map_err(|e| {
            tracing::error!(error = %e, "error declaring queue");
            e
        })?;

        for topic in topics {
            let topic = topic.as_ref();
            channel
                .bind_queue(&queue, &self.exchange, topic)
                .await
                .map_err(|e| {
                    tracing::error!(%queue, topic, error = %e, "error binding queue");
                    e
                })?;
        }

        let mut deliveries = channel.consume(&queue).await.map_err(|e| {
            tracing::error!(%queue, error = %e, "error consuming messages");
            e
        })?;

        tracing::info!(exchange = %self.exchange, %queue, "waiting for messages");

        while let Some(delivery) = deliveries.next().await {
            let delivery = delivery.map_err(|e| {
                tracing::error!(%queue, error = %e, "delivery stream failed");
                e
            })?;
            self.dispatch(delivery).await;
        }

        tracing::info!(%queue, "delivery stream closed");
        Ok(())
    }

    /// Decode one delivery and hand it to a new task.
    async fn dispatch(&self, delivery: Delivery) {
        tracing::debug!(routing_key = %delivery.routing_key, "received message");

        let event = match LogEvent::from_slice(&delivery.body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(routing_key = %delivery.routing_key, error = %e, "dropping undecodable message");
                return;
            }
        };

        let permit = match &self.limiter {
            Some(limiter) => match Arc::clone(limiter).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => return,
            },
            None => None,
        };

        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            let _permit = permit;
            handle_event(sink.as_ref(), event).await;
        });
    }
}

async fn handle_event(sink: &dyn Transport<LogEvent>, event: LogEvent) {
    match Route::for_name(&event.name) {
        Route::Log => {
            tracing::debug!(name = %event.name, "forwarding event to log service");
            if let Err(e) = sink.call(&event).await {
                tracing::warn!(name = %event.name, error = %e, "error logging item");
            }
        }
        Route::Ignore => {
            tracing::debug!(name = %event.name, "ignoring event");
        }
    }
}
