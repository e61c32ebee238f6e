//! In-process broker for testing and single-process scenarios.
//!
//! Implements the same topology semantics as the AMQP broker:
//! - topic exchanges must be declared before publishing
//! - each anonymous queue receives one copy of every message whose routing
//!   key matches at least one of its bindings
//! - messages routed to no queue are dropped
//! - delivery order is FIFO per queue

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::topology::topic_matches;
use super::{Broker, BusChannel, BusError, Delivery, DeliveryStream};

/// In-memory broker. Cloning shares the same exchanges and queues.
///
/// ## Example
///
/// ```
/// # tokio_test_block_on(async {
/// use broker_rust::bus::{BusConnection, EventEmitter, InMemoryBroker, LOG_INFO};
///
/// let broker = InMemoryBroker::new();
/// let conn = BusConnection::from_broker(broker.clone());
/// let emitter = EventEmitter::new(&conn).await.unwrap();
///
/// emitter.push(r#"{"name":"log","data":"x"}"#, LOG_INFO).await.unwrap();
/// assert_eq!(broker.published().len(), 1);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<State>>,
    closed: Arc<AtomicBool>,
}

#[derive(Default)]
struct State {
    exchanges: HashSet<String>,
    queues: HashMap<String, QueueSlot>,
    bindings: Vec<Binding>,
    published: Vec<(String, Delivery)>,
    next_queue: u64,
}

struct QueueSlot {
    tx: UnboundedSender<Delivery>,
    rx: Option<UnboundedReceiver<Delivery>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    exchange: String,
    queue: String,
    pattern: String,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message accepted by `publish`, with its exchange, in order.
    pub fn published(&self) -> Vec<(String, Delivery)> {
        lock(&self.state).published.clone()
    }

    pub fn has_exchange(&self, exchange: &str) -> bool {
        lock(&self.state).exchanges.contains(exchange)
    }

    /// Names of the queues declared so far.
    pub fn queues(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.state).queues.keys().cloned().collect();
        names.sort();
        names
    }

    /// Binding patterns registered for `queue`.
    pub fn bindings(&self, queue: &str) -> Vec<String> {
        lock(&self.state)
            .bindings
            .iter()
            .filter(|b| b.queue == queue)
            .map(|b| b.pattern.clone())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), BusError> {
        if self.is_closed() {
            Err(BusError::Channel("connection closed".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn open_channel(&self) -> Result<Box<dyn BusChannel>, BusError> {
        self.ensure_open()?;
        Ok(Box::new(InMemoryChannel {
            broker: self.clone(),
        }))
    }

    /// Drops every queue, which ends all active delivery streams.
    async fn close(&self) -> Result<(), BusError> {
        self.closed.store(true, Ordering::Release);
        let mut state = lock(&self.state);
        state.queues.clear();
        state.bindings.clear();
        Ok(())
    }
}

struct InMemoryChannel {
    broker: InMemoryBroker,
}

#[async_trait]
impl BusChannel for InMemoryChannel {
    async fn declare_topic_exchange(&self, exchange: &str) -> Result<(), BusError> {
        self.broker.ensure_open()?;
        lock(&self.broker.state)
            .exchanges
            .insert(exchange.to_string());
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) -> Result<(), BusError> {
        self.broker.ensure_open()?;
        let mut state = lock(&self.broker.state);
        if !state.exchanges.contains(exchange) {
            return Err(BusError::Publish {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                reason: "no such exchange".into(),
            });
        }

        let delivery = Delivery::new(routing_key, body.to_vec());

        let mut targets: Vec<&str> = state
            .bindings
            .iter()
            .filter(|b| b.exchange == exchange && topic_matches(&b.pattern, routing_key))
            .map(|b| b.queue.as_str())
            .collect();
        targets.sort_unstable();
        targets.dedup();

        for queue in targets {
            if let Some(slot) = state.queues.get(queue) {
                // A dropped receiver means the consumer went away; the message is lost.
                let _ = slot.tx.send(delivery.clone());
            }
        }

        state.published.push((exchange.to_string(), delivery));
        Ok(())
    }

    async fn declare_anonymous_queue(&self) -> Result<String, BusError> {
        self.broker.ensure_open()?;
        let mut state = lock(&self.broker.state);
        state.next_queue += 1;
        let name = format!("amq.gen-{}", state.next_queue);
        let (tx, rx) = mpsc::unbounded_channel();
        state
            .queues
            .insert(name.clone(), QueueSlot { tx, rx: Some(rx) });
        Ok(name)
    }

    async fn bind_queue(&self, queue: &str, exchange: &str, pattern: &str) -> Result<(), BusError> {
        self.broker.ensure_open()?;
        let mut state = lock(&self.broker.state);
        let bind_err = |reason: &str| BusError::Bind {
            queue: queue.to_string(),
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };
        if !state.exchanges.contains(exchange) {
            return Err(bind_err("no such exchange"));
        }
        if !state.queues.contains_key(queue) {
            return Err(bind_err("no such queue"));
        }

        let binding = Binding {
            exchange: exchange.to_string(),
            queue: queue.to_string(),
            pattern: pattern.to_string(),
        };
        if !state.bindings.contains(&binding) {
            state.bindings.push(binding);
        }
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BusError> {
        self.broker.ensure_open()?;
        let mut state = lock(&self.broker.state);
        let slot = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| BusError::Consume(format!("no such queue: {queue}")))?;
        let rx = slot
            .rx
            .take()
            .ok_or_else(|| BusError::Consume(format!("queue {queue} already has a consumer")))?;

        Ok(UnboundedReceiverStream::new(rx).map(Ok).boxed())
    }
}
