//! The process-wide broker connection handle.

use std::future::Future;
use std::sync::Arc;

use super::{Broker, BusChannel, BusError};
use crate::retry::RetryPolicy;

/// Owns the single broker connection shared by emitters and consumers.
///
/// Established once at startup with bounded retries, handed by reference to
/// `EventEmitter::new` / `EventConsumer::new`, and closed at shutdown. It is
/// not re-established if the broker drops an established connection.
#[derive(Clone)]
pub struct BusConnection {
    broker: Arc<dyn Broker>,
}

impl BusConnection {
    /// Wrap an already-connected broker.
    pub fn from_broker(broker: impl Broker + 'static) -> Self {
        Self {
            broker: Arc::new(broker),
        }
    }

    /// Dial through `dial`, retrying according to `policy`.
    ///
    /// Returns `BusError::ConnectionExhausted` once the budget is spent; the
    /// caller is expected to treat that as fatal.
    pub async fn establish<B, F, Fut>(policy: &RetryPolicy, dial: F) -> Result<Self, BusError>
    where
        B: Broker + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<B, BusError>>,
    {
        match policy.retry("bus connect", dial).await {
            Ok(broker) => Ok(Self::from_broker(broker)),
            Err(exhausted) => Err(BusError::ConnectionExhausted {
                attempts: exhausted.attempts,
                last_error: Box::new(exhausted.last_error),
            }),
        }
    }

    /// Connect to an AMQP broker at `url`.
    #[cfg(feature = "amqp")]
    pub async fn connect(url: &str, policy: &RetryPolicy) -> Result<Self, BusError> {
        tracing::info!(url = %redact(url), "connecting to message bus");
        Self::establish(policy, || super::AmqpBroker::dial(url)).await
    }

    pub async fn open_channel(&self) -> Result<Box<dyn BusChannel>, BusError> {
        self.broker.open_channel().await
    }

    pub async fn close(&self) -> Result<(), BusError> {
        self.broker.close().await
    }
}

/// Strip credentials from an AMQP URL before logging it.
#[cfg(feature = "amqp")]
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => format!("{}://***@{}", &url[..scheme], &url[at + 1..]),
        _ => url.to_string(),
    }
}
