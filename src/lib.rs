pub mod broker;
pub mod bus;
pub mod capability;
pub mod config;
mod envelope;
mod event;
pub mod retry;
pub mod telemetry;

pub use broker::{Capabilities, DispatchError, DispatchResponse, Dispatcher};
pub use bus::{BusConnection, BusError, EventConsumer, EventEmitter, InMemoryBroker};
pub use capability::{Reply, Transport, TransportError};
pub use envelope::{Action, ActionEnvelope, Credentials, MailRequest, ResponseEnvelope};
pub use event::LogEvent;
pub use retry::{Backoff, Exhausted, RetryPolicy};
