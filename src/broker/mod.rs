//! broker - single entry point that routes actions to downstream capabilities.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use broker_rust::broker::{self, Capabilities, Dispatcher};
//! use broker_rust::capability::{BusCapability, GrpcCapability, HttpCapability, RpcCapability};
//!
//! let dispatcher = Arc::new(Dispatcher::new(Capabilities {
//!     auth: Arc::new(HttpCapability::new("http://authentication-service/authenticate")),
//!     log: Arc::new(RpcCapability::new("logger-service:5001")),
//!     log_grpc: Arc::new(GrpcCapability::connect_lazy("http://logger-service:50001", timeout)?),
//!     log_event: Arc::new(BusCapability::new(emitter, "log.INFO")),
//!     mail: Arc::new(HttpCapability::new("http://mail-service/send")),
//! }));
//!
//! // Direct dispatch
//! let response = dispatcher.handle(ActionEnvelope::log(LogEvent::new("log", "hi"))).await;
//!
//! // HTTP transport
//! broker::serve(dispatcher, "0.0.0.0:8080").await?;
//! ```

mod dispatcher;
mod error;
mod http;

pub use dispatcher::{Capabilities, DispatchResponse, Dispatcher};
pub use error::DispatchError;
pub use http::{router, serve};
