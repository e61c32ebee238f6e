//! In-process fakes for every capability the dispatcher routes to.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use broker_rust::{Capabilities, Dispatcher, Reply, Transport, TransportError};

type Outcome = Box<dyn Fn() -> Result<Reply, TransportError> + Send + Sync>;

/// Transport that records each request and answers with a fixed outcome.
pub struct Fake<Req> {
    calls: AtomicUsize,
    requests: Mutex<Vec<Req>>,
    outcome: Outcome,
}

impl<Req> Fake<Req> {
    pub fn replying(message: &'static str) -> Arc<Self> {
        Self::with(move || Ok(Reply::new(message)))
    }

    pub fn failing(make: impl Fn() -> TransportError + Send + Sync + 'static) -> Arc<Self> {
        Self::with(move || Err(make()))
    }

    pub fn with(
        outcome: impl Fn() -> Result<Reply, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            outcome: Box::new(outcome),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<Req: Clone> Fake<Req> {
    pub fn requests(&self) -> Vec<Req> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl<Req> Transport<Req> for Fake<Req>
where
    Req: Clone + Send + Sync,
{
    fn kind(&self) -> &'static str {
        "fake"
    }

    async fn call(&self, request: &Req) -> Result<Reply, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        (self.outcome)()
    }
}

/// One fake per capability, kept so tests can inspect them after dispatch.
pub struct Fakes {
    pub auth: Arc<Fake<broker_rust::Credentials>>,
    pub log: Arc<Fake<broker_rust::LogEvent>>,
    pub log_grpc: Arc<Fake<broker_rust::LogEvent>>,
    pub log_event: Arc<Fake<broker_rust::LogEvent>>,
    pub mail: Arc<Fake<broker_rust::MailRequest>>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            auth: Fake::replying("Authenticated!"),
            log: Fake::replying("logged via rpc"),
            log_grpc: Fake::replying("logged"),
            log_event: Fake::replying(""),
            mail: Fake::replying("sent"),
        }
    }
}

impl Fakes {
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Capabilities {
            auth: self.auth.clone(),
            log: self.log.clone(),
            log_grpc: self.log_grpc.clone(),
            log_event: self.log_event.clone(),
            mail: self.mail.clone(),
        })
    }

    pub fn total_calls(&self) -> usize {
        self.auth.calls()
            + self.log.calls()
            + self.log_grpc.calls()
            + self.log_event.calls()
            + self.mail.calls()
    }
}
