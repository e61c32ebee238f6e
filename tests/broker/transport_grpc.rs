//! gRPC adapter against a tonic `Logger` served in-process.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use broker_rust::capability::grpc::{logger_server, Logger, LogRequest, LogResponse};
use broker_rust::capability::GrpcCapability;
use broker_rust::{LogEvent, Transport, TransportError};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};

#[derive(Clone, Default)]
struct RecordingLogger {
    entries: Arc<Mutex<Vec<LogEvent>>>,
    delay: Option<Duration>,
}

#[tonic::async_trait]
impl Logger for RecordingLogger {
    async fn write_log(&self, request: Request<LogRequest>) -> Result<Response<LogResponse>, Status> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let entry = request
            .into_inner()
            .log_entry
            .ok_or_else(|| Status::invalid_argument("missing log entry"))?;
        if entry.name == "reject" {
            return Err(Status::internal("failed writing log"));
        }
        self.entries.lock().unwrap().push(entry.into());
        Ok(Response::new(LogResponse {
            message: "logged!".into(),
        }))
    }
}

/// Bind to port 0, spawn the gRPC server, and return its URL.
async fn start_server(logger: RecordingLogger) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(logger_server(logger))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn write_log_round_trip() {
    let logger = RecordingLogger::default();
    let url = start_server(logger.clone()).await;
    let grpc = GrpcCapability::connect_lazy(&url, Duration::from_secs(1)).unwrap();

    let reply = grpc.call(&LogEvent::new("grpc", "hello")).await.unwrap();

    assert_eq!(reply.message, "logged!");
    assert_eq!(
        *logger.entries.lock().unwrap(),
        vec![LogEvent::new("grpc", "hello")]
    );
}

#[tokio::test]
async fn server_status_is_grpc_error() {
    let url = start_server(RecordingLogger::default()).await;
    let grpc = GrpcCapability::connect_lazy(&url, Duration::from_secs(1)).unwrap();

    let err = grpc.call(&LogEvent::new("reject", "x")).await.unwrap_err();

    assert!(matches!(err, TransportError::Grpc(ref m) if m.contains("failed writing log")));
}

#[tokio::test]
async fn slow_logger_hits_deadline() {
    let logger = RecordingLogger {
        delay: Some(Duration::from_secs(2)),
        ..Default::default()
    };
    let url = start_server(logger).await;
    let grpc = GrpcCapability::connect_lazy(&url, Duration::from_millis(100)).unwrap();

    let err = grpc.call(&LogEvent::new("log", "x")).await.unwrap_err();

    assert!(matches!(err, TransportError::Timeout(_)));
}

#[tokio::test]
async fn invalid_endpoint_is_rejected_up_front() {
    let err = GrpcCapability::connect_lazy("not a url", Duration::from_secs(1)).unwrap_err();

    assert!(matches!(err, TransportError::Request(_)));
}
