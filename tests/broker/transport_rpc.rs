//! Binary RPC adapter against an in-process `serve_rpc` logger.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use broker_rust::capability::rpc::LOG_INFO_METHOD;
use broker_rust::capability::{serve_rpc, RpcCapability};
use broker_rust::{LogEvent, Transport, TransportError};
use tokio::net::TcpListener;

type Calls = Arc<Mutex<Vec<(String, LogEvent)>>>;

/// Start a fake logger that records its calls and fails on `data == "fail"`.
async fn start_logger() -> (String, Calls) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let calls: Calls = Arc::default();
    let recorded = calls.clone();

    tokio::spawn(serve_rpc(listener, move |method: String, event: LogEvent| {
        let recorded = recorded.clone();
        async move {
            recorded.lock().unwrap().push((method, event.clone()));
            if event.data == "fail" {
                Err("could not write log".to_string())
            } else {
                Ok(format!("Processed payload via RPC: {}", event.name))
            }
        }
    }));

    (addr, calls)
}

#[tokio::test]
async fn log_info_round_trip() {
    let (addr, calls) = start_logger().await;
    let rpc = RpcCapability::new(addr);

    let reply = rpc.call(&LogEvent::new("rpc", "hello")).await.unwrap();

    assert_eq!(reply.message, "Processed payload via RPC: rpc");
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, LOG_INFO_METHOD);
    assert_eq!(calls[0].1, LogEvent::new("rpc", "hello"));
}

#[tokio::test]
async fn sequential_calls_reuse_one_client() {
    let (addr, calls) = start_logger().await;
    let rpc = RpcCapability::new(addr);

    for i in 0..3 {
        rpc.call(&LogEvent::new("log", i.to_string())).await.unwrap();
    }

    assert_eq!(calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn server_error_is_remote_error() {
    let (addr, _) = start_logger().await;
    let rpc = RpcCapability::new(addr);

    let err = rpc.call(&LogEvent::new("log", "fail")).await.unwrap_err();

    assert!(matches!(err, TransportError::Remote(ref m) if m == "could not write log"));
}

#[tokio::test]
async fn custom_method_name_is_sent() {
    let (addr, calls) = start_logger().await;
    let rpc = RpcCapability::new(addr).method("RPCServer.LogError");

    rpc.call(&LogEvent::new("log", "x")).await.unwrap();

    assert_eq!(calls.lock().unwrap()[0].0, "RPCServer.LogError");
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    // Accept and hold the connection without answering.
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });
    let rpc = RpcCapability::new(addr).timeout(Duration::from_millis(50));

    let err = rpc.call(&LogEvent::new("log", "x")).await.unwrap_err();

    assert!(matches!(err, TransportError::Timeout(_)));
}

#[tokio::test]
async fn refused_connection_is_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    let rpc = RpcCapability::new(addr);

    let err = rpc.call(&LogEvent::new("log", "x")).await.unwrap_err();

    assert!(matches!(err, TransportError::Request(_)));
}
