//! HTTP entry point for the broker.
//!
//! Requires a running tokio runtime. Uses axum for routing.
//!
//! ## Routes
//!
//! - `POST /` - liveness echo.
//! - `GET /ping` - heartbeat.
//! - `POST /handle` - dispatch an action envelope.
//! - `POST /log-grpc` - deliver the envelope's `log` payload over gRPC.
//! - `POST /log-event` - push the envelope's `log` payload onto the event bus.
//!
//! Malformed bodies are answered with a 400 error envelope.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::dispatcher::{DispatchResponse, Dispatcher};
use super::error::DispatchError;
use crate::envelope::{ActionEnvelope, ResponseEnvelope};

/// Build an axum `Router` that serves the given dispatcher.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(300));

    Router::new()
        .route("/", post(broker_handler))
        .route("/ping", get(ping_handler))
        .route("/handle", post(handle_submission))
        .route("/log-grpc", post(log_via_grpc))
        .route("/log-event", post(log_via_event))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

/// Serve the broker over HTTP at the given address (e.g. `"0.0.0.0:8080"`).
pub async fn serve(dispatcher: Arc<Dispatcher>, addr: &str) -> Result<(), std::io::Error> {
    let app = router(dispatcher);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "broker listening");
    axum::serve(listener, app).await
}

impl IntoResponse for DispatchResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

/// `POST /` - returns `{ "error": false, "message": "Hit the Broker" }`.
async fn broker_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(ResponseEnvelope::ok("Hit the Broker")))
}

/// `GET /ping` - plain-text heartbeat.
async fn ping_handler() -> &'static str {
    "."
}

/// `POST /handle` - dispatch on the envelope's `action`.
async fn handle_submission(
    State(dispatcher): State<Arc<Dispatcher>>,
    payload: Result<Json<ActionEnvelope>, JsonRejection>,
) -> DispatchResponse {
    match decode(payload) {
        Ok(envelope) => dispatcher.handle(envelope).await,
        Err(err) => err.into(),
    }
}

/// `POST /log-grpc` - force the gRPC log transport.
async fn log_via_grpc(
    State(dispatcher): State<Arc<Dispatcher>>,
    payload: Result<Json<ActionEnvelope>, JsonRejection>,
) -> DispatchResponse {
    match decode(payload) {
        Ok(envelope) => dispatcher.log_via_grpc(envelope).await,
        Err(err) => err.into(),
    }
}

/// `POST /log-event` - publish to the event fabric.
async fn log_via_event(
    State(dispatcher): State<Arc<Dispatcher>>,
    payload: Result<Json<ActionEnvelope>, JsonRejection>,
) -> DispatchResponse {
    match decode(payload) {
        Ok(envelope) => dispatcher.log_via_event(envelope).await,
        Err(err) => err.into(),
    }
}

fn decode(payload: Result<Json<ActionEnvelope>, JsonRejection>) -> Result<ActionEnvelope, DispatchError> {
    payload.map(|Json(envelope)| envelope).map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "malformed request body");
        DispatchError::Decode(rejection.body_text())
    })
}
