//! Mock backend server that simulates the Fish Audio API
//!
//! Serves `GET /model` and `POST /v1/tts`, the two paths the proxy forwards to.
//! Tests pre-configure responses via SharedBackendState before each request.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::types::{BackendState, MockResponse, ReceivedRequest, SharedBackendState};

/// Smallest plausible MP3 frame header, enough to prove bytes survive untouched
pub const DEFAULT_AUDIO: &[u8] = &[0xFF, 0xFB, 0x90, 0x64, 0x00, 0x00, 0x0F, 0xF0, 0x00, 0x80, 0x7F, 0x01];

/// Default model list returned by /model
fn default_model_response() -> MockResponse {
    MockResponse::json(
        r#"{"total":1,"items":[{"_id":"0d1f38e6c3fe415d9c79583d6781774b","title":"Test Voice","type":"tts","state":"trained"}]}"#,
    )
}

/// Default audio returned by /v1/tts
fn default_tts_response() -> MockResponse {
    MockResponse::audio("audio/mpeg", DEFAULT_AUDIO)
}

/// Record the request and pop the next queued response
async fn serve(state: SharedBackendState, request: Request<Body>, default: fn() -> MockResponse) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let header_str = |name: header::HeaderName| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let authorization = header_str(header::AUTHORIZATION);
    let content_type = header_str(header::CONTENT_TYPE);
    let origin = header_str(header::ORIGIN);

    let body = axum::body::to_bytes(request.into_body(), 10 * 1024 * 1024)
        .await
        .unwrap_or_default();

    let received = ReceivedRequest {
        method,
        path,
        authorization,
        content_type,
        origin,
        body,
    };

    let mock_response = {
        let mut state = state.lock().unwrap();
        state.received_requests.push(received);
        state.response_queue.pop_front().unwrap_or_else(default)
    };

    let mut builder = Response::builder()
        .status(mock_response.status)
        .header("Content-Type", &mock_response.content_type);
    for (name, value) in &mock_response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.body(Body::from(mock_response.body)).unwrap().into_response()
}

/// Handle GET /model
async fn handle_model(State(state): State<SharedBackendState>, request: Request<Body>) -> Response {
    serve(state, request, default_model_response).await
}

/// Handle POST /v1/tts
async fn handle_tts(State(state): State<SharedBackendState>, request: Request<Body>) -> Response {
    serve(state, request, default_tts_response).await
}

/// Start the mock backend server and return the shared state handle
pub async fn start(port: u16) -> anyhow::Result<SharedBackendState> {
    let state: SharedBackendState = std::sync::Arc::new(std::sync::Mutex::new(BackendState::default()));

    let app = Router::new()
        .route("/model", get(handle_model))
        .route("/v1/tts", post(handle_tts))
        .with_state(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await
        .map_err(|e| anyhow::anyhow!("Failed to bind mock backend to {}: {}", addr, e))?;

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock backend server failed");
    });

    // Brief pause to let the server start accepting connections
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    Ok(state)
}

/// Helper to configure the next backend response
pub fn queue_response(state: &SharedBackendState, response: MockResponse) {
    state.lock().unwrap().response_queue.push_back(response);
}

/// Helper to get all requests received since last clear
pub fn drain_requests(state: &SharedBackendState) -> Vec<ReceivedRequest> {
    let mut s = state.lock().unwrap();
    s.received_requests.drain(..).collect()
}
