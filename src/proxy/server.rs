//! Standalone HTTP server adapter
//!
//! Exposes the forwarding core under every URL shape the hosted variants used:
//! `/api/{endpoint}`, `/proxy/{endpoint}` and `/api/proxy?endpoint={endpoint}`.
//! Bodies are delivered as raw bytes.

use axum::{
    body::{to_bytes, Body},
    extract::{Path, Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use super::endpoint::EndpointMap;
use super::forwarder::{Forwarder, ProxyRequest, ProxyResponse};
use super::upstream::HttpUpstream;
use crate::config::AppConfig;
use crate::error::ProxyError;

/// Shared state for the server
#[derive(Clone)]
pub struct ProxyState {
    pub forwarder: Forwarder,
    pub max_body_bytes: usize,
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Build a forwarder talking to the configured upstream over HTTP
pub fn build_forwarder(config: &AppConfig) -> Result<Forwarder, Box<dyn std::error::Error>> {
    let upstream = HttpUpstream::from_config(&config.upstream)?;
    Ok(Forwarder::new(
        Arc::new(upstream),
        EndpointMap::new(config.upstream.base_url()),
        config.stats.clone(),
    ))
}

/// Build the router; split out so tests can drive it without a socket
pub fn build_router(state: ProxyState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/proxy", any(query_handler))
        .route("/api/:endpoint", any(path_handler))
        .route("/proxy/:endpoint", any(path_handler))
        .fallback(fallback_handler)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the proxy server
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let forwarder = build_forwarder(&config)?;
    let state = ProxyState {
        forwarder,
        max_body_bytes: config.server.max_body_bytes,
    };
    let upstream_base = state.forwarder.endpoints().base_url().to_string();
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("fish-proxy listening on {}", addr);
    tracing::info!("Proxying to {}", upstream_base);
    tracing::info!("Routes: /api/{{model,tts}}, /proxy/{{model,tts}}, /api/proxy?endpoint=");

    Ok(axum::serve(listener, app).await?)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// `/api/{endpoint}` and `/proxy/{endpoint}`
async fn path_handler(
    State(state): State<ProxyState>,
    Path(endpoint): Path<String>,
    req: Request,
) -> Response {
    forward(&state, Some(endpoint), req).await
}

/// `/api/proxy?endpoint={endpoint}`
async fn query_handler(State(state): State<ProxyState>, req: Request) -> Response {
    let endpoint = req.uri().query().and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "endpoint")
            .map(|(_, value)| value.into_owned())
    });
    forward(&state, endpoint, req).await
}

/// Anything else: preflight still succeeds, every other method gets 404
async fn fallback_handler(State(state): State<ProxyState>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    forward(&state, Some(path), req).await
}

async fn forward(state: &ProxyState, endpoint: Option<String>, req: Request) -> Response {
    let method = req.method().clone();
    let authorization = authorization_header(req.headers());

    // Preflight is answered whatever the body holds
    let body = if method == Method::OPTIONS {
        Ok(bytes::Bytes::new())
    } else {
        read_body(req, state.max_body_bytes).await
    };
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected request body");
            return ProxyResponse::from_error(&e).into_response();
        }
    };

    let proxy_request = ProxyRequest {
        method,
        endpoint,
        authorization,
        body: (!body.is_empty()).then_some(body),
    };

    state.forwarder.handle(proxy_request).await.into_response()
}

fn authorization_header(headers: &HeaderMap) -> Option<HeaderValue> {
    headers.get(header::AUTHORIZATION).cloned()
}

async fn read_body(req: Request, limit: usize) -> Result<bytes::Bytes, ProxyError> {
    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(ProxyError::PayloadTooLarge(limit));
    }

    to_bytes(req.into_body(), limit).await.map_err(|e| {
        let inner = e.into_inner();
        if inner.is::<http_body_util::LengthLimitError>() {
            ProxyError::PayloadTooLarge(limit)
        } else {
            ProxyError::BadRequest(format!("Failed to read request body: {}", inner))
        }
    })
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    tracing::error!(panic = %detail, "Request handler panicked");
    ProxyResponse::from_error(&ProxyError::Internal(detail)).into_response()
}
