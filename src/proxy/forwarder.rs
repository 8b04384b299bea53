//! The forwarding core shared by every hosting adapter
//!
//! `Forwarder::handle` maps one inbound `ProxyRequest` to one `ProxyResponse`,
//! issuing at most one upstream call. It never fails: every error becomes a
//! JSON error response carrying the CORS header set.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;

use super::cors::{apply_cors, cors_headers};
use super::encoding::decompress_body;
use super::endpoint::{Endpoint, EndpointMap};
use super::upstream::{Upstream, UpstreamRequest, UpstreamResponse};
use crate::api::TtsRequest;
use crate::config::{StatsConfig, StatsFormat};
use crate::error::ProxyError;
use crate::stats::{format_metrics, format_tts_log, RequestMetrics};

/// Inbound request, already lifted out of the hosting shim
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Logical endpoint name as the adapter found it (query, path segment or route)
    pub endpoint: Option<String>,
    /// Caller's `Authorization`, kept as raw header bytes
    pub authorization: Option<HeaderValue>,
    pub body: Option<Bytes>,
}

impl ProxyRequest {
    pub fn new(method: Method, endpoint: Option<&str>) -> Self {
        Self {
            method,
            endpoint: endpoint.map(str::to_string),
            authorization: None,
            body: None,
        }
    }

    pub fn with_authorization(mut self, authorization: HeaderValue) -> Self {
        self.authorization = Some(authorization);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Outbound response, before the adapter serializes it
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// How an adapter delivers `ProxyResponse::body`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Raw,
    Base64,
}

impl ProxyResponse {
    /// 200 with an empty body and only CORS headers
    pub fn preflight() -> Self {
        Self {
            status: StatusCode::OK,
            headers: cors_headers(),
            body: Bytes::new(),
        }
    }

    /// JSON error response for a failed request
    pub fn from_error(error: &ProxyError) -> Self {
        let mut headers = cors_headers();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let ProxyError::MethodNotAllowed { endpoint, .. } = error {
            if let Ok(allow) = HeaderValue::from_str(&format!("{}, OPTIONS", endpoint.method())) {
                headers.insert(header::ALLOW, allow);
            }
        }
        Self {
            status: error.status(),
            headers,
            body: Bytes::from(error.body().to_bytes()),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
    }

    /// Body serialized for transports that can only carry text
    pub fn body_as(&self, encoding: BodyEncoding) -> String {
        match encoding {
            BodyEncoding::Raw => String::from_utf8_lossy(&self.body).into_owned(),
            BodyEncoding::Base64 => STANDARD.encode(&self.body),
        }
    }
}

/// Stateless forwarding proxy
#[derive(Clone)]
pub struct Forwarder {
    upstream: Arc<dyn Upstream>,
    endpoints: EndpointMap,
    stats: StatsConfig,
}

impl Forwarder {
    pub fn new(upstream: Arc<dyn Upstream>, endpoints: EndpointMap, stats: StatsConfig) -> Self {
        Self {
            upstream,
            endpoints,
            stats,
        }
    }

    pub fn endpoints(&self) -> &EndpointMap {
        &self.endpoints
    }

    /// Handle one inbound request
    pub async fn handle(&self, request: ProxyRequest) -> ProxyResponse {
        let start = Instant::now();
        let mut metrics = RequestMetrics::new(request.method.as_str(), request.endpoint.as_deref());
        metrics.request_bytes = request.body.as_ref().map_or(0, Bytes::len);

        tracing::debug!(
            method = %request.method,
            endpoint = ?request.endpoint,
            has_auth = request.authorization.is_some(),
            "Processing request"
        );

        let response = match self.try_handle(request, &mut metrics).await {
            Ok(response) => response,
            Err(e) => {
                let status = e.status();
                if status.is_server_error() {
                    tracing::error!(status = %status, error = %e, "Request failed");
                } else {
                    tracing::warn!(status = %status, error = %e, "Request rejected");
                }
                ProxyResponse::from_error(&e)
            }
        };

        metrics.status = response.status.as_u16();
        metrics.response_bytes = response.body.len();
        metrics.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.log_metrics(&metrics);

        response
    }

    async fn try_handle(
        &self,
        request: ProxyRequest,
        metrics: &mut RequestMetrics,
    ) -> Result<ProxyResponse, ProxyError> {
        if request.method == Method::OPTIONS {
            return Ok(ProxyResponse::preflight());
        }

        let endpoint = resolve_endpoint(request.endpoint.as_deref())?;

        if request.method != endpoint.method() {
            return Err(ProxyError::MethodNotAllowed {
                endpoint,
                method: request.method.to_string(),
            });
        }

        let authorization = request
            .authorization
            .filter(|auth| !auth.as_bytes().iter().all(u8::is_ascii_whitespace))
            .ok_or(ProxyError::AuthRequired)?;

        let mut fallback_content_type = endpoint.default_content_type();
        let body = match endpoint {
            Endpoint::Model => None,
            Endpoint::Tts => {
                let bytes = request
                    .body
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| ProxyError::BadRequest("request body is required".to_string()))?;
                let tts = TtsRequest::parse(&bytes).map_err(ProxyError::BadRequest)?;
                tracing::info!("{}", format_tts_log(&tts));
                if let Some(format) = tts.audio_format() {
                    fallback_content_type = format.content_type();
                }
                Some(bytes)
            }
        };

        let upstream_request = self.build_upstream_request(endpoint, request.method, authorization, body);

        let upstream_start = Instant::now();
        let result = self.upstream.send(upstream_request).await;
        metrics.upstream_ms = Some(upstream_start.elapsed().as_secs_f64() * 1000.0);

        translate_response(endpoint, result?, fallback_content_type)
    }

    fn build_upstream_request(
        &self,
        endpoint: Endpoint,
        method: Method,
        authorization: HeaderValue,
        body: Option<Bytes>,
    ) -> UpstreamRequest {
        let url = self.endpoints.url(endpoint);

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::AUTHORIZATION, authorization);

        let body = if method == Method::GET { None } else { body };
        if let Some(ref bytes) = body {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        }

        tracing::debug!(url = %url, method = %method, "Building upstream request");

        UpstreamRequest {
            method,
            url,
            headers,
            body,
        }
    }

    fn log_metrics(&self, metrics: &RequestMetrics) {
        if !self.stats.enabled {
            return;
        }
        let formatted = format_metrics(metrics, self.stats.format);
        // Preflights and local rejections are noise at info level
        if !metrics.reached_upstream() {
            tracing::debug!("{}", formatted);
        } else if self.stats.format == StatsFormat::Pretty {
            tracing::info!("\n{}", formatted);
        } else {
            tracing::info!("{}", formatted);
        }
    }
}

fn resolve_endpoint(name: Option<&str>) -> Result<Endpoint, ProxyError> {
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(ProxyError::MissingEndpoint)?;
    Endpoint::from_name(name).ok_or_else(|| ProxyError::UnknownEndpoint(name.to_string()))
}

/// Headers never copied from upstream to the caller
fn is_passthrough_header(name: &HeaderName) -> bool {
    !(name == header::CONNECTION
        || name == header::TRANSFER_ENCODING
        || name == header::CONTENT_LENGTH
        || name == header::CONTENT_ENCODING
        || name == header::TE
        || name == header::TRAILER
        || name == header::UPGRADE
        || name == header::PROXY_AUTHENTICATE
        || name == header::SET_COOKIE
        || name.as_str() == "keep-alive"
        || name.as_str().starts_with("access-control-"))
}

fn translate_response(
    endpoint: Endpoint,
    upstream: UpstreamResponse,
    fallback_content_type: &'static str,
) -> Result<ProxyResponse, ProxyError> {
    let content_encoding = upstream
        .headers
        .get(header::CONTENT_ENCODING)
        .and_then(|ce| ce.to_str().ok());
    let body = decompress_body(&upstream.body, content_encoding).map_err(ProxyError::Internal)?;

    if !upstream.status.is_success() {
        let message = serde_json::from_slice::<serde_json::Value>(&body)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&body).into_owned()));
        tracing::warn!(
            endpoint = %endpoint,
            status = %upstream.status,
            error_body = %message,
            "Upstream returned error response"
        );
        return Err(ProxyError::Upstream {
            endpoint,
            status: upstream.status,
            message,
        });
    }

    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers.iter() {
        if is_passthrough_header(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(fallback_content_type));
    }
    apply_cors(&mut headers);

    tracing::debug!(
        endpoint = %endpoint,
        status = %upstream.status,
        body_size = body.len(),
        "Forwarding upstream response"
    );

    Ok(ProxyResponse {
        status: upstream.status,
        headers,
        body: Bytes::from(body),
    })
}
