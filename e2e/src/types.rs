//! Shared types for the e2e test framework

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A mock response the Fish Audio stand-in will serve for the next request
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: Bytes,
    pub content_type: String,
    /// Extra headers, e.g. CORS headers the proxy must replace
    pub headers: Vec<(String, String)>,
}

impl MockResponse {
    /// JSON response with status 200
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: Bytes::from(body.into()),
            content_type: "application/json".to_string(),
            headers: Vec::new(),
        }
    }

    /// Audio response with status 200
    pub fn audio(content_type: &str, body: &'static [u8]) -> Self {
        Self {
            status: 200,
            body: Bytes::from_static(body),
            content_type: content_type.to_string(),
            headers: Vec::new(),
        }
    }

    /// Create an error response
    pub fn error(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Bytes::from(body.into()),
            content_type: "application/json".to_string(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Shared state for the mock Fish Audio server
#[derive(Debug, Default)]
pub struct BackendState {
    /// Queue of responses to serve - tests push responses, backend pops and serves them
    pub response_queue: VecDeque<MockResponse>,
    /// All requests received by the backend (for inspection)
    pub received_requests: Vec<ReceivedRequest>,
}

/// A request received by the mock backend
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub origin: Option<String>,
    pub body: Bytes,
}

impl ReceivedRequest {
    pub fn body_json(&self) -> anyhow::Result<serde_json::Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| anyhow::anyhow!("Forwarded body is not JSON: {}: {}", e, String::from_utf8_lossy(&self.body)))
    }
}

pub type SharedBackendState = Arc<Mutex<BackendState>>;

/// Result of a request through the proxy
#[derive(Debug)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    pub body: Bytes,
}

impl ProxyResponse {
    /// Header value as a string, if present and ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body parsed as JSON
    pub fn json(&self) -> anyhow::Result<serde_json::Value> {
        serde_json::from_slice(&self.body).map_err(|e| {
            anyhow::anyhow!(
                "Proxy response is not valid JSON: {}: {}",
                e,
                String::from_utf8_lossy(&self.body[..self.body.len().min(500)])
            )
        })
    }

    /// Get a nested JSON field using dot notation (e.g. "items.0._id")
    pub fn get_json(&self, path: &str) -> Option<serde_json::Value> {
        let body = self.json().ok()?;
        let mut current = &body;
        for part in path.split('.') {
            current = if let Ok(idx) = part.parse::<usize>() {
                current.as_array()?.get(idx)?
            } else {
                current.as_object()?.get(part)?
            };
        }
        Some(current.clone())
    }
}

/// Result of a single test case
#[derive(Debug)]
#[allow(dead_code)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
