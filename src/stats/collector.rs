//! Per-request metrics for proxied calls

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Collected metrics from one request/response cycle
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetrics {
    /// Unique request ID
    pub request_id: String,
    /// Timestamp of the request
    pub timestamp: DateTime<Utc>,
    /// Logical endpoint, or the raw name when it did not resolve
    pub endpoint: String,
    /// Inbound HTTP method
    pub method: String,
    /// Status returned to the caller
    pub status: u16,
    /// Inbound body size in bytes
    pub request_bytes: usize,
    /// Outbound body size in bytes
    pub response_bytes: usize,
    /// Time spent waiting on upstream, if it was called
    pub upstream_ms: Option<f64>,
    /// Total handling time
    pub duration_ms: f64,
}

impl RequestMetrics {
    /// Create a new metrics instance with defaults
    pub fn new(method: &str, endpoint: Option<&str>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            endpoint: endpoint.unwrap_or("-").to_string(),
            method: method.to_string(),
            status: 0,
            request_bytes: 0,
            response_bytes: 0,
            upstream_ms: None,
            duration_ms: 0.0,
        }
    }

    /// Whether upstream was contacted for this request
    pub fn reached_upstream(&self) -> bool {
        self.upstream_ms.is_some()
    }

    /// Audio throughput in KiB/s, only meaningful for tts
    pub fn throughput_kib_s(&self) -> Option<f64> {
        let ms = self.upstream_ms?;
        if ms <= 0.0 || self.response_bytes == 0 {
            return None;
        }
        Some(self.response_bytes as f64 / 1024.0 / (ms / 1000.0))
    }
}
