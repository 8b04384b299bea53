//! Stats formatting for different output formats

use super::RequestMetrics;
use crate::config::StatsFormat;

/// Format metrics according to the configured format
pub fn format_metrics(metrics: &RequestMetrics, format: StatsFormat) -> String {
    match format {
        StatsFormat::Pretty => format_pretty(metrics),
        StatsFormat::Json => format_json(metrics),
        StatsFormat::Compact => format_compact(metrics),
    }
}

/// Pretty box format for terminal output
fn format_pretty(m: &RequestMetrics) -> String {
    let upstream_str = match m.upstream_ms {
        Some(ms) => format!("{:.1}ms", ms),
        None => "not contacted".to_string(),
    };
    let throughput_str = m
        .throughput_kib_s()
        .map(|t| format!("{:.1} KiB/s", t))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        r#"┌──────────────────────────────────────────────────────────────────┐
│ Proxy Request Metrics                                            │
├──────────────────────────────────────────────────────────────────┤
│ Request:  {:53}│
│ Time:     {:53}│
│ Endpoint: {:53}│
│ Status:   {:53}│
├──────────────────────────────────────────────────────────────────┤
│ Bytes In:   {:10} │ Bytes Out: {:10}                   │
│ Upstream:   {:51}│
│ Throughput: {:51}│
│ Duration:   {:49.1}ms│
└──────────────────────────────────────────────────────────────────┘
"#,
        truncate(&m.request_id, 53),
        m.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        truncate(&format!("{} {}", m.method, m.endpoint), 53),
        m.status,
        m.request_bytes,
        m.response_bytes,
        upstream_str,
        throughput_str,
        m.duration_ms,
    )
}

/// JSON format for structured logging
fn format_json(m: &RequestMetrics) -> String {
    serde_json::to_string(m).unwrap_or_else(|_| "{}".to_string())
}

/// Compact single-line format
fn format_compact(m: &RequestMetrics) -> String {
    let upstream_str = match m.upstream_ms {
        Some(ms) => format!("upstream={:.1}ms", ms),
        None => "upstream=none".to_string(),
    };

    format!(
        "[{}] {} {} status={} in={}B out={}B {} dur={:.1}ms",
        m.timestamp.format("%H:%M:%S"),
        m.method,
        m.endpoint,
        m.status,
        m.request_bytes,
        m.response_bytes,
        upstream_str,
        m.duration_ms
    )
}

/// Truncate a string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
