//! Common test helpers and JSON builders

use serde_json::{json, Value};

use crate::types::ProxyResponse;

pub const API_KEY: &str = "Bearer e2e-test-key";
pub const VOICE_ID: &str = "0d1f38e6c3fe415d9c79583d6781774b";

// ─── Request builders ────────────────────────────────────────────────────────

/// Minimal synthesis request the UI sends
pub fn tts_request(text: &str) -> Value {
    json!({
        "text": text,
        "reference_id": VOICE_ID,
    })
}

/// Synthesis request with every option the UI exposes
pub fn tts_request_full(text: &str) -> Value {
    json!({
        "text": text,
        "reference_id": VOICE_ID,
        "format": "opus",
        "normalize": true,
        "mp3_bitrate": 128,
        "opus_bitrate": 32,
        "latency": "balanced"
    })
}

// ─── Assertion helpers ────────────────────────────────────────────────────────

/// Assert two strings are equal, with context on failure
pub fn assert_eq_str(actual: &str, expected: &str, label: &str) -> anyhow::Result<()> {
    if actual != expected {
        Err(anyhow::anyhow!("{label}: expected {:?} but got {:?}", expected, actual))
    } else {
        Ok(())
    }
}

/// Assert condition is true, with message
pub fn assert_true(cond: bool, msg: &str) -> anyhow::Result<()> {
    if !cond {
        Err(anyhow::anyhow!("{}", msg))
    } else {
        Ok(())
    }
}

/// Assert the response status
pub fn assert_status(resp: &ProxyResponse, expected: u16) -> anyhow::Result<()> {
    assert_true(
        resp.status == expected,
        &format!(
            "Expected status {}, got {}: {}",
            expected,
            resp.status,
            String::from_utf8_lossy(&resp.body[..resp.body.len().min(300)])
        ),
    )
}

/// Assert the three permissive CORS headers the browser relies on
pub fn assert_cors(resp: &ProxyResponse) -> anyhow::Result<()> {
    let origin = resp.header("access-control-allow-origin").unwrap_or("<missing>");
    assert_eq_str(origin, "*", "access-control-allow-origin")?;
    let methods = resp.header("access-control-allow-methods").unwrap_or("<missing>");
    assert_eq_str(methods, "GET, POST, PUT, DELETE, OPTIONS", "access-control-allow-methods")?;
    let headers = resp.header("access-control-allow-headers").unwrap_or("<missing>");
    assert_eq_str(headers, "Content-Type, Authorization", "access-control-allow-headers")?;
    Ok(())
}

/// Assert a proxy-generated `{"error": ...}` body
pub fn assert_error_body(resp: &ProxyResponse, expected: &str) -> anyhow::Result<()> {
    let error = resp.get_json("error");
    assert_true(
        error.as_ref().and_then(|v| v.as_str()) == Some(expected),
        &format!("Expected error {:?}, got body {:?}", expected, String::from_utf8_lossy(&resp.body)),
    )
}
