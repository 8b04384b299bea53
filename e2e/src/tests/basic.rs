//! Basic proxy behavior - model listing and speech synthesis happy paths

use reqwest::Method;

use crate::backend::{drain_requests, queue_response, DEFAULT_AUDIO};
use crate::client::{send, Call};
use crate::runner::TestContext;
use crate::types::MockResponse;

use super::helpers::*;

/// GET /api/model returns the upstream model list verbatim
pub async fn test_model_list(ctx: TestContext) -> anyhow::Result<()> {
    let resp = send(&ctx.http_client, &ctx.proxy_addr, Call::get("/api/model").auth(API_KEY)).await?;

    assert_status(&resp, 200)?;
    assert_cors(&resp)?;
    let id = resp
        .get_json("items.0._id")
        .ok_or_else(|| anyhow::anyhow!("Missing items[0]._id"))?;
    assert_eq_str(id.as_str().unwrap_or(""), VOICE_ID, "model id")?;

    let reqs = drain_requests(&ctx.backend_state);
    assert_true(reqs.len() == 1, &format!("Expected 1 upstream request, got {}", reqs.len()))?;
    assert_eq_str(&reqs[0].method, "GET", "upstream method")?;
    assert_eq_str(&reqs[0].path, "/model", "upstream path")?;
    assert_true(reqs[0].body.is_empty(), "GET to upstream must not carry a body")?;

    Ok(())
}

/// POST /api/tts returns exactly the audio bytes upstream produced
pub async fn test_tts_returns_audio_bytes(ctx: TestContext) -> anyhow::Result<()> {
    let resp = send(
        &ctx.http_client,
        &ctx.proxy_addr,
        Call::post("/api/tts", tts_request("Hello from the proxy")).auth(API_KEY),
    )
    .await?;

    assert_status(&resp, 200)?;
    assert_cors(&resp)?;
    assert_eq_str(resp.header("content-type").unwrap_or(""), "audio/mpeg", "content-type")?;
    assert_true(
        resp.body.as_ref() == DEFAULT_AUDIO,
        &format!("Audio bytes changed in transit: {:02x?}", &resp.body[..resp.body.len().min(16)]),
    )?;

    let reqs = drain_requests(&ctx.backend_state);
    assert_true(!reqs.is_empty(), "Backend received no request")?;
    assert_eq_str(&reqs[0].method, "POST", "upstream method")?;
    assert_eq_str(&reqs[0].path, "/v1/tts", "upstream path")?;
    assert_eq_str(reqs[0].content_type.as_deref().unwrap_or(""), "application/json", "upstream content-type")?;

    Ok(())
}

/// The synthesis body reaches upstream unchanged, options included
pub async fn test_tts_body_forwarded(ctx: TestContext) -> anyhow::Result<()> {
    queue_response(&ctx.backend_state, MockResponse::audio("audio/ogg", DEFAULT_AUDIO));

    let request = tts_request_full("Every option set");
    let resp = send(
        &ctx.http_client,
        &ctx.proxy_addr,
        Call::post("/api/tts", request.clone()).auth(API_KEY),
    )
    .await?;

    assert_status(&resp, 200)?;
    assert_eq_str(resp.header("content-type").unwrap_or(""), "audio/ogg", "content-type")?;

    let reqs = drain_requests(&ctx.backend_state);
    assert_true(!reqs.is_empty(), "Backend received no request")?;
    let forwarded = reqs[0].body_json()?;
    assert_true(
        forwarded == request,
        &format!("Forwarded body differs.\n  sent:      {}\n  forwarded: {}", request, forwarded),
    )?;

    Ok(())
}

/// Option values the proxy does not know are still the upstream's to judge
pub async fn test_tts_open_options_forwarded(ctx: TestContext) -> anyhow::Result<()> {
    let bodies = [
        r#"{"text":"hi","latency":"low"}"#,
        r#"{"text":"hi","format":"aac"}"#,
        r#"{"text":"hi","mp3_bitrate":128.0}"#,
        r#"{"text":""}"#,
    ];

    for body in bodies {
        let call = Call::method(Method::POST, "/api/tts").auth(API_KEY).raw_body(body);
        let resp = send(&ctx.http_client, &ctx.proxy_addr, call).await?;
        assert_status(&resp, 200).map_err(|e| anyhow::anyhow!("{}: {}", body, e))?;

        let reqs = drain_requests(&ctx.backend_state);
        assert_true(reqs.len() == 1, &format!("{}: expected 1 upstream request, got {}", body, reqs.len()))?;
        assert_eq_str(&String::from_utf8_lossy(&reqs[0].body), body, "forwarded body")?;
    }

    Ok(())
}

/// All three URL shapes reach the same upstream endpoint
pub async fn test_route_shapes(ctx: TestContext) -> anyhow::Result<()> {
    for path in ["/api/model", "/proxy/model", "/api/proxy?endpoint=model"] {
        let resp = send(&ctx.http_client, &ctx.proxy_addr, Call::get(path).auth(API_KEY)).await?;
        assert_status(&resp, 200).map_err(|e| anyhow::anyhow!("{}: {}", path, e))?;
    }

    let reqs = drain_requests(&ctx.backend_state);
    assert_true(reqs.len() == 3, &format!("Expected 3 upstream requests, got {}", reqs.len()))?;
    assert_true(
        reqs.iter().all(|r| r.path == "/model"),
        "Every route shape should map to /model upstream",
    )?;

    Ok(())
}

/// The proxy's own /health answers without touching upstream
pub async fn test_health(ctx: TestContext) -> anyhow::Result<()> {
    let resp = send(&ctx.http_client, &ctx.proxy_addr, Call::get("/health")).await?;

    assert_status(&resp, 200)?;
    assert_eq_str(String::from_utf8_lossy(&resp.body).trim(), "OK", "health body")?;
    assert_true(drain_requests(&ctx.backend_state).is_empty(), "/health must not reach upstream")?;

    Ok(())
}
