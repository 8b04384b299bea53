//! Test registry - all test cases are registered here

pub mod basic;
pub mod helpers;

use crate::runner::TestCase;

/// Build and return all test cases
///
/// Tests are grouped by category. Each test:
/// 1. Optionally queues a mock Fish Audio response
/// 2. Sends a browser-style request to the REAL proxy
/// 3. Validates the response and what reached the mock upstream
pub fn all_tests() -> Vec<TestCase> {
    macro_rules! test {
        ($name:expr, $desc:expr, $func:path) => {
            TestCase {
                name: $name,
                description: $desc,
                run: Box::new(|ctx| Box::pin($func(ctx))),
            }
        };
    }

    vec![
        // ── Basic behavior ────────────────────────────────────────────────────
        test!(
            "basic/model_list",
            "GET /api/model returns the upstream model list",
            basic::test_model_list
        ),
        test!(
            "basic/tts_audio_bytes",
            "POST /api/tts returns upstream audio byte-for-byte",
            basic::test_tts_returns_audio_bytes
        ),
        test!(
            "basic/tts_body_forwarded",
            "Synthesis options reach upstream unchanged",
            basic::test_tts_body_forwarded
        ),
        test!(
            "basic/tts_open_options",
            "Unknown format/latency values and float bitrates are forwarded",
            basic::test_tts_open_options_forwarded
        ),
        test!(
            "basic/route_shapes",
            "/api/<e>, /proxy/<e> and /api/proxy?endpoint=<e> are equivalent",
            basic::test_route_shapes
        ),
        test!(
            "basic/health",
            "/health is answered by the proxy itself",
            basic::test_health
        ),

        // ── Pass-through ───────────────────────────────────────────────────────
        test!(
            "passthrough/authorization",
            "Authorization is forwarded verbatim, browser headers are not",
            passthrough::test_authorization_forwarded
        ),
        test!(
            "passthrough/upstream_error_wrapped",
            "Upstream 402 keeps its status, body nested under message",
            passthrough::test_upstream_error_wrapped
        ),
        test!(
            "passthrough/upstream_unauthorized_model",
            "Upstream 401 on /model is wrapped as a Fish Audio API error",
            passthrough::test_upstream_unauthorized_model
        ),
        test!(
            "passthrough/upstream_text_error",
            "Non-JSON upstream error body becomes a string message",
            passthrough::test_upstream_text_error
        ),
        test!(
            "passthrough/cors_replaced",
            "Upstream CORS headers are replaced by the proxy's",
            passthrough::test_upstream_cors_replaced
        ),
        test!(
            "passthrough/preflight",
            "OPTIONS on any path is answered locally with CORS headers",
            passthrough::test_preflight
        ),

        // ── Local validation ────────────────────────────────────────────────────
        test!(
            "validation/unknown_endpoint",
            "Unknown endpoint names return 404",
            validation::test_unknown_endpoint
        ),
        test!(
            "validation/missing_endpoint",
            "/api/proxy without ?endpoint= returns 400",
            validation::test_missing_endpoint
        ),
        test!(
            "validation/method_not_allowed",
            "Wrong method returns 405 with Allow",
            validation::test_method_not_allowed
        ),
        test!(
            "validation/missing_authorization",
            "Missing Authorization returns 401 on both endpoints",
            validation::test_missing_authorization
        ),
        test!(
            "validation/invalid_tts_body",
            "Malformed synthesis bodies return 400",
            validation::test_invalid_tts_body
        ),
    ]
}
