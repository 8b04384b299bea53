//! Serverless-function adapter
//!
//! Function hosts pass requests in as a JSON event and expect a JSON result
//! whose body is a string. Binary bodies travel as base64 with
//! `isBase64Encoded: true`; decoding them yields the exact upstream bytes.

use axum::http::{header, HeaderMap, HeaderValue, Method};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::forwarder::{BodyEncoding, Forwarder, ProxyRequest, ProxyResponse};
use crate::error::ProxyError;

/// Inbound function event
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEvent {
    pub http_method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

/// Function result handed back to the host
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResult {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl FunctionEvent {
    /// Header lookup, case-insensitive like HTTP
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Endpoint from `?endpoint=`, falling back to the last path segment
    pub fn endpoint(&self) -> Option<String> {
        let from_query = self
            .query_string_parameters
            .as_ref()
            .and_then(|params| params.get("endpoint"))
            .filter(|e| !e.is_empty());
        if let Some(endpoint) = from_query {
            return Some(endpoint.clone());
        }

        self.path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .last()
            .map(str::to_string)
    }

    /// Lift the event into the transport-independent request
    pub fn into_proxy_request(self) -> Result<ProxyRequest, ProxyError> {
        let method = Method::from_bytes(self.http_method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ProxyError::BadRequest(format!("invalid httpMethod '{}'", self.http_method)))?;
        let endpoint = self.endpoint();
        let authorization = self
            .header(header::AUTHORIZATION.as_str())
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|_| ProxyError::BadRequest("Authorization header is not valid".to_string()))?;

        let body = match self.body {
            Some(body) if self.is_base64_encoded => Some(
                STANDARD
                    .decode(body.as_bytes())
                    .map_err(|e| ProxyError::BadRequest(format!("body is not valid base64: {}", e)))?,
            ),
            Some(body) => Some(body.into_bytes()),
            None => None,
        }
        .filter(|b| !b.is_empty());

        Ok(ProxyRequest {
            method,
            endpoint,
            authorization,
            body: body.map(Into::into),
        })
    }
}

impl FunctionResult {
    /// Raw body bytes, undoing base64 if marked
    pub fn decoded_body(&self) -> Result<Vec<u8>, base64::DecodeError> {
        if self.is_base64_encoded {
            STANDARD.decode(self.body.as_bytes())
        } else {
            Ok(self.body.clone().into_bytes())
        }
    }
}

impl From<ProxyResponse> for FunctionResult {
    fn from(response: ProxyResponse) -> Self {
        let encoding = if is_text_body(&response) {
            BodyEncoding::Raw
        } else {
            BodyEncoding::Base64
        };

        Self {
            status_code: response.status.as_u16(),
            headers: flatten_headers(&response.headers),
            body: response.body_as(encoding),
            is_base64_encoded: encoding == BodyEncoding::Base64,
        }
    }
}

/// Run one event through the forwarder
pub async fn invoke(forwarder: &Forwarder, event: FunctionEvent) -> FunctionResult {
    let response = match event.into_proxy_request() {
        Ok(request) => forwarder.handle(request).await,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected function event");
            ProxyResponse::from_error(&e)
        }
    };
    FunctionResult::from(response)
}

/// Text is returned verbatim; anything else (audio) as base64
fn is_text_body(response: &ProxyResponse) -> bool {
    if response.body.is_empty() {
        return true;
    }
    let text_type = response
        .content_type()
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.starts_with("text/") || ct.contains("json")
        })
        .unwrap_or(false);
    text_type && std::str::from_utf8(&response.body).is_ok()
}

fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::forwarder::tests::{forwarder, MockUpstream, MP3_BYTES, TTS_BODY};
    use axum::http::StatusCode;
    use serde_json::json;

    fn event(value: serde_json::Value) -> FunctionEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_endpoint_resolution() {
        let e = event(json!({"httpMethod": "GET", "path": "/.netlify/functions/model"}));
        assert_eq!(e.endpoint().as_deref(), Some("model"));

        let e = event(json!({"httpMethod": "GET", "path": "/proxy/tts/"}));
        assert_eq!(e.endpoint().as_deref(), Some("tts"));

        let e = event(json!({
            "httpMethod": "GET",
            "path": "/api/proxy",
            "queryStringParameters": {"endpoint": "model"}
        }));
        assert_eq!(e.endpoint().as_deref(), Some("model"));

        let e = event(json!({"httpMethod": "GET", "path": "/", "queryStringParameters": null}));
        assert!(e.endpoint().is_none());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let e = event(json!({"httpMethod": "GET", "headers": {"authorization": "Bearer abc"}}));
        assert_eq!(e.header("Authorization"), Some("Bearer abc"));
    }

    #[test]
    fn test_authorization_kept_as_sent() {
        let e = event(json!({"httpMethod": "GET", "path": "/model", "headers": {"Authorization": "Bearer été"}}));
        let request = e.into_proxy_request().unwrap();
        assert_eq!(request.authorization.unwrap().as_bytes(), "Bearer été".as_bytes());

        let e = event(json!({"httpMethod": "GET", "path": "/model", "headers": {"Authorization": "Bearer a\nb"}}));
        assert!(matches!(e.into_proxy_request(), Err(ProxyError::BadRequest(_))));
    }

    #[test]
    fn test_base64_event_body_decoded() {
        let e = event(json!({
            "httpMethod": "post",
            "path": "/tts",
            "body": STANDARD.encode(TTS_BODY),
            "isBase64Encoded": true
        }));
        let request = e.into_proxy_request().unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body.unwrap(), TTS_BODY.as_bytes());
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let e = event(json!({"httpMethod": "POST", "path": "/tts", "body": "%%%", "isBase64Encoded": true}));
        assert!(matches!(e.into_proxy_request(), Err(ProxyError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_tts_returns_base64_audio() {
        let upstream = MockUpstream::replying(StatusCode::OK, "audio/mpeg", MP3_BYTES);
        let proxy = forwarder(upstream.clone());

        let result = invoke(
            &proxy,
            event(json!({
                "httpMethod": "POST",
                "path": "/.netlify/functions/tts",
                "headers": {"authorization": "Bearer abc", "host": "example.netlify.app"},
                "body": TTS_BODY
            })),
        )
        .await;

        assert_eq!(result.status_code, 200);
        assert!(result.is_base64_encoded);
        assert_eq!(result.headers["content-type"], "audio/mpeg");
        assert_eq!(result.headers["access-control-allow-origin"], "*");
        assert_eq!(result.decoded_body().unwrap(), MP3_BYTES);

        let call = upstream.last_call();
        assert_eq!(call.headers[header::AUTHORIZATION], "Bearer abc");
        assert!(call.headers.get(header::HOST).is_none());
    }

    #[tokio::test]
    async fn test_model_returns_json_text() {
        let upstream = MockUpstream::replying(StatusCode::OK, "application/json", br#"{"total":0,"items":[]}"#);
        let proxy = forwarder(upstream);

        let result = invoke(
            &proxy,
            event(json!({
                "httpMethod": "GET",
                "path": "/.netlify/functions/model",
                "headers": {"Authorization": "Bearer abc"}
            })),
        )
        .await;

        assert_eq!(result.status_code, 200);
        assert!(!result.is_base64_encoded);
        assert_eq!(result.body, r#"{"total":0,"items":[]}"#);
    }

    #[tokio::test]
    async fn test_preflight_result() {
        let upstream = MockUpstream::replying(StatusCode::OK, "application/json", b"{}");
        let proxy = forwarder(upstream.clone());

        let result = invoke(&proxy, event(json!({"httpMethod": "OPTIONS", "path": "/.netlify/functions/tts"}))).await;

        assert_eq!(result.status_code, 200);
        assert_eq!(result.body, "");
        assert!(!result.is_base64_encoded);
        assert_eq!(
            result.headers["access-control-allow-methods"],
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_method_and_auth_enforced() {
        let upstream = MockUpstream::replying(StatusCode::OK, "audio/mpeg", MP3_BYTES);
        let proxy = forwarder(upstream.clone());

        let result = invoke(&proxy, event(json!({"httpMethod": "GET", "path": "/tts"}))).await;
        assert_eq!(result.status_code, 405);
        assert_eq!(result.body, r#"{"error":"Method not allowed"}"#);

        let result = invoke(&proxy, event(json!({"httpMethod": "POST", "path": "/tts", "body": TTS_BODY}))).await;
        assert_eq!(result.status_code, 401);
        assert_eq!(upstream.call_count(), 0);
    }

    #[test]
    fn test_flatten_joins_repeated_headers() {
        let mut headers = HeaderMap::new();
        headers.append("vary", "origin".parse().unwrap());
        headers.append("vary", "accept".parse().unwrap());
        let flat = flatten_headers(&headers);
        assert_eq!(flat["vary"], "origin, accept");
    }
}
