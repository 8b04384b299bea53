//! HTTP client that simulates how the browser UI talks to the proxy

use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Method};

use crate::types::ProxyResponse;

/// Origin the simulated browser page is served from
pub const BROWSER_ORIGIN: &str = "http://localhost:5173";

/// Build an HTTP client (no connection pooling for test isolation)
pub fn build_client() -> Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .pool_max_idle_per_host(0)
        .build()
        .expect("Failed to build reqwest client")
}

/// A browser-style request to the proxy
pub struct Call<'a> {
    pub method: Method,
    pub path: &'a str,
    pub authorization: Option<&'a str>,
    pub body: Option<Bytes>,
}

impl<'a> Call<'a> {
    pub fn get(path: &'a str) -> Self {
        Self {
            method: Method::GET,
            path,
            authorization: None,
            body: None,
        }
    }

    pub fn post(path: &'a str, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path,
            authorization: None,
            body: Some(Bytes::from(body.to_string())),
        }
    }

    pub fn method(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            authorization: None,
            body: None,
        }
    }

    pub fn auth(mut self, authorization: &'a str) -> Self {
        self.authorization = Some(authorization);
        self
    }

    pub fn raw_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Send a request to the proxy and collect the full body
pub async fn send(client: &Client, proxy_addr: &str, call: Call<'_>) -> anyhow::Result<ProxyResponse> {
    let url = format!("http://{proxy_addr}{}", call.path);

    let mut builder = client
        .request(call.method.clone(), &url)
        .header("Origin", BROWSER_ORIGIN);
    if let Some(auth) = call.authorization {
        builder = builder.header("Authorization", auth);
    }
    if let Some(body) = call.body {
        builder = builder.header("Content-Type", "application/json").body(body);
    }

    let resp = builder
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send {} {} to proxy: {}", call.method, url, e))?;

    let status = resp.status().as_u16();
    let headers = resp.headers().clone();

    // Audio can be large; collect the stream the way a player would
    let mut stream = resp.bytes_stream();
    let mut all_bytes: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk.map_err(|e| anyhow::anyhow!("Stream read error: {}", e))?;
        all_bytes.extend_from_slice(&chunk);
    }

    Ok(ProxyResponse {
        status,
        headers,
        body: Bytes::from(all_bytes),
    })
}

/// Send a CORS preflight the way a browser does before a cross-origin POST
pub async fn send_preflight(client: &Client, proxy_addr: &str, path: &str) -> anyhow::Result<ProxyResponse> {
    let url = format!("http://{proxy_addr}{path}");

    let resp = client
        .request(Method::OPTIONS, &url)
        .header("Origin", BROWSER_ORIGIN)
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "authorization, content-type")
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send OPTIONS {}: {}", url, e))?;

    let status = resp.status().as_u16();
    let headers = resp.headers().clone();
    let body = resp
        .bytes()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read preflight response: {}", e))?;

    Ok(ProxyResponse { status, headers, body })
}
