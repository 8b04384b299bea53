//! Logical endpoint names and the fixed upstream routes they map to

use axum::http::Method;
use std::fmt;

/// Caller-facing endpoint name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Voice model listing, also used as a connection test
    Model,
    /// Speech synthesis
    Tts,
}

impl Endpoint {
    pub const ALL: [Endpoint; 2] = [Endpoint::Model, Endpoint::Tts];

    /// Resolve a logical endpoint name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "model" => Some(Endpoint::Model),
            "tts" => Some(Endpoint::Tts),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Model => "model",
            Endpoint::Tts => "tts",
        }
    }

    /// Upstream path relative to the API base URL
    pub fn upstream_path(&self) -> &'static str {
        match self {
            Endpoint::Model => "/model",
            Endpoint::Tts => "/v1/tts",
        }
    }

    /// The only method accepted for this endpoint
    pub fn method(&self) -> Method {
        match self {
            Endpoint::Model => Method::GET,
            Endpoint::Tts => Method::POST,
        }
    }

    /// Content-Type assumed when upstream omits one on success
    pub fn default_content_type(&self) -> &'static str {
        match self {
            Endpoint::Model => "application/json",
            Endpoint::Tts => "audio/mpeg",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed mapping from logical endpoint to absolute upstream URL
#[derive(Debug, Clone)]
pub struct EndpointMap {
    base_url: String,
}

impl EndpointMap {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute upstream URL for an endpoint
    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.upstream_path())
    }
}

impl Default for EndpointMap {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_UPSTREAM_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Endpoint::from_name("model"), Some(Endpoint::Model));
        assert_eq!(Endpoint::from_name("tts"), Some(Endpoint::Tts));
        assert_eq!(Endpoint::from_name("TTS"), None);
        assert_eq!(Endpoint::from_name("voices"), None);
        assert_eq!(Endpoint::from_name(""), None);
    }

    #[test]
    fn test_default_map_urls() {
        let map = EndpointMap::default();
        assert_eq!(map.url(Endpoint::Model), "https://api.fish.audio/model");
        assert_eq!(map.url(Endpoint::Tts), "https://api.fish.audio/v1/tts");
    }

    #[test]
    fn test_custom_base_trailing_slash() {
        let map = EndpointMap::new("http://127.0.0.1:18080/");
        assert_eq!(map.url(Endpoint::Tts), "http://127.0.0.1:18080/v1/tts");
    }

    #[test]
    fn test_methods() {
        assert_eq!(Endpoint::Model.method(), Method::GET);
        assert_eq!(Endpoint::Tts.method(), Method::POST);
    }
}
