mod loader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use loader::load_config;

/// Default Fish Audio API base URL
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.fish.audio";

/// Files tried, in order, when no config path is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["config.yaml", "config.yml", "config/config.yaml"];

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    BuiltIn,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::BuiltIn => write!(f, "built-in defaults"),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Proxy server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Largest inbound request body the server will buffer
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    3001
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Upstream text-to-speech API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL of the TTS API (e.g., "https://api.fish.audio")
    #[serde(default = "default_upstream_url")]
    pub url: String,
    /// Request timeout in seconds. Unset means the HTTP client default (no timeout).
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// TLS configuration options
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS configuration for upstream connections
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Accept invalid certificates (self-signed, expired)
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Path to custom CA certificate (PEM format)
    pub ca_cert_path: Option<String>,
    /// Path to client certificate for mTLS
    pub client_cert_path: Option<String>,
    /// Path to client private key for mTLS
    pub client_key_path: Option<String>,
}

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout_seconds: None,
            tls: None,
        }
    }
}

impl UpstreamConfig {
    /// Returns the base URL with trailing slash stripped
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Returns true if the URL uses HTTPS
    pub fn is_tls(&self) -> bool {
        self.url.to_lowercase().starts_with("https://")
    }
}

/// Stats logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsConfig {
    #[serde(default = "default_stats_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub format: StatsFormat,
}

fn default_stats_enabled() -> bool {
    true
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: default_stats_enabled(),
            format: StatsFormat::default(),
        }
    }
}

/// Stats output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StatsFormat {
    Pretty,
    Json,
    #[default]
    Compact,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Load configuration, searching the default locations when no path is given.
    ///
    /// An explicit path must exist. Without one, the first of
    /// `DEFAULT_CONFIG_PATHS` that exists is loaded, and finding none yields
    /// the built-in defaults.
    pub fn load_or_default(config_path: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        match config_path {
            Some(path) => Ok((Self::from_file(path)?, ConfigSource::File(path.to_path_buf()))),
            None => Self::search(DEFAULT_CONFIG_PATHS.iter().map(Path::new)),
        }
    }

    /// Load the first existing candidate, or defaults when none exists
    pub fn search<I, P>(candidates: I) -> Result<(Self, ConfigSource), ConfigError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                return Ok((Self::from_file(path)?, ConfigSource::File(path.to_path_buf())));
            }
        }
        Ok((Self::default(), ConfigSource::BuiltIn))
    }

    /// Check values serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.upstream.url).map_err(|e| {
            ConfigError::Validation(format!("upstream.url '{}': {}", self.upstream.url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "upstream.url must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.upstream.timeout_seconds == Some(0) {
            return Err(ConfigError::Validation(
                "upstream.timeout_seconds must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_config_default() {
        let config = UpstreamConfig::default();
        assert_eq!(config.url, "https://api.fish.audio");
        assert!(config.timeout_seconds.is_none());
        assert!(config.tls.is_none());
        assert!(config.is_tls());
    }

    #[test]
    fn test_upstream_config_trailing_slash() {
        let config = UpstreamConfig {
            url: "http://localhost:8080/".to_string(),
            ..UpstreamConfig::default()
        };
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert!(!config.is_tls());
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_stats_format_serde() {
        assert_eq!(serde_json::to_string(&StatsFormat::Pretty).unwrap(), "\"pretty\"");
        assert_eq!(serde_json::to_string(&StatsFormat::Json).unwrap(), "\"json\"");
        assert_eq!(serde_json::to_string(&StatsFormat::Compact).unwrap(), "\"compact\"");

        let parsed: StatsFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(parsed, StatsFormat::Json);
        assert_eq!(StatsFormat::default(), StatsFormat::Compact);
    }

    #[test]
    fn test_validate_default_config() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = AppConfig::default();
        config.upstream.url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config.upstream.url = "ftp://api.fish.audio".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = AppConfig::default();
        config.server.max_body_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.upstream.timeout_seconds = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound("test.yaml".to_string());
        assert!(err.to_string().contains("test.yaml"));

        let err = ConfigError::Parse(serde_yaml::from_str::<AppConfig>("[1, 2").unwrap_err());
        assert!(err.to_string().contains("parse"));

        let err = ConfigError::Validation("invalid URL".to_string());
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_load_or_default_with_path() {
        let result = AppConfig::load_or_default(Some(Path::new("/nonexistent/config.yaml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_search_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let candidates: Vec<PathBuf> = DEFAULT_CONFIG_PATHS.iter().map(|p| dir.path().join(p)).collect();

        let (config, source) = AppConfig::search(&candidates).unwrap();
        assert_eq!(source, ConfigSource::BuiltIn);
        assert_eq!(source.to_string(), "built-in defaults");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.upstream.url, DEFAULT_UPSTREAM_URL);
    }

    #[test]
    fn test_search_takes_first_existing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("config")).unwrap();
        std::fs::write(dir.path().join("config/config.yaml"), "server:\n  port: 9100\n").unwrap();
        std::fs::write(dir.path().join("config.yml"), "server:\n  port: 9200\n").unwrap();
        let candidates: Vec<PathBuf> = DEFAULT_CONFIG_PATHS.iter().map(|p| dir.path().join(p)).collect();

        let (config, source) = AppConfig::search(&candidates).unwrap();
        assert_eq!(config.server.port, 9200);
        assert_eq!(source, ConfigSource::File(dir.path().join("config.yml")));
    }

    #[test]
    fn test_search_reports_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "upstream:\n  url: \"ftp://example.com\"\n").unwrap();

        let result = AppConfig::search([&path]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
