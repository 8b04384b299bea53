//! fish-proxy: pass-through proxy for the Fish Audio text-to-speech API
//!
//! Sits between a browser UI and api.fish.audio and provides:
//! - Permissive CORS and local preflight handling
//! - Authorization passthrough for model listing and speech synthesis
//! - A serverless-function entry point (`invoke`) with base64 audio bodies

use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

use fish_proxy::{
    api::ModelList,
    config::{AppConfig, ConfigSource},
    proxy::{build_forwarder, invoke, Endpoint, EndpointMap, FunctionEvent},
    run_server,
};

#[derive(Parser)]
#[command(name = "fish-proxy")]
#[command(version = "0.1.0")]
#[command(about = "CORS-normalizing proxy for the Fish Audio TTS API")]
#[command(long_about = "
fish-proxy forwards browser requests to the Fish Audio API:
  - GET  /api/model  -> GET  https://api.fish.audio/model
  - POST /api/tts    -> POST https://api.fish.audio/v1/tts
The same endpoints are also served under /proxy/<endpoint> and
/api/proxy?endpoint=<endpoint>.

Example usage:
  fish-proxy run --port 3001
  fish-proxy test-upstream --token $FISH_API_KEY
  fish-proxy invoke --event event.json
")]
struct Cli {
    /// Path to config file (default: search config.yaml, config.yml, config/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server
    Run {
        /// Override listen port
        #[arg(short, long)]
        port: Option<u16>,
        /// Override listen host
        #[arg(long)]
        host: Option<String>,
        /// Override upstream URL (e.g., "https://api.fish.audio")
        #[arg(long)]
        upstream_url: Option<String>,
    },

    /// Handle one serverless-function event and print the result as JSON
    Invoke {
        /// Event file; reads stdin when omitted
        #[arg(short, long)]
        event: Option<PathBuf>,
    },

    /// List the endpoint map
    ListEndpoints,

    /// Validate configuration file
    CheckConfig,

    /// Test connection to the upstream API with an API key
    TestUpstream {
        /// Fish Audio API key (sent as "Bearer <token>")
        #[arg(long, env = "FISH_API_KEY")]
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level_filter = if let Some(level) = cli.log_level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            .to_string()
    };

    // stdout is reserved for the invoke result
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&level_filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            port,
            host,
            upstream_url,
        } => {
            run_proxy(cli.config.as_deref(), port, host, upstream_url).await?;
        }
        Commands::Invoke { event } => {
            invoke_function(cli.config.as_deref(), event).await?;
        }
        Commands::ListEndpoints => {
            list_endpoints(cli.config.as_deref());
        }
        Commands::CheckConfig => {
            check_config(cli.config.as_deref());
        }
        Commands::TestUpstream { token } => {
            test_upstream(cli.config.as_deref(), &token).await?;
        }
    }

    Ok(())
}

/// Run the proxy server
async fn run_proxy(
    config_path: Option<&Path>,
    port_override: Option<u16>,
    host_override: Option<String>,
    upstream_url_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config_or_exit(config_path);

    if let Some(port) = port_override {
        config.server.port = port;
    }
    if let Some(host) = host_override {
        config.server.host = host;
    }
    if let Some(url) = upstream_url_override {
        config.upstream.url = url;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    run_server(config).await
}

/// Run the function adapter once
async fn invoke_function(
    config_path: Option<&Path>,
    event_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_or_exit(config_path);

    let raw = match event_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let event: FunctionEvent = serde_json::from_str(&raw)?;

    let forwarder = build_forwarder(&config)?;
    let result = invoke(&forwarder, event).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Print the endpoint map
fn list_endpoints(config_path: Option<&Path>) {
    let config = load_config_or_exit(config_path);
    let map = EndpointMap::new(config.upstream.base_url());

    println!("Endpoint map:\n");
    for endpoint in Endpoint::ALL {
        println!(
            "  {:6} {:5} -> {}",
            endpoint.name(),
            endpoint.method().as_str(),
            map.url(endpoint)
        );
    }
    println!("\nOPTIONS on any path is answered locally with CORS headers.");
}

/// Validate configuration file
fn check_config(config_path: Option<&Path>) {
    match AppConfig::load_or_default(config_path) {
        Ok((config, source)) => {
            match source {
                ConfigSource::File(path) => println!("✓ Configuration file is valid: {}\n", path.display()),
                ConfigSource::BuiltIn => println!("✓ No config file found, using built-in defaults\n"),
            }
            println!("Server:");
            println!("  Listen: {}:{}", config.server.host, config.server.port);
            println!("  Max body: {} bytes", config.server.max_body_bytes);
            println!("\nUpstream:");
            println!("  URL: {}", config.upstream.base_url());
            println!("  TLS: {}", if config.upstream.is_tls() { "enabled" } else { "disabled" });
            if let Some(ref tls) = config.upstream.tls {
                if tls.accept_invalid_certs {
                    println!("  TLS: Accepting invalid certificates");
                }
                if let Some(ref ca) = tls.ca_cert_path {
                    println!("  TLS CA: {}", ca);
                }
                if let Some(ref cert) = tls.client_cert_path {
                    println!("  TLS Client Cert: {}", cert);
                }
            }
            match config.upstream.timeout_seconds {
                Some(seconds) => println!("  Timeout: {}s", seconds),
                None => println!("  Timeout: client default"),
            }
            println!("\nStats:");
            println!("  Enabled: {}", config.stats.enabled);
            println!("  Format: {:?}", config.stats.format);
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Test connection to upstream
async fn test_upstream(config_path: Option<&Path>, token: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_or_exit(config_path);
    let model_url = EndpointMap::new(config.upstream.base_url()).url(Endpoint::Model);

    println!("Testing connection to upstream: {}", model_url);

    let client = fish_proxy::proxy::upstream::build_http_client(&config.upstream)?;

    match client
        .get(&model_url)
        .bearer_auth(token)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .send()
        .await
    {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                println!("✓ Upstream is reachable and the API key was accepted");
                println!("  Status: {}", status);
                if let Ok(list) = resp.json::<ModelList>().await {
                    let total = list.total.unwrap_or(list.items.len() as u64);
                    println!("  Available models: {}", total);
                    for model in list.items.iter().take(5) {
                        println!("    - {} {}", model.id, model.title.as_deref().unwrap_or(""));
                    }
                }
            } else {
                let body = resp.text().await.unwrap_or_default();
                println!("✗ Upstream returned error status: {}", status);
                println!("  Response: {}", body.trim());
                std::process::exit(1);
            }
        }
        Err(e) => {
            println!("✗ Failed to connect to upstream: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Load configuration or exit with error.
///
/// Without `--config`, the usual locations are searched and finding none
/// means "use defaults". A missing file the user named explicitly is an error.
fn load_config_or_exit(config_path: Option<&Path>) -> AppConfig {
    match AppConfig::load_or_default(config_path) {
        Ok((config, source)) => {
            tracing::info!("Configuration: {}", source);
            config
        }
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            eprintln!("\nYou can copy config.yaml.default and modify it:");
            eprintln!("  cp config.yaml.default config.yaml");
            std::process::exit(1);
        }
    }
}
