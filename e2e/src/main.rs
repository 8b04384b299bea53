//! fish-proxy e2e test runner
//!
//! Starts a mock Fish Audio API, points a real fish-proxy process at it and
//! drives the proxy the way the browser UI does.
//!
//!   cargo run                          # find proxy binary, spawn it, run all tests
//!   cargo run -- list                  # list all tests
//!   cargo run -- run                   # use an already-running proxy
//!   cargo run -- spawn-and-run [opts]  # explicit binary / ports

mod backend;
mod client;
mod runner;
mod tests;
mod types;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tokio::process::{Child, Command as ProcessCommand};

use runner::{list_tests, run_tests, TestContext};
use tests::all_tests;

/// Proxy binary candidates, tried in order
const DEFAULT_PROXY_BINS: &[&str] = &["../target/release/fish-proxy", "../target/debug/fish-proxy"];

const DEFAULT_BACKEND_PORT: u16 = 18080;
const DEFAULT_PROXY_PORT: u16 = 18066;

#[derive(Parser)]
#[command(
    name = "e2e",
    about = "End-to-end tests for fish-proxy",
    long_about = "Runs every e2e test by default.\n\
                  The proxy is spawned with --port and --upstream-url overrides so it\n\
                  talks to the mock Fish Audio API instead of api.fish.audio."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Only run tests whose name contains this string
    #[arg(long, short, global = true)]
    filter: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Use a proxy that is already running (its upstream must be the mock port)
    Run {
        #[arg(long, default_value = "127.0.0.1:18066")]
        proxy_addr: String,

        /// Port for the mock Fish Audio API
        #[arg(long, default_value_t = DEFAULT_BACKEND_PORT)]
        backend_port: u16,
    },

    /// List all available tests
    List,

    /// Spawn the proxy, run the tests, stop the proxy
    SpawnAndRun {
        /// Path to the fish-proxy binary
        #[arg(long)]
        proxy_bin: Option<PathBuf>,

        /// Optional proxy config file; ports and upstream are still overridden
        #[arg(long)]
        proxy_config: Option<PathBuf>,

        #[arg(long, default_value_t = DEFAULT_BACKEND_PORT)]
        backend_port: u16,

        #[arg(long, default_value_t = DEFAULT_PROXY_PORT)]
        proxy_port: u16,
    },
}

/// A proxy child process, killed when dropped
struct ProxyProcess {
    child: Child,
    addr: String,
}

impl ProxyProcess {
    fn spawn(bin: &Path, config: Option<&Path>, proxy_port: u16, backend_port: u16) -> anyhow::Result<Self> {
        let mut cmd = ProcessCommand::new(bin);
        if let Some(config) = config {
            cmd.arg("--config").arg(config);
        }
        cmd.arg("--log-level")
            .arg("warn")
            .arg("run")
            .arg("--host")
            .arg("127.0.0.1")
            .arg("--port")
            .arg(proxy_port.to_string())
            .arg("--upstream-url")
            .arg(format!("http://127.0.0.1:{}", backend_port))
            .kill_on_drop(true);

        println!("Spawning proxy: {}", bin.display().to_string().bright_cyan());
        let child = cmd
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to spawn '{}': {}", bin.display(), e))?;

        Ok(Self {
            child,
            addr: format!("127.0.0.1:{}", proxy_port),
        })
    }

    /// Poll /health until the proxy answers or the child exits
    async fn wait_ready(&mut self) -> anyhow::Result<()> {
        let client = client::build_client();
        let health_url = format!("http://{}/health", self.addr);

        for attempt in 0..30u64 {
            if let Some(status) = self.child.try_wait()? {
                return Err(anyhow::anyhow!("Proxy exited before becoming ready ({})", status));
            }
            if client.get(&health_url).send().await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(std::time::Duration::from_millis(100 + attempt * 50)).await;
        }

        Err(anyhow::anyhow!("Proxy did not answer {} in time", health_url))
    }

    async fn stop(mut self) {
        self.child.kill().await.ok();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let filter = cli.filter;

    let passed = match cli.command {
        Some(Command::List) => {
            list_tests(&all_tests());
            return Ok(());
        }
        Some(Command::Run {
            proxy_addr,
            backend_port,
        }) => {
            let ctx = start_context(proxy_addr, backend_port).await?;
            run_tests(all_tests(), ctx, filter.as_deref()).await.all_passed()
        }
        Some(Command::SpawnAndRun {
            proxy_bin,
            proxy_config,
            backend_port,
            proxy_port,
        }) => {
            let proxy_bin = match proxy_bin {
                Some(bin) => bin,
                None => find_proxy_bin()?,
            };
            spawn_and_run(&proxy_bin, proxy_config.as_deref(), backend_port, proxy_port, filter).await?
        }
        None => {
            let proxy_bin = find_proxy_bin()?;
            spawn_and_run(&proxy_bin, None, DEFAULT_BACKEND_PORT, DEFAULT_PROXY_PORT, filter).await?
        }
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

/// Start the mock Fish Audio API and build the shared test context
async fn start_context(proxy_addr: String, backend_port: u16) -> anyhow::Result<TestContext> {
    println!("Starting mock Fish Audio API on port {}...", backend_port);
    let backend_state = backend::start(backend_port).await?;

    Ok(TestContext {
        proxy_addr,
        upstream_addr: format!("127.0.0.1:{}", backend_port),
        backend_state,
        http_client: client::build_client(),
    })
}

async fn spawn_and_run(
    proxy_bin: &Path,
    proxy_config: Option<&Path>,
    backend_port: u16,
    proxy_port: u16,
    filter: Option<String>,
) -> anyhow::Result<bool> {
    let mut proxy = ProxyProcess::spawn(proxy_bin, proxy_config, proxy_port, backend_port)?;
    let ctx = start_context(proxy.addr.clone(), backend_port).await?;

    proxy.wait_ready().await?;
    println!("Proxy is ready at {}", proxy.addr.bright_cyan());

    let summary = run_tests(all_tests(), ctx, filter.as_deref()).await;
    proxy.stop().await;

    Ok(summary.all_passed())
}

/// Find the proxy binary, release build first
fn find_proxy_bin() -> anyhow::Result<PathBuf> {
    DEFAULT_PROXY_BINS
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No proxy binary found. Tried: {}\nBuild with: cd .. && cargo build --release",
                DEFAULT_PROXY_BINS.join(", ")
            )
        })
}
