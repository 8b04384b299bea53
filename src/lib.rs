//! fish-proxy: pass-through proxy for the Fish Audio text-to-speech API
//!
//! Features:
//! - `model` and `tts` endpoints forwarded to fixed upstream routes
//! - Caller `Authorization` passed through verbatim
//! - Permissive CORS on every response, preflight answered locally
//! - Binary audio delivered raw (HTTP server) or base64 (function adapter)
//! - Per-request stats logging

pub mod api;
pub mod config;
pub mod error;
pub mod proxy;
pub mod stats;

pub use config::AppConfig;
pub use error::ProxyError;
pub use proxy::{run_server, Forwarder};
