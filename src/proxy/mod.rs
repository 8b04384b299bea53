//! Forwarding proxy core and its hosting adapters

pub mod cors;
mod encoding;
mod endpoint;
pub mod forwarder;
pub mod function;
pub mod server;
pub mod upstream;

pub use endpoint::{Endpoint, EndpointMap};
pub use forwarder::{BodyEncoding, Forwarder, ProxyRequest, ProxyResponse};
pub use function::{invoke, FunctionEvent, FunctionResult};
pub use server::{build_forwarder, build_router, run_server, ProxyState};
pub use upstream::{HttpUpstream, Upstream, UpstreamRequest, UpstreamResponse};
