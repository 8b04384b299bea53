//! Error taxonomy for the forwarding proxy
//!
//! Every variant maps to an HTTP status and a JSON body of the form
//! `{error, message}` or `{error, status, message}` when an upstream status is known.

use axum::http::StatusCode;
use serde_json::Value;

use crate::api::ErrorBody;
use crate::proxy::Endpoint;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Endpoint is required")]
    MissingEndpoint,

    #[error("Invalid endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("Method {method} not allowed on {endpoint}")]
    MethodNotAllowed { endpoint: Endpoint, method: String },

    #[error("Authorization header is required")]
    AuthRequired,

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Upstream returned {status} for {endpoint}")]
    Upstream {
        endpoint: Endpoint,
        status: StatusCode,
        message: Value,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status reported to the caller
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingEndpoint | ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::UnknownEndpoint(_) => StatusCode::NOT_FOUND,
            ProxyError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::AuthRequired => StatusCode::UNAUTHORIZED,
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Upstream { status, .. } => *status,
            ProxyError::UpstreamUnreachable(_) | ProxyError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON body reported to the caller
    pub fn body(&self) -> ErrorBody {
        match self {
            ProxyError::MissingEndpoint => ErrorBody::new("Endpoint is required"),
            ProxyError::UnknownEndpoint(_) => ErrorBody::new("Invalid endpoint"),
            ProxyError::MethodNotAllowed { .. } => ErrorBody::new("Method not allowed"),
            ProxyError::AuthRequired => ErrorBody::new("Authorization header is required"),
            ProxyError::BadRequest(msg) => {
                ErrorBody::new("Invalid request body").with_message(msg.clone())
            }
            ProxyError::PayloadTooLarge(limit) => ErrorBody::new("Request body too large")
                .with_message(format!("limit is {} bytes", limit)),
            ProxyError::UpstreamUnreachable(msg) => {
                ErrorBody::new("Proxy request failed").with_message(msg.clone())
            }
            ProxyError::Upstream {
                endpoint,
                status,
                message,
            } => {
                let error = match endpoint {
                    Endpoint::Model => "Fish Audio API error",
                    Endpoint::Tts => "Fish Audio TTS API error",
                };
                ErrorBody::new(error)
                    .with_status(status.as_u16())
                    .with_message(message.clone())
            }
            ProxyError::Internal(msg) => {
                ErrorBody::new("Internal server error").with_message(msg.clone())
            }
        }
    }
}
