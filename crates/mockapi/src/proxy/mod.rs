//! Fallback proxy.
//!
//! When no mock matches and fallback is enabled, the request is forwarded to
//! a real backend. The result is a [`ProxyOutcome`]:
//!
//! - `Forwarded` - the backend answered; status, headers and body are relayed
//!   unchanged, including 4xx/5xx answers
//! - `Failed` - the call failed in transport (refused, timed out, DNS, ...);
//!   the caller turns this into a `502`
//!
//! # Module Structure
//!
//! - `client` - shared reqwest client and timeout settings
//! - `headers` - which inbound headers are forwarded
//! - `forwarding` - building and sending the outbound request

mod client;
mod forwarding;
mod headers;

pub use client::{create_fallback_client, FallbackClient, ProxyTimeouts};
pub use forwarding::{destination_url, forward_request};
pub use headers::{forwardable_headers, is_excluded, EXCLUDED_HEADERS};

use crate::response::{fallback_error_response, ResponseBuilder};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{HeaderMap, Response, StatusCode};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Failed to build fallback client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Classification of a failed fallback call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Connect,
    Body,
    InvalidUrl,
    Request,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Connect => "connect",
            FailureKind::Body => "body",
            FailureKind::InvalidUrl => "invalid-url",
            FailureKind::Request => "request",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct ProxyFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Result of one fallback attempt.
#[derive(Debug, Clone)]
pub enum ProxyOutcome {
    Forwarded(ForwardedResponse),
    Failed(ProxyFailure),
}

impl ProxyOutcome {
    /// The HTTP response for this outcome. `path` is the inbound request path,
    /// embedded in the `502` body on failure.
    pub fn into_response(self, path: &str) -> Response<Full<Bytes>> {
        match self {
            ProxyOutcome::Forwarded(forwarded) => ResponseBuilder::new(forwarded.status)
                .relay_headers(&forwarded.headers)
                .body(forwarded.body)
                .build_full(),
            ProxyOutcome::Failed(failure) => fallback_error_response(&failure.message, path),
        }
    }
}
