//! HTTP client creation for fallback requests.
//!
//! One configured timeout value drives every timeout on the outbound
//! connection. The client is shared by all controllers and keeps its own
//! connection pool.

use super::ProxyError;
use crate::config::FallbackConfig;
use std::time::Duration;
use tracing::info;

/// Timeouts applied to each fallback call. Every window starts when the call
/// starts; nothing is shared between concurrent calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyTimeouts {
    /// Establishing the TCP (and TLS) connection.
    pub connect: Duration,
    /// Whole exchange, from sending the request to the last body byte.
    pub response: Duration,
    /// Maximum gap between two successful reads.
    pub read_idle: Duration,
    /// Deadline for writing the request and receiving the response head.
    pub write_idle: Duration,
}

impl ProxyTimeouts {
    /// All four timeouts set to the same value.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            connect: timeout,
            response: timeout,
            read_idle: timeout,
            write_idle: timeout,
        }
    }
}

/// Client used by the fallback proxy, plus the settings that shape each
/// forwarded request.
#[derive(Debug, Clone)]
pub struct FallbackClient {
    pub(super) http: reqwest::Client,
    pub(super) timeouts: ProxyTimeouts,
    pub(super) forward_headers: bool,
}

impl FallbackClient {
    pub fn timeouts(&self) -> ProxyTimeouts {
        self.timeouts
    }

    pub fn forward_headers(&self) -> bool {
        self.forward_headers
    }
}

/// Create the shared fallback client from the global fallback settings.
///
/// Redirects are not followed and system proxy variables are ignored, so the
/// backend's answer is relayed exactly as sent.
pub fn create_fallback_client(config: &FallbackConfig) -> Result<FallbackClient, ProxyError> {
    let timeouts = ProxyTimeouts::uniform(config.timeout());

    let http = reqwest::Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.response)
        .read_timeout(timeouts.read_idle)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .map_err(ProxyError::Client)?;

    info!(
        "Fallback client configured: timeout={}ms, forward_headers={}",
        config.timeout_ms, config.forward_headers
    );

    Ok(FallbackClient {
        http,
        timeouts,
        forward_headers: config.forward_headers,
    })
}
