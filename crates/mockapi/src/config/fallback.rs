//! Fallback proxy settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Global fallback settings applied to every controller.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackConfig {
    /// Proxy unmatched requests to a real backend instead of answering 404.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL unmatched requests are proxied to, e.g. `http://localhost:9090`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Shared connect / response / read-idle / write-idle timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Copy inbound request headers (minus `Host` and `Content-Length`) onto
    /// the forwarded request.
    #[serde(default = "default_forward_headers")]
    pub forward_headers: bool,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_forward_headers() -> bool {
    true
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            timeout_ms: default_timeout_ms(),
            forward_headers: default_forward_headers(),
        }
    }
}

impl FallbackConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Per-controller overrides, keyed by controller name in [`super::Config`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    /// Overrides `fallback.baseUrl` for this controller when non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
}
