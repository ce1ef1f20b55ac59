//! Effective fallback URL resolution.
//!
//! The target for a fallback attempt is recomputed on every request from three
//! layers, first non-empty wins:
//!
//! 1. the controller's static `fallback_url` declared on its [`ControllerSpec`]
//! 2. `controllers.<name>.fallbackUrl` from configuration
//! 3. the global `fallback.baseUrl`
//!
//! Resolution only reads the configuration; nothing is cached between requests.

use crate::config::Config;

/// Resolve the fallback base URL for `controller_name`.
pub fn resolve_fallback_url<'a>(
    config: &'a Config,
    controller_name: &str,
    code_override: Option<&'a str>,
) -> Option<&'a str> {
    code_override
        .filter(|url| !url.is_empty())
        .or_else(|| config.fallback_url_for_controller(controller_name))
}

/// Whether an unmatched request for `controller_name` should be proxied.
pub fn is_fallback_eligible(
    config: &Config,
    controller_name: &str,
    code_override: Option<&str>,
) -> bool {
    config.fallback.enabled
        && resolve_fallback_url(config, controller_name, code_override).is_some()
}
