//! URL scheme checks for fallback targets.

/// Schemes a fallback base URL may use.
const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

/// Check that `url` is absolute, uses http or https, and names a host.
pub fn validate_fallback_url(url: &str) -> Result<(), String> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| format!("Invalid URL format (missing scheme): {url}"))?;
    if !SUPPORTED_SCHEMES.contains(&scheme.to_lowercase().as_str()) {
        return Err(format!("Unsupported protocol scheme: {scheme}"));
    }
    if rest.is_empty() || rest.starts_with('/') {
        return Err(format!("Invalid URL format (missing host): {url}"));
    }
    Ok(())
}
