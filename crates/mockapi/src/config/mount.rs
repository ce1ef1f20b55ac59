//! Controller declarations.
//!
//! A controller is a base path served from one rule set. Every controller is
//! handled by the same dispatcher; what differs between them is only the data
//! declared here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSpec {
    /// Path prefix owned by this controller, e.g. `/api/product`.
    pub base_path: String,
    /// Rule file name without the `.json` extension.
    pub config_name: String,
    /// Name used for `controllers.<name>` lookups. Defaults to `config_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_name: Option<String>,
    /// Static fallback URL that takes priority over all configured URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
}

impl ControllerSpec {
    pub fn new(base_path: impl Into<String>, config_name: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            config_name: config_name.into(),
            controller_name: None,
            fallback_url: None,
        }
    }

    pub fn with_controller_name(mut self, name: impl Into<String>) -> Self {
        self.controller_name = Some(name.into());
        self
    }

    pub fn with_fallback_url(mut self, url: impl Into<String>) -> Self {
        self.fallback_url = Some(url.into());
        self
    }

    pub fn controller_name(&self) -> &str {
        self.controller_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.config_name)
    }

    /// Base path with a single leading slash and no trailing slash.
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim_matches('/');
        format!("/{trimmed}")
    }

    /// Whether `request_path` lies under this controller's base path on a
    /// segment boundary (`/api/user` owns `/api/user/1` but not `/api/users`).
    pub fn matches_base_path(&self, request_path: &str) -> bool {
        let base = self.normalized_base_path();
        if base == "/" {
            return true;
        }
        match request_path.strip_prefix(base.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Controllers served when the configuration declares none.
    pub fn defaults() -> Vec<ControllerSpec> {
        vec![
            ControllerSpec::new("/api/user", "user"),
            ControllerSpec::new("/api/product", "product"),
        ]
    }
}
