//! Configuration types for the mock server.

mod fallback;
mod listen;
mod mount;
mod protocol;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use fallback::{ControllerConfig, FallbackConfig};
pub use listen::ListenConfig;
pub use mount::ControllerSpec;
pub use protocol::validate_fallback_url;

/// Process-wide configuration. Built once at startup and shared read-only
/// (behind an `Arc`) with every controller.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,

    /// Directory holding one `<configName>.json` rule file per controller.
    #[serde(default = "default_mock_data_dir")]
    pub mock_data_dir: PathBuf,

    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Per-controller overrides keyed by controller name.
    #[serde(default)]
    pub controllers: HashMap<String, ControllerConfig>,

    /// Controllers to serve. Empty means [`ControllerSpec::defaults`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<ControllerSpec>,
}

fn default_mock_data_dir() -> PathBuf {
    PathBuf::from("mockdata")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            mock_data_dir: default_mock_data_dir(),
            fallback: FallbackConfig::default(),
            controllers: HashMap::new(),
            mounts: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.fallback.timeout_ms == 0 {
            anyhow::bail!("fallback.timeoutMs must be greater than zero");
        }

        if let Some(url) = non_empty(self.fallback.base_url.as_deref()) {
            validate_fallback_url(url)
                .map_err(|e| anyhow::anyhow!("Invalid fallback.baseUrl: {e}"))?;
        }

        for (name, controller) in &self.controllers {
            if let Some(url) = non_empty(controller.fallback_url.as_deref()) {
                validate_fallback_url(url).map_err(|e| {
                    anyhow::anyhow!("Invalid controllers.{name}.fallbackUrl: {e}")
                })?;
            }
        }

        let mut seen = HashSet::new();
        for mount in &self.mounts {
            if mount.base_path.trim().is_empty() {
                anyhow::bail!(
                    "Mount for '{}' has an empty basePath",
                    mount.controller_name()
                );
            }
            if mount.config_name.trim().is_empty() {
                anyhow::bail!("Mount at '{}' has an empty configName", mount.base_path);
            }
            if !seen.insert(mount.normalized_base_path()) {
                anyhow::bail!(
                    "Duplicate basePath '{}' in mounts",
                    mount.normalized_base_path()
                );
            }
            if let Some(url) = non_empty(mount.fallback_url.as_deref()) {
                validate_fallback_url(url).map_err(|e| {
                    anyhow::anyhow!("Invalid fallbackUrl for mount '{}': {e}", mount.base_path)
                })?;
            }
        }

        if self.fallback.enabled {
            for mount in self.effective_mounts() {
                if self
                    .fallback_url_for_controller(mount.controller_name())
                    .is_none()
                    && non_empty(mount.fallback_url.as_deref()).is_none()
                {
                    warn!(
                        "Fallback is enabled but no URL resolves for controller '{}'; unmatched requests will get 404",
                        mount.controller_name()
                    );
                }
            }
        }

        Ok(())
    }

    /// The declared mounts, or the built-in defaults when none are declared.
    pub fn effective_mounts(&self) -> Vec<ControllerSpec> {
        if self.mounts.is_empty() {
            ControllerSpec::defaults()
        } else {
            self.mounts.clone()
        }
    }

    /// Configured fallback URL for a controller: the controller-specific URL
    /// when set and non-empty, otherwise the global base URL.
    pub fn fallback_url_for_controller(&self, controller_name: &str) -> Option<&str> {
        self.controllers
            .get(controller_name)
            .and_then(|c| non_empty(c.fallback_url.as_deref()))
            .or_else(|| non_empty(self.fallback.base_url.as_deref()))
    }

    /// Path of the rule file for `config_name`.
    pub fn rule_file_path(&self, config_name: &str) -> PathBuf {
        self.mock_data_dir.join(format!("{config_name}.json"))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
