//! Mock rule sets.
//!
//! Each controller owns one [`RuleSet`], loaded once from
//! `<mock_data_dir>/<config_name>.json` and never modified afterwards. The
//! dispatcher only relies on three operations:
//!
//! - [`RuleSet::find_match`] - select the rule for a path/method/query
//! - [`extract_path_parameters`] - captured `{name}` segments
//! - [`RuleSet::build_response_body`] - the rule's body, ready to serialize

mod template;
mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use hyper::{Method, StatusCode};
use serde_json::{Map, Value};
use tracing::debug;

pub use template::PathTemplate;
pub use types::{MockRule, ResponseSource, RuleDefinition, RuleFile};
use types::value_to_text;

/// Errors raised while loading a rule set. All of them are fatal for the
/// controller that owns the rule set.
#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    #[error("Failed to read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse rule file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid rule #{index} ({method} {path}): {reason}")]
    InvalidRule {
        index: usize,
        method: String,
        path: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<MockRule>,
    objects: Map<String, Value>,
}

impl RuleSet {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RuleSetError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| RuleSetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: RuleFile =
            serde_json::from_str(&contents).map_err(|source| RuleSetError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_rule_file(file)
    }

    /// Compile a parsed rule file, validating every rule.
    pub fn from_rule_file(file: RuleFile) -> Result<Self, RuleSetError> {
        let RuleFile { objects, methods } = file;
        let mut rules = Vec::with_capacity(methods.len());

        for (index, def) in methods.into_iter().enumerate() {
            let invalid = |reason: String| RuleSetError::InvalidRule {
                index,
                method: def.method.clone(),
                path: def.path.clone(),
                reason,
            };

            let method = def.method.trim().to_ascii_uppercase();
            if method.is_empty() {
                return Err(invalid("method is empty".to_string()));
            }
            Method::from_bytes(method.as_bytes())
                .map_err(|_| invalid(format!("'{}' is not a valid HTTP method", def.method)))?;

            let template = PathTemplate::parse(&def.path).map_err(invalid)?;

            if let Some(code) = def.status_code {
                StatusCode::from_u16(code)
                    .map_err(|_| invalid(format!("{code} is not a valid status code")))?;
            }

            let response = match (def.response.clone(), def.response_object.as_deref()) {
                (Some(body), _) => ResponseSource::Inline(body),
                (None, Some(name)) => {
                    if !objects.contains_key(name) {
                        return Err(invalid(format!("unknown responseObject '{name}'")));
                    }
                    ResponseSource::Object(name.to_string())
                }
                (None, None) => ResponseSource::Empty,
            };

            rules.push(MockRule {
                template,
                method,
                query_params: def
                    .query_params
                    .iter()
                    .map(|(k, v)| (k.clone(), value_to_text(v)))
                    .collect(),
                status_code: def.status_code,
                headers: def
                    .headers
                    .iter()
                    .map(|(k, v)| (k.clone(), value_to_text(v)))
                    .collect(),
                response,
            });
        }

        Ok(Self { rules, objects })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of named mock objects available to rules.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn rules(&self) -> &[MockRule] {
        &self.rules
    }

    /// Find the rule for a request.
    ///
    /// A rule matches when its method equals `method` ignoring case, its
    /// template matches `path` segment by segment, and every declared query
    /// constraint is present in `query` with the same value. When several
    /// rules match, the one declaring more query constraints wins, then the
    /// one with more literal segments, then the earliest declared.
    pub fn find_match(
        &self,
        path: &str,
        method: &str,
        query: &HashMap<String, String>,
    ) -> Option<&MockRule> {
        let mut best: Option<(&MockRule, (usize, usize))> = None;

        for rule in &self.rules {
            if !rule.method.eq_ignore_ascii_case(method) {
                continue;
            }
            let query_ok = rule
                .query_params
                .iter()
                .all(|(name, expected)| query.get(name) == Some(expected));
            if !query_ok || !rule.template.matches(path) {
                continue;
            }

            let rank = (rule.query_params.len(), rule.template.literal_count());
            if best.map_or(true, |(_, best_rank)| rank > best_rank) {
                best = Some((rule, rank));
            }
        }

        if let Some((rule, _)) = best {
            debug!("Matched {} {} to rule {}", method, path, rule.path());
        }
        best.map(|(rule, _)| rule)
    }

    /// The rule's body. `None` is an empty body, which is still a match.
    pub fn build_response_body<'a>(&'a self, rule: &'a MockRule) -> Option<&'a Value> {
        match &rule.response {
            ResponseSource::Inline(value) => Some(value),
            ResponseSource::Object(name) => self.objects.get(name),
            ResponseSource::Empty => None,
        }
    }
}

/// Captured `{name}` segments of `actual_path` under `template`. Empty when the
/// template has no named segments or does not match.
pub fn extract_path_parameters(template: &str, actual_path: &str) -> HashMap<String, String> {
    PathTemplate::parse(template)
        .ok()
        .and_then(|t| t.captures(actual_path))
        .unwrap_or_default()
}
