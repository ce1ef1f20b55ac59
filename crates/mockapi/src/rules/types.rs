//! Rule file format and the compiled rule type.

use super::template::PathTemplate;
use serde::Deserialize;
use serde_json::{Map, Value};

/// On-disk shape of a controller's rule file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFile {
    /// Named mock objects that rules can reference by `responseObject`.
    #[serde(default)]
    pub objects: Map<String, Value>,
    #[serde(default)]
    pub methods: Vec<RuleDefinition>,
}

/// One endpoint as written in a rule file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub query_params: Map<String, Value>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// Inline response body.
    #[serde(default)]
    pub response: Option<Value>,
    /// Name of an entry in [`RuleFile::objects`] used as the response body.
    #[serde(default)]
    pub response_object: Option<String>,
}

/// Where a rule's body comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseSource {
    Inline(Value),
    Object(String),
    Empty,
}

/// A compiled, immutable mock rule.
#[derive(Debug, Clone)]
pub struct MockRule {
    pub template: PathTemplate,
    /// Upper-cased HTTP method.
    pub method: String,
    /// Query constraints in declaration order; all must match.
    pub query_params: Vec<(String, String)>,
    /// `None` means 200.
    pub status_code: Option<u16>,
    /// Response headers in declaration order.
    pub headers: Vec<(String, String)>,
    pub response: ResponseSource,
}

impl MockRule {
    pub fn path(&self) -> &str {
        self.template.as_str()
    }
}

/// Render a scalar JSON value the way it would appear in a query string or
/// header: strings unquoted, everything else in JSON form.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
