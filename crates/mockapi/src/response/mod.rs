//! Response construction.
//!
//! Mock responses are built straight from the matched rule: configured
//! status (200 when unset), configured headers in declaration order, and the
//! rule's body serialized as JSON. Nothing is added or validated here.
//!
//! The module also owns the two structured error bodies the dispatcher emits:
//! `404` when no mock matches and `502` when the fallback backend is
//! unreachable.

mod builder;

pub use builder::{ResponseBuilder, APPLICATION_JSON};

use crate::rules::{MockRule, RuleSet};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

pub const NO_MOCK_ERROR: &str = "No mock configuration found for this endpoint";
pub const FALLBACK_ERROR: &str = "Fallback endpoint error";

/// The concrete response for a matched rule.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    /// `None` is an empty body.
    pub body: Option<Value>,
}

/// Turn a matched rule into its response.
pub fn build_response(rules: &RuleSet, rule: &MockRule) -> MockResponse {
    let status = rule
        .status_code
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    MockResponse {
        status,
        headers: rule.headers.clone(),
        body: rules.build_response_body(rule).cloned(),
    }
}

impl MockResponse {
    pub fn into_http(self) -> Response<Full<Bytes>> {
        let mut builder = ResponseBuilder::new(self.status);
        if let Some(body) = &self.body {
            builder = builder.json(body);
        }
        builder
            .headers(self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .build_full()
    }
}

/// Body of the 404 returned when no rule matches and fallback is not used.
#[derive(Debug, Clone, Serialize)]
pub struct NoMockBody<'a> {
    pub error: &'a str,
    pub path: &'a str,
    pub method: &'a str,
}

/// Body of the 502 returned when the fallback request fails in transport.
#[derive(Debug, Clone, Serialize)]
pub struct FallbackErrorBody<'a> {
    pub error: &'a str,
    pub message: &'a str,
    pub path: &'a str,
}

pub fn no_mock_response(path: &str, method: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &NoMockBody {
            error: NO_MOCK_ERROR,
            path,
            method,
        },
    )
}

pub fn fallback_error_response(message: &str, path: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::BAD_GATEWAY,
        &FallbackErrorBody {
            error: FALLBACK_ERROR,
            message,
            path,
        },
    )
}

/// Create a JSON response
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    ResponseBuilder::new(status).json(body).build_full()
}
