//! Forwarding of unmatched requests to the fallback backend.

use super::client::FallbackClient;
use super::headers::forwardable_headers;
use super::{FailureKind, ForwardedResponse, ProxyFailure, ProxyOutcome};
use crate::request::InboundRequest;
use hyper::Method;
use std::error::Error as StdError;
use tracing::debug;

/// Destination for a forwarded request: `target_base + path`, with the
/// original query string re-attached untouched.
pub fn destination_url(target_base: &str, request: &InboundRequest) -> String {
    match request.query() {
        Some(query) => format!("{target_base}{}?{query}", request.path()),
        None => format!("{target_base}{}", request.path()),
    }
}

/// Forward `request` to `target_base` and materialize the backend response.
///
/// Exactly one outbound request is made; failures are never retried. Any
/// response the backend sends, whatever its status, is a
/// [`ProxyOutcome::Forwarded`]. Dropping the returned future aborts the
/// outbound request.
pub async fn forward_request(
    client: &FallbackClient,
    request: &InboundRequest,
    target_base: &str,
) -> ProxyOutcome {
    let target_url = destination_url(target_base, request);
    let url = match reqwest::Url::parse(&target_url) {
        Ok(url) => url,
        Err(e) => {
            return ProxyOutcome::Failed(ProxyFailure {
                kind: FailureKind::InvalidUrl,
                message: format!("Invalid fallback URL '{target_url}': {e}"),
            });
        }
    };

    debug!("Forwarding to: {} {}", request.method, url);

    let mut outbound = client
        .http
        .request(request.method.clone(), url)
        .headers(forwardable_headers(&request.headers, client.forward_headers));

    if request.method != Method::GET && !request.body.is_empty() {
        outbound = outbound.body(request.body.clone());
    }

    let response = match tokio::time::timeout(client.timeouts.write_idle, outbound.send()).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => return ProxyOutcome::Failed(ProxyFailure::from_reqwest(&e)),
        Err(_) => {
            return ProxyOutcome::Failed(ProxyFailure {
                kind: FailureKind::Timeout,
                message: format!(
                    "No response from {target_url} within {}ms",
                    client.timeouts.write_idle.as_millis()
                ),
            });
        }
    };

    let status = response.status();
    let headers = response.headers().clone();
    match response.bytes().await {
        Ok(body) => {
            debug!("Fallback responded with status {} ({} bytes)", status, body.len());
            ProxyOutcome::Forwarded(ForwardedResponse {
                status,
                headers,
                body,
            })
        }
        Err(e) => ProxyOutcome::Failed(ProxyFailure::from_reqwest(&e)),
    }
}

impl ProxyFailure {
    fn from_reqwest(error: &reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            FailureKind::Timeout
        } else if error.is_connect() {
            FailureKind::Connect
        } else if error.is_body() || error.is_decode() {
            FailureKind::Body
        } else {
            FailureKind::Request
        };
        Self {
            kind,
            message: error_chain(error),
        }
    }
}

/// `error` followed by each of its sources, joined by `": "`.
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
