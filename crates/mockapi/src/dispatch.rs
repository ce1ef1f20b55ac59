//! Per-request dispatch for one controller.
//!
//! Every controller is a [`ControllerDispatcher`] built from a
//! [`ControllerSpec`], its loaded [`RuleSet`], and the shared [`Config`]. For
//! each request:
//!
//! 1. normalize path, method and a single-value query map
//! 2. matched rule -> mock response
//! 3. no match, fallback not eligible -> `404`
//! 4. no match, fallback eligible -> proxy to the effective URL, relay the
//!    backend answer or return `502`

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ControllerSpec};
use crate::fallback::{is_fallback_eligible, resolve_fallback_url};
use crate::proxy::{forward_request, FallbackClient, ProxyOutcome};
use crate::request::InboundRequest;
use crate::response::{build_response, no_mock_response};
use crate::rules::{extract_path_parameters, RuleSet, RuleSetError};

pub struct ControllerDispatcher {
    spec: ControllerSpec,
    base_path: String,
    rules: RuleSet,
    config: Arc<Config>,
    client: Option<FallbackClient>,
}

impl ControllerDispatcher {
    pub fn new(
        spec: ControllerSpec,
        rules: RuleSet,
        config: Arc<Config>,
        client: Option<FallbackClient>,
    ) -> Self {
        let base_path = spec.normalized_base_path();
        Self {
            spec,
            base_path,
            rules,
            config,
            client,
        }
    }

    /// Load the controller's rule file and build its dispatcher.
    ///
    /// A load failure means the controller must not serve traffic; the error
    /// is returned to the caller rather than leaving a half-built controller.
    pub fn initialize(
        spec: ControllerSpec,
        config: Arc<Config>,
        client: Option<FallbackClient>,
    ) -> Result<Self, RuleSetError> {
        let base_path = spec.normalized_base_path();
        let rule_file = config.rule_file_path(&spec.config_name);
        info!(
            "[{}] Initializing with configuration from {}",
            base_path,
            rule_file.display()
        );

        let rules = RuleSet::from_file(&rule_file).inspect_err(|e| {
            error!("[{}] Failed to initialize controller: {}", base_path, e);
        })?;

        info!(
            "[{}] Initialized successfully with {} rules and {} mock objects",
            base_path,
            rules.len(),
            rules.object_count()
        );

        Ok(Self::new(spec, rules, config, client))
    }

    pub fn spec(&self) -> &ControllerSpec {
        &self.spec
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The URL an unmatched request would be proxied to right now.
    pub fn effective_fallback_url(&self) -> Option<&str> {
        resolve_fallback_url(
            &self.config,
            self.spec.controller_name(),
            self.spec.fallback_url.as_deref(),
        )
    }

    /// Fallback is used only when it is enabled, a URL resolves, and a client
    /// is available to send the request.
    pub fn is_fallback_eligible(&self) -> bool {
        self.client.is_some()
            && is_fallback_eligible(
                &self.config,
                self.spec.controller_name(),
                self.spec.fallback_url.as_deref(),
            )
    }

    /// Produce the single response for `request`.
    pub async fn dispatch(&self, request: &InboundRequest) -> Response<Full<Bytes>> {
        let path = request.path();
        let method = request.method.as_str();
        let query = request.query_params();

        debug!("[{}] Handling request: {} {}", self.base_path, method, path);

        if let Some(rule) = self.rules.find_match(path, method, &query) {
            let params = extract_path_parameters(rule.path(), path);
            if !params.is_empty() {
                debug!(
                    "[{}] Extracted path parameters: {:?}",
                    self.base_path, params
                );
            }

            let response = build_response(&self.rules, rule);
            debug!(
                "[{}] Returning response with status: {}",
                self.base_path,
                response.status.as_u16()
            );
            return response.into_http();
        }

        warn!(
            "[{}] No mock configuration found for: {} {}",
            self.base_path, method, path
        );

        if !self.is_fallback_eligible() {
            return no_mock_response(path, method);
        }
        match (self.client.as_ref(), self.effective_fallback_url()) {
            (Some(client), Some(target)) => self.proxy_to_fallback(client, request, target).await,
            _ => no_mock_response(path, method),
        }
    }

    async fn proxy_to_fallback(
        &self,
        client: &FallbackClient,
        request: &InboundRequest,
        target: &str,
    ) -> Response<Full<Bytes>> {
        info!(
            "[{}] Proxying request to fallback: {} {}{}",
            self.base_path,
            request.method,
            target,
            request.path()
        );

        let outcome = forward_request(client, request, target).await;
        match &outcome {
            ProxyOutcome::Forwarded(forwarded) => debug!(
                "[{}] Fallback request succeeded with status: {}",
                self.base_path, forwarded.status
            ),
            ProxyOutcome::Failed(failure) => error!(
                "[{}] Error proxying to fallback endpoint ({}): {}",
                self.base_path,
                failure.kind.as_str(),
                failure.message
            ),
        }
        outcome.into_response(request.path())
    }
}
