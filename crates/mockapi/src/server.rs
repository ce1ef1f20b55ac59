//! Hosting HTTP layer.
//!
//! Accepts HTTP/1.1 connections, routes each request to the controller owning
//! the longest matching base path, and hands it to that controller's
//! dispatcher. Each connection runs in its own task. When a client goes away
//! hyper drops the in-flight service future, which also drops any fallback
//! request it was awaiting.

use crate::config::{Config, ControllerSpec};
use crate::dispatch::ControllerDispatcher;
use crate::proxy::create_fallback_client;
use crate::request::InboundRequest;
use crate::response::json_response;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Methods the generic controller endpoint accepts.
pub const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
];

/// Minimum time shutdown waits for open connections to finish.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MockApiServer {
    /// Sorted by base path length, longest first.
    controllers: Vec<ControllerDispatcher>,
    /// Controllers whose rule set failed to load.
    unavailable: Vec<ControllerSpec>,
    drain_timeout: Duration,
}

impl MockApiServer {
    /// Initialize every configured controller.
    ///
    /// Each controller loads independently: one that fails is logged and
    /// answered with `503`, the others serve normally. Startup fails only when
    /// no controller could be initialized.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let client = create_fallback_client(&config.fallback)?;
        let config = Arc::new(config);

        let mut controllers = Vec::new();
        let mut unavailable = Vec::new();
        for spec in config.effective_mounts() {
            match ControllerDispatcher::initialize(
                spec.clone(),
                Arc::clone(&config),
                Some(client.clone()),
            ) {
                Ok(controller) => controllers.push(controller),
                Err(_) => unavailable.push(spec),
            }
        }

        if controllers.is_empty() {
            anyhow::bail!("No controller could be initialized; see errors above");
        }
        if !unavailable.is_empty() {
            warn!(
                "{} controller(s) failed to initialize and will answer 503",
                unavailable.len()
            );
        }

        // A request proxied just before shutdown may take up to the fallback
        // timeout to finish.
        Ok(Self::from_parts(controllers, unavailable)
            .with_drain_timeout(config.fallback.timeout().max(DEFAULT_DRAIN_TIMEOUT)))
    }

    pub fn from_parts(
        mut controllers: Vec<ControllerDispatcher>,
        unavailable: Vec<ControllerSpec>,
    ) -> Self {
        controllers.sort_by_key(|c| std::cmp::Reverse(c.base_path().len()));
        Self {
            controllers,
            unavailable,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn controllers(&self) -> &[ControllerDispatcher] {
        &self.controllers
    }

    pub fn unavailable(&self) -> &[ControllerSpec] {
        &self.unavailable
    }

    /// Serve until the process is stopped.
    pub async fn run(self, listener: TcpListener) -> Result<(), anyhow::Error> {
        self.run_until(listener, std::future::pending()).await
    }

    /// Serve until `shutdown` resolves.
    ///
    /// On shutdown the listener stops accepting, every open connection is
    /// told to finish its current request and close, and the call waits up to
    /// the drain timeout for them. Connections still open after that are
    /// aborted.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), anyhow::Error>
    where
        F: Future<Output = ()>,
    {
        info!("Listening on http://{}", listener.local_addr()?);
        for controller in &self.controllers {
            info!(
                "Serving controller '{}' at {} ({} rules)",
                controller.spec().controller_name(),
                controller.base_path(),
                controller.rules().len()
            );
        }

        let drain_timeout = self.drain_timeout;
        let server = Arc::new(self);
        let (drain_tx, drain_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            let (stream, remote_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = &mut shutdown => break,
            };
            while connections.try_join_next().is_some() {}

            let server = Arc::clone(&server);
            let mut drain_rx = drain_rx.clone();
            connections.spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let server = Arc::clone(&server);
                    async move { server.handle(req).await }
                });

                let conn = http1::Builder::new().serve_connection(io, service);
                tokio::pin!(conn);
                let result = tokio::select! {
                    result = conn.as_mut() => result,
                    _ = drain_rx.changed() => {
                        conn.as_mut().graceful_shutdown();
                        conn.await
                    }
                };
                if let Err(err) = result {
                    debug!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }

        drop(listener);
        info!(
            "Shutting down listener, draining {} connection(s)",
            connections.len()
        );
        let _ = drain_tx.send(true);

        let drained = tokio::time::timeout(drain_timeout, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                "Aborting {} connection(s) still open after {:?}",
                connections.len(),
                drain_timeout
            );
            connections.shutdown().await;
        }
        Ok(())
    }

    /// Collect the request body and route the request.
    pub async fn handle<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>, Infallible>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let path = req.uri().path().to_string();
        match InboundRequest::from_hyper(req).await {
            Ok(request) => Ok(self.route(&request).await),
            Err(e) => {
                error!("Failed to read request body for {}: {}", path, e);
                Ok(json_response(
                    StatusCode::BAD_REQUEST,
                    &json!({ "error": "Failed to read request body", "path": path }),
                ))
            }
        }
    }

    /// Route a materialized request to its controller.
    pub async fn route(&self, request: &InboundRequest) -> Response<Full<Bytes>> {
        let path = request.path();

        if !ALLOWED_METHODS.contains(&request.method) {
            return json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &json!({ "error": "Method not allowed", "method": request.method.as_str() }),
            );
        }

        if let Some(controller) = self
            .controllers
            .iter()
            .find(|c| c.spec().matches_base_path(path))
        {
            return controller.dispatch(request).await;
        }

        if let Some(spec) = self
            .unavailable
            .iter()
            .find(|spec| spec.matches_base_path(path))
        {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &json!({
                    "error": "Controller failed to initialize",
                    "controller": spec.controller_name()
                }),
            );
        }

        json_response(
            StatusCode::NOT_FOUND,
            &json!({ "error": "No controller handles this path", "path": path }),
        )
    }
}
