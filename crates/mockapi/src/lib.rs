//! Configurable mock HTTP server.
//!
//! Controllers serve canned responses from JSON rule sets and, when no rule
//! matches, can proxy the request to a real backend instead.

pub mod config;
pub mod dispatch;
pub mod fallback;
pub mod proxy;
pub mod request;
pub mod response;
pub mod rules;
pub mod server;

pub use config::{Config, ControllerSpec};
pub use dispatch::ControllerDispatcher;
pub use request::InboundRequest;
pub use server::MockApiServer;
