//! End-to-end tests: a running server loaded from rule files on disk, called
//! over HTTP.

mod common;

use assert_json_diff::assert_json_eq;
use common::{Backend, BackendReply};
use mockapi::{Config, ControllerSpec, MockApiServer};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const PRODUCT_RULES: &str = r#"{
  "objects": {
    "laptop": {
      "id": "101",
      "name": "Laptop",
      "description": "High-performance laptop",
      "price": 1299.99,
      "category": "Electronics",
      "inStock": true
    }
  },
  "methods": [
    {
      "path": "/api/product",
      "method": "GET",
      "response": [
        { "id": "101", "name": "Laptop", "inStock": true },
        { "id": "102", "name": "Wireless Mouse", "inStock": false }
      ]
    },
    {
      "path": "/api/product",
      "method": "GET",
      "queryParams": { "inStock": "true" },
      "response": [ { "id": "101", "name": "Laptop", "inStock": true } ]
    },
    { "path": "/api/product/{id}", "method": "GET", "responseObject": "laptop" },
    {
      "path": "/api/product",
      "method": "POST",
      "statusCode": 201,
      "headers": { "Location": "/api/product/105", "X-Mock": "created" },
      "response": { "id": "105", "name": "New Product", "message": "Product created successfully" }
    },
    { "path": "/api/product/{id}", "method": "DELETE", "statusCode": 204 }
  ]
}"#;

const USER_RULES: &str = r#"{
  "methods": [
    { "path": "/api/user/{id}", "method": "GET", "response": { "id": "1", "name": "Ada" } }
  ]
}"#;

struct Running {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    serving: Option<JoinHandle<Result<(), anyhow::Error>>>,
    _dir: TempDir,
}

impl Running {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Signal shutdown and return the still-running server task.
    fn stop(&mut self) -> JoinHandle<Result<(), anyhow::Error>> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.serving.take().unwrap()
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn start(configure: impl FnOnce(&mut Config)) -> Running {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("product.json"), PRODUCT_RULES).unwrap();
    std::fs::write(dir.path().join("user.json"), USER_RULES).unwrap();

    let mut config = Config {
        mock_data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    configure(&mut config);
    config.validate().unwrap();

    let server = MockApiServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    let serving = tokio::spawn(server.run_until(listener, async {
        let _ = rx.await;
    }));

    Running {
        addr,
        shutdown: Some(tx),
        serving: Some(serving),
        _dir: dir,
    }
}

fn client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_get_product_by_id() {
    let server = start(|_| {}).await;

    let response = client()
        .get(server.url("/api/product/101"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let body: Value = response.json().await.unwrap();
    assert_json_eq!(
        body,
        json!({
            "id": "101",
            "name": "Laptop",
            "description": "High-performance laptop",
            "price": 1299.99,
            "category": "Electronics",
            "inStock": true
        })
    );
}

#[tokio::test]
async fn test_query_constraint_selects_rule() {
    let server = start(|_| {}).await;

    let all: Value = client()
        .get(server.url("/api/product"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);

    let in_stock: Value = client()
        .get(server.url("/api/product?inStock=true"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(in_stock.as_array().unwrap().len(), 1);
    assert_eq!(in_stock[0]["name"], "Laptop");
}

#[tokio::test]
async fn test_post_uses_configured_status_and_headers() {
    let server = start(|_| {}).await;

    let response = client()
        .post(server.url("/api/product"))
        .header("content-type", "application/json")
        .body(r#"{"name":"New Gadget","price":199.99}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["location"], "/api/product/105");
    assert_eq!(response.headers()["x-mock"], "created");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Product created successfully");
}

#[tokio::test]
async fn test_delete_with_empty_body() {
    let server = start(|_| {}).await;

    let response = client()
        .delete(server.url("/api/product/101"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unmatched_without_fallback_is_not_found() {
    let server = start(|_| {}).await;

    let response = client()
        .put(server.url("/api/product/101"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_json_eq!(
        body,
        json!({
            "error": "No mock configuration found for this endpoint",
            "path": "/api/product/101",
            "method": "PUT"
        })
    );
}

#[tokio::test]
async fn test_each_controller_serves_its_own_rules() {
    let server = start(|_| {}).await;

    let user: Value = client()
        .get(server.url("/api/user/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(user["name"], "Ada");

    let response = client()
        .get(server.url("/api/user/101/orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unmatched_request_falls_back_to_backend() {
    let backend = Backend::start(BackendReply::ok(r#"{"ok":true}"#)).await;
    let backend_url = backend.url();
    let server = start(move |config| {
        config.fallback.enabled = true;
        config.fallback.base_url = Some(backend_url);
        config.mounts = vec![ControllerSpec::new("/api", "product")];
    })
    .await;

    let response = client()
        .get(server.url("/api/widget?color=red"))
        .header("x-trace", "t-1")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-backend"], "real");
    assert_eq!(response.text().await.unwrap(), r#"{"ok":true}"#);

    let seen = backend.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].uri.path(), "/api/widget");
    assert_eq!(seen[0].uri.query(), Some("color=red"));
    assert_eq!(seen[0].headers["x-trace"], "t-1");
}

#[tokio::test]
async fn test_unknown_controller_path() {
    let server = start(|_| {}).await;

    let response = client().get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_controller_with_broken_rule_file_is_unavailable() {
    let server = start(|config| {
        config.mounts = vec![
            ControllerSpec::new("/api/product", "product"),
            ControllerSpec::new("/api/order", "order"),
        ];
    })
    .await;

    let response = client()
        .get(server.url("/api/order/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = client()
        .get(server.url("/api/product/101"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_shutdown_lets_in_flight_request_finish() {
    let backend =
        Backend::start(BackendReply::ok(r#"{"slow":true}"#).delay(Duration::from_millis(400))).await;
    let backend_url = backend.url();
    let mut server = start(move |config| {
        config.fallback.enabled = true;
        config.fallback.base_url = Some(backend_url);
        config.mounts = vec![ControllerSpec::new("/api", "product")];
    })
    .await;

    let in_flight = tokio::spawn(client().get(server.url("/api/slow")).send());
    tokio::time::timeout(Duration::from_secs(2), async {
        while backend.requests().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("request never reached the backend");

    let serving = server.stop();

    let response = in_flight.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), r#"{"slow":true}"#);

    tokio::time::timeout(Duration::from_secs(2), serving)
        .await
        .expect("server did not finish draining")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_idle_keep_alive_connections() {
    let mut server = start(|_| {}).await;
    let client = client();

    let response = client
        .get(server.url("/api/product/101"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.bytes().await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), server.stop())
        .await
        .expect("idle connection held up shutdown")
        .unwrap()
        .unwrap();
}
