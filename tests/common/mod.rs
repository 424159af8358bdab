//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use tower::ServiceExt;

use trie_dispatch::config::ServerConfig;
use trie_dispatch::routing::Router;
use trie_dispatch::HttpServer;

/// Config with a short deadline and everything else defaulted.
pub fn test_config(deadline: Duration) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.timeouts.request_ms = deadline.as_millis() as u64;
    config
}

/// Freeze `router` and wrap it in the full axum stack.
pub fn app(config: ServerConfig, router: Router) -> axum::Router {
    let dispatcher = router.into_dispatcher(&config);
    HttpServer::new(config, dispatcher).router()
}

/// Drive one request through the stack without a socket.
pub async fn send(app: &axum::Router, request: Request<Body>) -> (Response<Body>, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    (
        Response::from_parts(parts, Body::empty()),
        String::from_utf8(bytes.to_vec()).unwrap(),
    )
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}
