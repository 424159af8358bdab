//! Serving over a real socket.

mod common;

use std::time::Duration;

use tokio::net::TcpListener;

use common::test_config;
use trie_dispatch::routing::Router;
use trie_dispatch::{HttpServer, Shutdown};

#[tokio::test]
async fn test_serves_until_shutdown() {
    let mut router = Router::new();
    router
        .get("/students", |ctx| {
            let name = ctx.query_value("name").unwrap_or_default().to_string();
            ctx.write_string(&name);
        })
        .unwrap();
    let mut config = test_config(Duration::from_secs(5));
    config.timeouts.shutdown_secs = 1;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let dispatcher = router.into_dispatcher(&config);
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, dispatcher);
    let handle = tokio::spawn(server.run(listener, shutdown.listener()));

    let response = reqwest::get(format!("http://{addr}/students?name=ada")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ada");

    let response = reqwest::get(format!("http://{addr}/missing")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_slow_request_times_out_over_http() {
    let mut router = Router::new();
    router
        .get("/users", |ctx| {
            std::thread::sleep(Duration::from_millis(200));
            if !ctx.is_timed_out() {
                ctx.write_string("users");
            }
        })
        .unwrap();
    let config = test_config(Duration::from_millis(50));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config.clone(), router.into_dispatcher(&config));
    tokio::spawn(server.run(listener, shutdown.listener()));

    let response = reqwest::get(format!("http://{addr}/users")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response.text().await.unwrap(), "timeout");

    shutdown.trigger();
}
