//! Per-request entry point.
//!
//! # Responsibilities
//! - Normalize the path and resolve method + path in the routing table
//! - Assemble middlewares + matched (or not-found) handler
//! - Hand the fresh context to the supervisor and record the outcome
//!
//! # Design Decisions
//! - Routing table and middleware list are immutable and shared by `Arc`
//! - Unmatched requests carry no path parameters

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::{RequestData, X_REQUEST_ID};
use crate::observability::metrics;
use crate::pipeline::context::{Context, Handler};
use crate::pipeline::supervisor::Supervisor;
use crate::routing::{normalize_path, Method, PathParams, RoutingTable};

pub struct Dispatcher {
    table: RoutingTable<Handler>,
    middlewares: Arc<[Handler]>,
    not_found: Handler,
    supervisor: Supervisor,
    max_body_bytes: usize,
}

impl Dispatcher {
    pub fn new(
        table: RoutingTable<Handler>,
        middlewares: Vec<Handler>,
        not_found: Handler,
        supervisor: Supervisor,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            table,
            middlewares: middlewares.into(),
            not_found,
            supervisor,
            max_body_bytes,
        }
    }

    /// Buffer an inbound HTTP request and dispatch it.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        match RequestData::from_request(request, self.max_body_bytes).await {
            Ok(data) => self.dispatch(data).await,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected request before dispatch");
                (e.status(), e.to_string()).into_response()
            }
        }
    }

    /// Resolve the route, build the chain and run it under supervision.
    pub async fn dispatch(&self, request: RequestData) -> Response {
        let start = Instant::now();
        let path = normalize_path(request.path()).to_string();
        let method = request.method().clone();
        let request_id = request.request_id().to_string();

        let (target, params) = match Method::from_http(&method)
            .and_then(|m| self.table.lookup(m, &path))
        {
            Some(matched) => (matched.value.clone(), matched.params),
            None => {
                tracing::debug!(request_id = %request_id, method = %method, path = %path, "No route matched");
                (self.not_found.clone(), PathParams::default())
            }
        };

        let mut chain = Vec::with_capacity(self.middlewares.len() + 1);
        chain.extend(self.middlewares.iter().cloned());
        chain.push(target);

        let ctx = Context::new(Arc::new(request), chain, params);
        let (outcome, mut response) = self.supervisor.run(ctx).await;

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().entry(X_REQUEST_ID).or_insert(value);
        }

        let status: StatusCode = response.status();
        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            outcome = outcome.as_str(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request dispatched"
        );
        metrics::record_request(method.as_str(), status.as_u16(), outcome, start);

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Bytes;
    use axum::http::{HeaderMap, Uri};
    use parking_lot::Mutex;

    use crate::pipeline::context::handler;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &'static str) -> RequestData {
        RequestData::new(axum::http::Method::GET, Uri::from_static(uri), HeaderMap::new(), Bytes::new())
    }

    fn dispatcher(table: RoutingTable<Handler>, middlewares: Vec<Handler>) -> Dispatcher {
        let not_found = handler(|ctx| {
            let params = ctx.path_params().len();
            ctx.write_header(StatusCode::NOT_FOUND);
            ctx.write_string(&format!("missing:{params}"));
        });
        Dispatcher::new(table, middlewares, not_found, Supervisor::new(Duration::from_secs(5)), 1024)
    }

    #[tokio::test]
    async fn test_params_reach_handler() {
        let mut table = RoutingTable::new();
        table
            .register(
                Method::Get,
                "/list/:item_id/:item_name",
                handler(|ctx| {
                    let body = format!(
                        "{}={}",
                        ctx.path_param("item_id").unwrap_or_default(),
                        ctx.path_param("item_name").unwrap_or_default()
                    );
                    ctx.write_string(&body);
                }),
            )
            .unwrap();

        let response = dispatcher(table, Vec::new()).dispatch(get("/list/42/widgets/")).await;
        assert_eq!(body_text(response).await, "42=widgets");
    }

    #[tokio::test]
    async fn test_unmatched_uses_not_found() {
        let mut table = RoutingTable::new();
        table.register(Method::Get, "/users/:id", handler(|ctx| ctx.write_string("user"))).unwrap();

        let response = dispatcher(table, Vec::new()).dispatch(get("/nowhere/1")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "missing:0");
    }

    #[tokio::test]
    async fn test_unsupported_method_uses_not_found() {
        let mut table = RoutingTable::new();
        table.register(Method::Get, "/users", handler(|ctx| ctx.write_string("user"))).unwrap();
        let request = RequestData::new(
            axum::http::Method::OPTIONS,
            Uri::from_static("/users"),
            HeaderMap::new(),
            Bytes::new(),
        );

        let response = dispatcher(table, Vec::new()).dispatch(request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_middlewares_run_before_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (first, second, last) = (log.clone(), log.clone(), log.clone());
        let mut table = RoutingTable::new();
        table
            .register(Method::Get, "/users", handler(move |_ctx| last.lock().push("handler")))
            .unwrap();
        let middlewares = vec![
            handler(move |_ctx| first.lock().push("first")),
            handler(move |_ctx| second.lock().push("second")),
        ];

        let response = dispatcher(table, middlewares).dispatch(get("/users")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock(), vec!["first", "second", "handler"]);
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }
}
