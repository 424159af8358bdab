//! Route registration.
//!
//! # Responsibilities
//! - Collect routes, middlewares and the not-found handler at startup
//! - Fail fast on duplicate method + path registrations
//! - Freeze everything into an immutable [`Dispatcher`]
//!
//! # Design Decisions
//! - Registration returns `Result`; startup propagates it and aborts
//! - Middlewares are append-only and run in registration order

use std::time::Duration;

use axum::http::StatusCode;

use crate::config::ServerConfig;
use crate::error::RouteError;
use crate::pipeline::{handler, Context, Dispatcher, Handler, Supervisor};
use crate::routing::{Method, RoutingTable};

pub struct Router {
    table: RoutingTable<Handler>,
    middlewares: Vec<Handler>,
    not_found: Handler,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            table: RoutingTable::new(),
            middlewares: Vec::new(),
            not_found: handler(default_not_found),
        }
    }

    /// Register `f` at `method` + `path`.
    pub fn route<F>(&mut self, method: Method, path: &str, f: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.table.register(method, path, handler(f))?;
        tracing::debug!(method = %method, path = %path, "Route registered");
        Ok(self)
    }

    pub fn get<F>(&mut self, path: &str, f: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Get, path, f)
    }

    pub fn post<F>(&mut self, path: &str, f: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Post, path, f)
    }

    pub fn put<F>(&mut self, path: &str, f: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Put, path, f)
    }

    pub fn delete<F>(&mut self, path: &str, f: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Delete, path, f)
    }

    pub fn patch<F>(&mut self, path: &str, f: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Patch, path, f)
    }

    /// Append a middleware; it runs before every handler.
    pub fn use_middleware<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.middlewares.push(handler(f));
        self
    }

    /// Replace the handler used when no route matches.
    pub fn use_not_found<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.not_found = handler(f);
        self
    }

    pub fn table(&self) -> &RoutingTable<Handler> {
        &self.table
    }

    /// Freeze into a dispatcher using the configured deadline and body limit.
    pub fn into_dispatcher(self, config: &ServerConfig) -> Dispatcher {
        Dispatcher::new(
            self.table,
            self.middlewares,
            self.not_found,
            Supervisor::new(Duration::from_millis(config.timeouts.request_ms)),
            config.limits.max_body_bytes,
        )
    }
}

fn default_not_found(ctx: &mut Context) {
    ctx.write_header(StatusCode::NOT_FOUND);
    tracing::info!(request_id = %ctx.request_id(), path = %ctx.path(), "page not found");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_route_is_fatal() {
        let mut router = Router::new();
        router.get("/users", |ctx| ctx.write_string("first")).unwrap();
        router.post("/users", |ctx| ctx.write_string("post")).unwrap();

        let err = router.get("/users/", |ctx| ctx.write_string("second")).err().unwrap();
        assert!(matches!(err, RouteError::Duplicate { method: Method::Get, .. }));
        assert!(router.table().lookup(Method::Get, "/users").is_some());
    }

    #[test]
    fn test_chained_registration() {
        let mut router = Router::new();
        router
            .get("/a", |_| {})
            .and_then(|r| r.put("/a", |_| {}))
            .and_then(|r| r.delete("/a", |_| {}))
            .and_then(|r| r.patch("/a/:id", |_| {}))
            .unwrap();

        assert!(router.table().lookup(Method::Patch, "/a/1").is_some());
        assert!(router.table().lookup(Method::Post, "/a").is_none());
    }

    #[test]
    fn test_renamed_param_route_is_duplicate() {
        let mut router = Router::new();
        router.get("/u/:id", |ctx| ctx.write_string("id")).unwrap();

        let err = router.get("/u/:name", |ctx| ctx.write_string("name")).err().unwrap();
        assert!(matches!(err, RouteError::Duplicate { method: Method::Get, ref path } if path == "/u/:name"));
        let matched = router.table().lookup(Method::Get, "/u/x").unwrap();
        assert_eq!(matched.params.get("id"), Some("x"));
    }
}
