//! Per-request execution context and handler chain.
//!
//! # Responsibilities
//! - Drive the ordered handler sequence with an explicit cursor
//! - Expose request data, path parameters and a request-scoped store
//! - Buffer everything handlers write into the shared response
//!
//! # Design Decisions
//! - `next` is an iterative loop; handlers nest by calling it themselves,
//!   and control never returns to a central scheduler between handlers
//! - `abort` moves the cursor past the end, stopping every active `next`
//! - The timeout flag is shared with the supervisor and only advisory

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ContextError;
use crate::http::render;
use crate::http::{RequestData, ResponseWriter, UploadedFile};
use crate::routing::PathParams;

/// A handler or middleware.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync + 'static>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Cooperative cancellation flag shared between a chain and its supervisor.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type Value = Arc<dyn Any + Send + Sync>;

/// State for one request's trip through the handler chain.
pub struct Context {
    request: Arc<RequestData>,
    response: ResponseWriter,
    path_params: PathParams,
    values: RwLock<HashMap<String, Value>>,
    timed_out: CancelFlag,
    handlers: Vec<Handler>,
    cursor: usize,
}

impl Context {
    pub fn new(request: Arc<RequestData>, handlers: Vec<Handler>, path_params: PathParams) -> Self {
        Self {
            request,
            response: ResponseWriter::new(),
            path_params,
            values: RwLock::new(HashMap::new()),
            timed_out: CancelFlag::new(),
            handlers,
            cursor: 0,
        }
    }

    /// Run the remaining handlers in order.
    ///
    /// A handler may call `next` itself to wrap the rest of the chain;
    /// when it returns, the outer loop finds the cursor exhausted.
    pub fn next(&mut self) {
        while let Some(handler) = self.handlers.get(self.cursor).cloned() {
            self.cursor += 1;
            handler(self);
        }
    }

    /// Stop the chain. Handlers after the current one never run.
    pub fn abort(&mut self) {
        self.cursor = self.handlers.len();
    }

    /// True once the cursor is past the last handler.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.handlers.len()
    }

    /// True once the supervisor gave up on this request.
    pub fn is_timed_out(&self) -> bool {
        self.timed_out.is_set()
    }

    pub fn set_timed_out(&self, timed_out: bool) {
        self.timed_out.set(timed_out);
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.timed_out.clone()
    }

    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    // Request accessors

    pub fn request(&self) -> &RequestData {
        &self.request
    }

    pub fn request_id(&self) -> &str {
        self.request.request_id()
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn path(&self) -> &str {
        self.request.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.request.query_value(key)
    }

    pub fn queries(&self) -> &HashMap<String, Vec<String>> {
        self.request.queries()
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.request.form_value(key)
    }

    pub fn form_file(&self, key: &str) -> Result<&UploadedFile, ContextError> {
        self.request.form_file(key)
    }

    /// Decode the request body as JSON.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, ContextError> {
        Ok(serde_json::from_slice(self.request.body())?)
    }

    // Request-scoped store

    /// Read a value stored by an earlier handler, or `default` when the key
    /// is missing or holds a different type.
    pub fn get_value<T>(&self, key: &str, default: T) -> T
    where
        T: Any + Clone + Send + Sync,
    {
        self.values
            .read()
            .get(key)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
            .unwrap_or(default)
    }

    pub fn set_value<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.values.write().insert(key.into(), Arc::new(value));
    }

    // Response writers

    pub fn write_header(&self, status: StatusCode) {
        self.response.write_header(status);
    }

    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.response.append_header(name, value);
    }

    pub fn write_bytes(&self, bytes: &[u8]) {
        self.response.write(bytes);
    }

    pub fn write_string(&self, s: &str) {
        self.response.write(s.as_bytes());
    }

    /// Encode `data` as JSON. Encoding failures answer 500.
    pub fn write_json<T: Serialize + ?Sized>(&self, data: &T) {
        match serde_json::to_vec(data) {
            Ok(body) => {
                self.set_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                self.response.write(&body);
            }
            Err(e) => {
                tracing::error!(request_id = %self.request_id(), error = %e, "Failed to encode json response");
                self.write_header(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    /// Write `callback(<json>)` as a script response.
    pub fn jsonp<T: Serialize + ?Sized>(&self, callback: &str, data: &T) -> Result<(), ContextError> {
        let body = render::jsonp(callback, data)?;
        self.set_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/javascript"),
        );
        self.response.write(&body);
        Ok(())
    }

    /// Render the template at `path` with `data`. Failures answer 500.
    pub fn execute_template<T: Serialize + ?Sized>(&self, path: &str, data: &T) {
        if let Err(e) = self.try_execute_template(path, data) {
            tracing::error!(request_id = %self.request_id(), template = %path, error = %e, "Template rendering failed");
            self.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    fn try_execute_template<T: Serialize + ?Sized>(&self, path: &str, data: &T) -> Result<(), ContextError> {
        let source = std::fs::read_to_string(path)?;
        let value = serde_json::to_value(data)?;
        let body = render::render_template(&source, &value)?;
        self.set_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        self.response.write(body.as_bytes());
        Ok(())
    }
}
