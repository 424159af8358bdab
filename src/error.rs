//! Error types shared across subsystems.

use axum::http::StatusCode;
use thiserror::Error;

use crate::routing::Method;

/// Route registration failures. All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A handler is already bound at this method and path.
    #[error("{method} {path}: handler already exists")]
    Duplicate { method: Method, path: String },

    /// The method is not one of GET/POST/PUT/DELETE/PATCH.
    #[error("unsupported method `{0}`")]
    UnsupportedMethod(String),
}

/// Failures surfaced to handlers through the context capability interface.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no uploaded file named `{0}`")]
    MissingFile(String),

    #[error("malformed multipart body: {0}")]
    Multipart(String),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Template rendering failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated tag starting at byte {0}")]
    Unterminated(usize),
}

/// Failures while turning an inbound request into [`RequestData`](crate::http::RequestData).
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Body(String),
}

impl RequestError {
    /// Status code reported to the client for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::Body(_) => StatusCode::BAD_REQUEST,
        }
    }
}
