//! Response buffering.
//!
//! # Responsibilities
//! - Collect status, headers and body written by the handler chain
//! - Produce exactly one `Response` per request
//! - Drop writes that arrive after the response was sent
//!
//! # Design Decisions
//! - The buffer is shared between the chain and its supervisor; whoever
//!   seals it first decides what the client sees
//! - First status wins; writing a body implies 200 when no status was set
//! - A fallback replaces anything the chain buffered

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Buffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    sealed: bool,
}

/// Shared handle to one request's response buffer.
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    inner: Arc<Mutex<Buffer>>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status code. Ignored if a status or body was already written.
    pub fn write_header(&self, status: StatusCode) -> bool {
        let mut buf = self.inner.lock();
        if buf.sealed {
            tracing::warn!(status = %status, "Response already sent, dropping status write");
            return false;
        }
        if buf.status.is_some() {
            tracing::debug!(status = %status, "Superfluous status write ignored");
            return false;
        }
        buf.status = Some(status);
        true
    }

    /// Append a header value.
    pub fn append_header(&self, name: HeaderName, value: HeaderValue) -> bool {
        let mut buf = self.inner.lock();
        if buf.sealed {
            tracing::warn!(header = %name, "Response already sent, dropping header write");
            return false;
        }
        buf.headers.append(name, value);
        true
    }

    /// Append body bytes.
    pub fn write(&self, bytes: &[u8]) -> bool {
        let mut buf = self.inner.lock();
        if buf.sealed {
            tracing::warn!(len = bytes.len(), "Response already sent, dropping body write");
            return false;
        }
        buf.status.get_or_insert(StatusCode::OK);
        buf.body.extend_from_slice(bytes);
        true
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.lock().sealed
    }

    /// Seal the buffer and turn what the chain wrote into a response.
    ///
    /// Returns `None` if it was already sealed.
    pub fn finish(&self) -> Option<Response> {
        let mut buf = self.inner.lock();
        if buf.sealed {
            return None;
        }
        buf.sealed = true;

        let status = buf.status.unwrap_or(StatusCode::OK);
        let mut headers = std::mem::take(&mut buf.headers);
        let body = std::mem::take(&mut buf.body);
        if !body.is_empty() && !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
        }

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Some(response)
    }

    /// Seal the buffer, discard its contents and answer with a fixed body.
    ///
    /// Returns `None` if it was already sealed.
    pub fn fallback(&self, status: StatusCode, body: &'static str) -> Option<Response> {
        let mut buf = self.inner.lock();
        if buf.sealed {
            return None;
        }
        buf.sealed = true;
        buf.headers.clear();
        buf.body.clear();

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_finish_collects_writes() {
        let writer = ResponseWriter::new();
        writer.write(b"hello ");
        writer.write(b"world");

        let response = writer.finish().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "hello world");
    }

    #[test]
    fn test_first_status_wins() {
        let writer = ResponseWriter::new();
        assert!(writer.write_header(StatusCode::CREATED));
        assert!(!writer.write_header(StatusCode::NOT_FOUND));
        assert_eq!(writer.finish().unwrap().status(), StatusCode::CREATED);
    }

    #[test]
    fn test_body_write_implies_ok() {
        let writer = ResponseWriter::new();
        writer.write(b"x");
        assert!(!writer.write_header(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(writer.finish().unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sealed_once() {
        let writer = ResponseWriter::new();
        writer.write(b"partial");

        let response = writer.fallback(StatusCode::GATEWAY_TIMEOUT, "timeout").unwrap();
        assert!(writer.finish().is_none());
        assert!(writer.fallback(StatusCode::INTERNAL_SERVER_ERROR, "panic").is_none());
        assert!(!writer.write(b"late"));

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_text(response).await, "timeout");
    }
}
