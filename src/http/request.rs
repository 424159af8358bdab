//! Request handling and transformation.
//!
//! # Responsibilities
//! - Read the request ID assigned by the request-id layer
//! - Buffer the body under the configured size limit
//! - Parse query string, urlencoded forms and multipart uploads
//!
//! # Design Decisions
//! - Everything a handler can read is materialized before the chain
//!   starts, so handlers stay synchronous
//! - Multipart failures are kept and reported when a handler asks for
//!   form data, not at dispatch time

use std::collections::HashMap;
use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart};
use axum::http::{header, HeaderMap, HeaderName, Method, Request, Uri};
use futures_util::StreamExt;
use tower::{service_fn, Layer, ServiceExt};

use crate::error::{ContextError, RequestError};

/// Header carrying the per-request correlation identifier.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// A file received in a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub data: Bytes,
    pub filename: String,
    pub headers: HeaderMap,
    pub size: u64,
}

#[derive(Debug, Default)]
struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, UploadedFile>,
}

/// Everything the handler chain can read about the inbound request.
#[derive(Debug)]
pub struct RequestData {
    request_id: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: HashMap<String, Vec<String>>,
    body: Bytes,
    form: HashMap<String, Vec<String>>,
    multipart: Result<MultipartForm, String>,
}

impl RequestData {
    /// Build from parts with an already-buffered body.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let request_id = headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let query = parse_pairs(uri.query().unwrap_or_default().as_bytes());

        let mut form = HashMap::new();
        if is_content_type(&headers, "application/x-www-form-urlencoded") {
            merge(&mut form, parse_pairs(&body));
        }
        merge(&mut form, query.clone());

        Self {
            request_id,
            method,
            uri,
            headers,
            query,
            body,
            form,
            multipart: Ok(MultipartForm::default()),
        }
    }

    /// Buffer an axum request. Multipart bodies are parsed eagerly.
    ///
    /// `limit` caps every body. An oversized plain body is rejected; an
    /// oversized multipart body is kept as a multipart error.
    pub async fn from_request(request: Request<Body>, limit: usize) -> Result<Self, RequestError> {
        if is_content_type(request.headers(), "multipart/form-data") {
            let (parts, body) = request.into_parts();
            let mut data = Self::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone(), Bytes::new());
            let request = Request::from_parts(parts, body);
            data.multipart = read_multipart_limited(request, limit).await;
            if let Ok(form) = &data.multipart {
                let mut fields = form.fields.clone();
                merge(&mut fields, std::mem::take(&mut data.form));
                data.form = fields;
            }
            return Ok(data);
        }

        let (parts, body) = request.into_parts();
        let body = read_limited(body, limit).await?;

        Ok(Self::new(parts.method, parts.uri, parts.headers, body))
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn queries(&self) -> &HashMap<String, Vec<String>> {
        &self.query
    }

    /// First value for `key` in the query string.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        first(&self.query, key)
    }

    /// First value for `key` across body form fields and the query string.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        first(&self.form, key)
    }

    pub fn form_file(&self, key: &str) -> Result<&UploadedFile, ContextError> {
        match &self.multipart {
            Ok(form) => form
                .files
                .get(key)
                .ok_or_else(|| ContextError::MissingFile(key.to_string())),
            Err(e) => Err(ContextError::Multipart(e.clone())),
        }
    }
}

async fn read_limited(body: Body, limit: usize) -> Result<Bytes, RequestError> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| RequestError::Body(e.to_string()))?;
        if buf.len() + chunk.len() > limit {
            return Err(RequestError::BodyTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}

fn first<'a>(map: &'a HashMap<String, Vec<String>>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(|v| v.first()).map(String::as_str)
}

fn parse_pairs(input: &[u8]) -> HashMap<String, Vec<String>> {
    let mut pairs: HashMap<String, Vec<String>> = HashMap::new();
    for (k, v) in url::form_urlencoded::parse(input) {
        pairs.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    pairs
}

fn merge(into: &mut HashMap<String, Vec<String>>, from: HashMap<String, Vec<String>>) {
    for (k, mut v) in from {
        into.entry(k).or_default().append(&mut v);
    }
}

fn is_content_type(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case(expected))
}

/// Parse a multipart body with `limit` installed as axum's body limit.
async fn read_multipart_limited(request: Request<Body>, limit: usize) -> Result<MultipartForm, String> {
    let service = DefaultBodyLimit::max(limit).layer(service_fn(|request: Request<Body>| async move {
        Ok::<_, Infallible>(read_multipart(request).await)
    }));
    match service.oneshot(request).await {
        Ok(form) => form,
        Err(never) => match never {},
    }
}

async fn read_multipart(request: Request<Body>) -> Result<MultipartForm, String> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| e.body_text())?;
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let headers = field.headers().clone();
                let data = field.bytes().await.map_err(|e| e.body_text())?;
                form.files.insert(
                    name,
                    UploadedFile {
                        size: data.len() as u64,
                        data,
                        filename,
                        headers,
                    },
                );
            }
            None => {
                let text = field.text().await.map_err(|e| e.body_text())?;
                form.fields.entry(name).or_default().push(text);
            }
        }
    }

    Ok(form)
}
