//! Static file short-circuit.
//!
//! When the request path names a regular file under the configured root,
//! the file is written as the response and the chain is aborted so no
//! route handler runs.

use std::path::{Component, Path, PathBuf};

use axum::http::{header, HeaderValue};

use crate::pipeline::Context;
use crate::routing::trie::segments;

/// Serve files from `root` ahead of routed handlers.
pub fn static_files(root: impl Into<PathBuf>) -> impl Fn(&mut Context) + Send + Sync + 'static {
    let root = root.into();
    move |ctx: &mut Context| {
        let Some(file) = resolve(&root, ctx.path()) else {
            return;
        };
        match std::fs::read(&file) {
            Ok(bytes) => {
                ctx.set_header(header::CONTENT_TYPE, HeaderValue::from_static(content_type(&file)));
                ctx.write_bytes(&bytes);
                tracing::debug!(request_id = %ctx.request_id(), file = %file.display(), "Served static file");
                ctx.abort();
            }
            Err(e) => {
                tracing::warn!(request_id = %ctx.request_id(), file = %file.display(), error = %e, "Failed to read static file");
            }
        }
    }
}

/// Map a request path onto a regular file below `root`.
///
/// Segments are percent-decoded; any that decodes to `.`, `..` or
/// something containing a separator rejects the whole path.
fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for segment in segments(request_path) {
        if segment.is_empty() {
            continue;
        }
        if segment == "." || segment == ".." || segment.contains(['/', '\\', '\0']) {
            return None;
        }
        relative.push(&*segment);
    }
    if relative.as_os_str().is_empty()
        || relative.components().any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    let candidate = root.join(relative);
    candidate.is_file().then_some(candidate)
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
