//! Caller identity.

use axum::http::HeaderName;

use crate::pipeline::Context;

/// Store key holding the caller identity as a `String`.
pub const AUTH_USER: &str = "AuthUser";

/// Record the caller identity from `header`, falling back to `default_user`.
pub fn auth_user(
    header: HeaderName,
    default_user: impl Into<String>,
) -> impl Fn(&mut Context) + Send + Sync + 'static {
    let default_user = default_user.into();
    move |ctx: &mut Context| {
        let user = ctx
            .headers()
            .get(&header)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_user.clone());
        ctx.set_value(AUTH_USER, user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Bytes;
    use axum::http::{HeaderMap, HeaderValue, Method, Uri};

    use crate::http::RequestData;
    use crate::pipeline::handler;
    use crate::routing::PathParams;

    fn run(headers: HeaderMap) -> String {
        let request = RequestData::new(Method::GET, Uri::from_static("/"), headers, Bytes::new());
        let seen = Arc::new(parking_lot::Mutex::new(String::new()));
        let sink = seen.clone();
        let chain = vec![
            handler(auth_user(HeaderName::from_static("x-auth-user"), "test")),
            handler(move |ctx| *sink.lock() = ctx.get_value(AUTH_USER, String::new())),
        ];
        let mut ctx = Context::new(Arc::new(request), chain, PathParams::default());
        ctx.next();
        let user = seen.lock().clone();
        user
    }

    #[test]
    fn test_default_user() {
        assert_eq!(run(HeaderMap::new()), "test");
    }

    #[test]
    fn test_header_user() {
        let mut headers = HeaderMap::new();
        headers.insert("x-auth-user", HeaderValue::from_static("alice"));
        assert_eq!(run(headers), "alice");
    }
}
