//! Chain timing.

use std::time::Instant;

use crate::observability::metrics;
use crate::pipeline::Context;

/// Wrap the remainder of the chain and log how long it took.
pub fn time_cost(ctx: &mut Context) {
    let start = Instant::now();
    ctx.next();
    let elapsed = start.elapsed();

    tracing::info!(
        request_id = %ctx.request_id(),
        path = %ctx.path(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Time cost"
    );
    metrics::record_chain_duration(elapsed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, Uri};
    use parking_lot::Mutex;

    use crate::http::RequestData;
    use crate::pipeline::handler;
    use crate::routing::PathParams;

    #[test]
    fn test_wraps_rest_of_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (before, inner, after) = (log.clone(), log.clone(), log.clone());
        let chain = vec![
            handler(move |ctx| {
                before.lock().push("outer:before");
                time_cost(ctx);
                after.lock().push("outer:after");
            }),
            handler(move |_ctx| inner.lock().push("handler")),
        ];
        let request = RequestData::new(Method::GET, Uri::from_static("/"), HeaderMap::new(), Bytes::new());
        let mut ctx = Context::new(Arc::new(request), chain, PathParams::default());

        ctx.next();
        assert_eq!(*log.lock(), vec!["outer:before", "handler", "outer:after"]);
        assert!(ctx.is_exhausted());
    }
}
