//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router that funnels every request into the dispatcher
//! - Wire up middleware (tracing, request ID, body limit)
//! - Serve on a bound listener until the shutdown signal
//! - Bound the graceful drain of in-flight connections

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::lifecycle::ShutdownListener;
use crate::pipeline::Dispatcher;

/// HTTP server for the dispatch engine.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server around a frozen dispatcher.
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        let router = Self::build_router(&config, Arc::new(dispatcher));
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(dispatcher)
            .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The Axum router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires, then drain for at most `timeouts.shutdown_secs`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let grace = Duration::from_secs(self.config.timeouts.shutdown_secs);
        let (draining_tx, draining_rx) = oneshot::channel::<()>();

        let server = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
                let _ = draining_tx.send(());
            })
            .into_future();

        let deadline = async move {
            match draining_rx.await {
                Ok(()) => tokio::time::sleep(grace).await,
                Err(_) => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = server => result?,
            _ = deadline => {
                tracing::warn!(grace_secs = grace.as_secs(), "Drain period elapsed, closing remaining connections");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request<Body>,
) -> Response {
    dispatcher.handle(request).await
}
