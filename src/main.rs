//! Trie-routed HTTP dispatch engine.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum (request id, trace, body limit)
//!                       │
//!                       ▼
//!                   Dispatcher ── method + path ──▶ RoutingTable (prefix trie)
//!                       │
//!                       ▼
//!                   Supervisor ── deadline / panic / completion race
//!                       │
//!                       ▼
//!          [auth_user] → [time_cost] → [static_files] → route handler
//!                       │
//!     Client Response   ▼
//!     ◀────────────── ResponseWriter (sealed once)
//! ```

use std::path::PathBuf;

use axum::http::HeaderName;
use clap::Parser;

use trie_dispatch::config::{load_config, validate_config, ConfigError, ServerConfig};
use trie_dispatch::controllers;
use trie_dispatch::lifecycle::startup;
use trie_dispatch::middleware::{auth_user, static_files, time_cost};
use trie_dispatch::observability::logging;
use trie_dispatch::routing::Router;

#[derive(Parser)]
#[command(name = "trie-dispatch")]
#[command(about = "Minimal trie-routed HTTP dispatch engine", long_about = None)]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host address for web server
    #[arg(long)]
    host: Option<String>,

    /// Port number for web server
    #[arg(short, long)]
    port: Option<u16>,
}

fn resolve_config(args: &Args) -> Result<ServerConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = &args.host {
        config.listener.host = host.clone();
    }
    if let Some(port) = args.port {
        config.listener.port = port;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = resolve_config(&args)?;
    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address(),
        request_ms = config.timeouts.request_ms,
        "Configuration loaded"
    );

    let mut router = Router::new();
    controllers::register(&mut router, &config.static_files.dir)?;
    router
        .use_middleware(auth_user(
            HeaderName::from_bytes(config.auth.header.as_bytes())?,
            config.auth.default_user.clone(),
        ))
        .use_middleware(time_cost);
    if config.static_files.enabled {
        router.use_middleware(static_files(&config.static_files.dir));
    }
    router.use_not_found(|ctx| {
        ctx.write_header(axum::http::StatusCode::NOT_FOUND);
        ctx.write_string("page is not found...");
    });

    startup::run(config, router).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
