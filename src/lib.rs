//! Trie-routed HTTP dispatch engine library.

pub mod config;
pub mod controllers;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod pipeline;
pub mod routing;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{Context, Dispatcher};
pub use routing::Router;
