//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (buffer body, parse query / form / multipart)
//!     → [pipeline dispatches the handler chain]
//!     → response.rs (buffered writes, sealed once)
//!     → Send to client
//! ```

pub mod render;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestData, UploadedFile, X_REQUEST_ID};
pub use response::ResponseWriter;
pub use server::HttpServer;
