//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, supervisor, middlewares produce:
//!     → logging.rs (structured log events with request_id)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (human or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log event of a request
//! - Handler panic details are logged, never returned to clients
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
