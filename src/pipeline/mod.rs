//! Request execution subsystem.
//!
//! # Data Flow
//! ```text
//! RequestData
//!     → dispatcher.rs (route lookup, chain assembly)
//!     → context.rs (cursor over middlewares + handler)
//!     → supervisor.rs (deadline / panic race on a blocking worker)
//!     → one Response
//! ```
//!
//! # Design Decisions
//! - Handlers are synchronous and run off the connection task
//! - Execution order is exactly middlewares (registration order), then
//!   the resolved handler
//! - Cancellation is cooperative through the context's timeout flag

pub mod context;
pub mod dispatcher;
pub mod supervisor;

pub use context::{handler, CancelFlag, Context, Handler};
pub use dispatcher::Dispatcher;
pub use supervisor::{Outcome, Supervisor, PANIC_BODY, TIMEOUT_BODY};
