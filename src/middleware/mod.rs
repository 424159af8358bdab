//! Built-in middlewares.
//!
//! Each constructor returns a closure ready for `Router::use_middleware`.
//! Middlewares that want to wrap the rest of the chain call `ctx.next()`
//! themselves; the others simply return and the chain continues.

pub mod auth;
pub mod static_files;
pub mod time_cost;

pub use auth::{auth_user, AUTH_USER};
pub use static_files::static_files;
pub use time_cost::time_cost;
