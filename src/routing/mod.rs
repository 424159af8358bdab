//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     router.rs (get/post/... builder)
//!     → table.rs (one trie per method, duplicate check)
//!     → trie.rs (segment nodes, literal and :param children)
//!     → Freeze into the Dispatcher
//!
//! Lookup (per request):
//!     method + normalized path
//!     → table.rs → trie.rs search (literal first, then params)
//!     → RouteMatch { handler, path params } or no match
//! ```
//!
//! # Design Decisions
//! - Routes are fixed at startup, immutable at runtime
//! - Deterministic: literal segments beat parameters at every depth
//! - Duplicate registration is an error, never an overwrite

pub mod method;
pub mod router;
pub mod table;
pub mod trie;

pub use method::Method;
pub use router::Router;
pub use table::RoutingTable;
pub use trie::{NodeId, OccupiedError, PathParams, PathTrie, RouteMatch, PARAM_MARKER};

/// Strip one trailing path separator.
pub fn normalize_path(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}
