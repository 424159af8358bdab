//! Per-method routing tables.
//!
//! # Responsibilities
//! - Hold one [`PathTrie`] per supported method
//! - Reject a second registration at the same method and path
//! - Resolve method + path into a bound value and its parameters
//!
//! # Design Decisions
//! - Paths are normalized the same way at registration and lookup
//! - Immutable after startup; shared across requests without locking

use std::collections::HashMap;

use crate::error::RouteError;
use crate::routing::normalize_path;
use crate::routing::trie::{PathTrie, RouteMatch};
use crate::routing::Method;

#[derive(Debug)]
pub struct RoutingTable<T> {
    tries: HashMap<Method, PathTrie<T>>,
}

impl<T> Default for RoutingTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RoutingTable<T> {
    pub fn new() -> Self {
        Self {
            tries: Method::ALL.into_iter().map(|m| (m, PathTrie::new())).collect(),
        }
    }

    /// Bind `value` at `method` + `path`.
    pub fn register(&mut self, method: Method, path: &str, value: T) -> Result<(), RouteError> {
        let path = normalize_path(path);
        self.tries
            .entry(method)
            .or_default()
            .insert(path, value)
            .map(|_| ())
            .map_err(|_| RouteError::Duplicate {
                method,
                path: path.to_string(),
            })
    }

    pub fn lookup(&self, method: Method, path: &str) -> Option<RouteMatch<'_, T>> {
        self.tries.get(&method)?.resolve(normalize_path(path))
    }

    pub fn trie(&self, method: Method) -> Option<&PathTrie<T>> {
        self.tries.get(&method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut table = RoutingTable::new();
        table.register(Method::Get, "/users/:id", "first").unwrap();

        let err = table.register(Method::Get, "/users/:id/", "second").unwrap_err();
        assert!(matches!(
            err,
            RouteError::Duplicate { method: Method::Get, ref path } if path == "/users/:id"
        ));
        assert_eq!(*table.lookup(Method::Get, "/users/1").unwrap().value, "first");
    }

    #[test]
    fn test_methods_are_independent() {
        let mut table = RoutingTable::new();
        table.register(Method::Get, "/post", "get").unwrap();
        table.register(Method::Post, "/post", "post").unwrap();

        assert_eq!(*table.lookup(Method::Get, "/post").unwrap().value, "get");
        assert_eq!(*table.lookup(Method::Post, "/post/").unwrap().value, "post");
        assert!(table.lookup(Method::Delete, "/post").is_none());
    }

    #[test]
    fn test_root_route() {
        let mut table = RoutingTable::new();
        table.register(Method::Get, "/", "top").unwrap();

        assert_eq!(*table.lookup(Method::Get, "/").unwrap().value, "top");
    }
}
