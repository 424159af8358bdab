//! Segment trie for path matching.
//!
//! # Responsibilities
//! - Store values keyed by "/"-separated paths
//! - Match literal segments and `:name` parameter segments
//! - Rebuild parameter bindings from a matched leaf
//!
//! # Design Decisions
//! - Nodes live in an arena; parents are back-references by index
//! - Literal children are checked before parameter children, and
//!   parameter children in insertion order, so matching never depends
//!   on map iteration order
//! - Search backtracks: a branch that cannot consume every segment does
//!   not hide a sibling branch that can
//! - Segments are percent-decoded after splitting, both when inserting
//!   and when searching
//! - Routes with the same shape (placeholders compare equal whatever
//!   their names) are duplicates

use std::borrow::Cow;
use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Prefix marking a parameter segment (`:id`).
pub const PARAM_MARKER: char = ':';

/// Returns true if `segment` is a parameter placeholder.
pub fn is_param(segment: &str) -> bool {
    segment.starts_with(PARAM_MARKER)
}

/// Split `path` on `/` and percent-decode each segment.
///
/// Splitting happens first, so an encoded `%2F` stays inside its segment.
pub fn segments(path: &str) -> Vec<Cow<'_, str>> {
    path.split('/')
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy())
        .collect()
}

/// Handle to a node inside a [`PathTrie`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Returned when a path already has a bound value.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("path `{path}` already has a bound value")]
pub struct OccupiedError {
    pub path: String,
}

#[derive(Debug)]
struct Node<T> {
    segment: String,
    literals: HashMap<String, NodeId>,
    params: Vec<NodeId>,
    value: Option<T>,
    parent: Option<NodeId>,
}

impl<T> Node<T> {
    fn new(segment: &str, parent: Option<NodeId>) -> Self {
        Self {
            segment: segment.to_string(),
            literals: HashMap::new(),
            params: Vec::new(),
            value: None,
            parent,
        }
    }
}

/// Parameter bindings resolved for one request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    /// Look up a parameter by name. The `:` marker is optional.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.strip_prefix(PARAM_MARKER).unwrap_or(name);
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A successful lookup: the bound value plus resolved parameters.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    pub node: NodeId,
    pub value: &'a T,
    pub params: PathParams,
}

/// A tree keyed by path segments.
#[derive(Debug)]
pub struct PathTrie<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Default for PathTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathTrie<T> {
    const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("", None)],
        }
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    /// Bind `value` at `path`, creating intermediate nodes as needed.
    ///
    /// Fails if a route of the same shape is already bound; the existing
    /// value is kept.
    pub fn insert(&mut self, path: &str, value: T) -> Result<NodeId, OccupiedError> {
        let segments = segments(path);
        if self.find_shape(Self::ROOT, &segments).is_some() {
            return Err(OccupiedError {
                path: path.to_string(),
            });
        }

        let mut current = Self::ROOT;
        for segment in &segments {
            current = match self.find_child(current, segment) {
                Some(child) => child,
                None => self.add_child(current, segment),
            };
        }

        self.nodes[current.0].value = Some(value);
        Ok(current)
    }

    /// A bound node whose path has the same shape as `segments`: literals
    /// equal, placeholders matching any placeholder.
    fn find_shape(&self, id: NodeId, segments: &[Cow<'_, str>]) -> Option<NodeId> {
        let Some((segment, rest)) = segments.split_first() else {
            return self.node(id).value.as_ref().map(|_| id);
        };
        let node = self.node(id);

        if is_param(segment) {
            node.params
                .iter()
                .find_map(|&child| self.find_shape(child, rest))
        } else {
            node.literals
                .get(&**segment)
                .and_then(|&child| self.find_shape(child, rest))
        }
    }

    fn find_child(&self, parent: NodeId, segment: &str) -> Option<NodeId> {
        let node = self.node(parent);
        if is_param(segment) {
            node.params
                .iter()
                .copied()
                .find(|&id| self.node(id).segment == segment)
        } else {
            node.literals.get(segment).copied()
        }
    }

    fn add_child(&mut self, parent: NodeId, segment: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(segment, Some(parent)));

        let parent = &mut self.nodes[parent.0];
        if is_param(segment) {
            parent.params.push(id);
        } else {
            parent.literals.insert(segment.to_string(), id);
        }
        id
    }

    /// Find the leaf bound for `path`, if any.
    pub fn search(&self, path: &str) -> Option<NodeId> {
        self.descend(Self::ROOT, &segments(path))
    }

    fn descend(&self, id: NodeId, segments: &[Cow<'_, str>]) -> Option<NodeId> {
        let Some((segment, rest)) = segments.split_first() else {
            return self.node(id).value.as_ref().map(|_| id);
        };
        let node = self.node(id);

        if !is_param(segment) {
            if let Some(found) = node
                .literals
                .get(&**segment)
                .and_then(|&child| self.descend(child, rest))
            {
                return Some(found);
            }
        }

        node.params
            .iter()
            .find_map(|&child| self.descend(child, rest))
    }

    /// The value bound at `id`.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.0).and_then(|n| n.value.as_ref())
    }

    /// Rebuild parameter bindings by walking from `leaf` back to the root,
    /// pairing each ancestor with the request segment at the same depth.
    pub fn parse_path(&self, path: &str, leaf: NodeId) -> PathParams {
        let mut params = PathParams::default();
        let mut current = Some(leaf);

        for segment in segments(path).into_iter().rev() {
            let Some(id) = current else { break };
            let node = self.node(id);
            if let Some(name) = node.segment.strip_prefix(PARAM_MARKER) {
                params.insert(name, segment.into_owned());
            }
            current = node.parent;
        }

        params
    }

    /// `search` followed by `parse_path`.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_, T>> {
        let node = self.search(path)?;
        let value = self.get(node)?;
        Some(RouteMatch {
            node,
            value,
            params: self.parse_path(path, node),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_paths_sharing_prefix() {
        let mut trie = PathTrie::new();
        trie.insert("/list", 1).unwrap();
        trie.insert("/list/all", 2).unwrap();
        trie.insert("/lists", 3).unwrap();

        assert_eq!(trie.resolve("/list").map(|m| *m.value), Some(1));
        assert_eq!(trie.resolve("/list/all").map(|m| *m.value), Some(2));
        assert_eq!(trie.resolve("/lists").map(|m| *m.value), Some(3));
        assert!(trie.resolve("/list/none").is_none());
        assert!(trie.resolve("/lis").is_none());
    }

    #[test]
    fn test_params_resolved_by_name() {
        let mut trie = PathTrie::new();
        trie.insert("/list/:item_id/:item_name", "item").unwrap();

        let matched = trie.resolve("/list/42/widgets").unwrap();
        assert_eq!(*matched.value, "item");
        assert_eq!(matched.params.len(), 2);
        assert_eq!(matched.params.get("item_id"), Some("42"));
        assert_eq!(matched.params.get(":item_name"), Some("widgets"));
    }

    #[test]
    fn test_intermediate_node_is_not_a_match() {
        let mut trie = PathTrie::new();
        trie.insert("/users/:id/posts", 1).unwrap();

        assert!(trie.search("/users/7").is_none());
        assert!(trie.search("/users/7/posts").is_some());
    }

    #[test]
    fn test_literal_wins_over_param() {
        let mut trie = PathTrie::new();
        trie.insert("/users/:id", "param").unwrap();
        trie.insert("/users/new", "literal").unwrap();

        for _ in 0..32 {
            assert_eq!(trie.resolve("/users/new").map(|m| *m.value), Some("literal"));
        }
        let matched = trie.resolve("/users/9").unwrap();
        assert_eq!(*matched.value, "param");
        assert_eq!(matched.params.get("id"), Some("9"));
    }

    #[test]
    fn test_literal_shorter_route_not_shadowed() {
        let mut trie = PathTrie::new();
        trie.insert("/users", "list").unwrap();
        trie.insert("/users/:id", "show").unwrap();

        let matched = trie.resolve("/users").unwrap();
        assert_eq!(*matched.value, "list");
        assert!(matched.params.is_empty());
    }

    #[test]
    fn test_backtracks_into_param_branch() {
        let mut trie = PathTrie::new();
        trie.insert("/a/b/d", "literal").unwrap();
        trie.insert("/a/:x/c", "param").unwrap();

        let matched = trie.resolve("/a/b/c").unwrap();
        assert_eq!(*matched.value, "param");
        assert_eq!(matched.params.get("x"), Some("b"));
    }

    #[test]
    fn test_renamed_param_is_duplicate() {
        let mut trie = PathTrie::new();
        trie.insert("/u/:id", "first").unwrap();

        let err = trie.insert("/u/:name", "second").unwrap_err();
        assert_eq!(err.path, "/u/:name");
        let matched = trie.resolve("/u/x").unwrap();
        assert_eq!(*matched.value, "first");
        assert_eq!(matched.params.get("id"), Some("x"));
    }

    #[test]
    fn test_param_siblings_with_different_shapes() {
        let mut trie = PathTrie::new();
        trie.insert("/u/:id/posts", "posts").unwrap();
        trie.insert("/u/:name/photos", "photos").unwrap();

        let matched = trie.resolve("/u/ada/photos").unwrap();
        assert_eq!(*matched.value, "photos");
        assert_eq!(matched.params.get("name"), Some("ada"));
        assert_eq!(trie.resolve("/u/7/posts").unwrap().params.get("id"), Some("7"));
    }

    #[test]
    fn test_segments_are_percent_decoded() {
        let mut trie = PathTrie::new();
        trie.insert("/list/:item_id/:item_name", "item").unwrap();
        trie.insert("/files/my file", "file").unwrap();

        let matched = trie.resolve("/list/42/hello%20world").unwrap();
        assert_eq!(matched.params.get("item_name"), Some("hello world"));
        assert_eq!(trie.resolve("/files/my%20file").map(|m| *m.value), Some("file"));

        let matched = trie.resolve("/list/a%2Fb/caf%C3%A9").unwrap();
        assert_eq!(matched.params.get("item_id"), Some("a/b"));
        assert_eq!(matched.params.get("item_name"), Some("café"));
    }

    #[test]
    fn test_duplicate_insert_keeps_first() {
        let mut trie = PathTrie::new();
        trie.insert("/users/:id", 1).unwrap();

        let err = trie.insert("/users/:id", 2).unwrap_err();
        assert_eq!(err.path, "/users/:id");
        assert_eq!(trie.resolve("/users/5").map(|m| *m.value), Some(1));
    }

    #[test]
    fn test_root_path() {
        let mut trie = PathTrie::new();
        trie.insert("", "top").unwrap();

        assert_eq!(trie.resolve("").map(|m| *m.value), Some("top"));
        assert!(trie.resolve("/anything").is_none());
    }

    #[test]
    fn test_request_segment_with_marker_is_not_literal() {
        let mut trie = PathTrie::new();
        trie.insert("/a/:id", 1).unwrap();

        let matched = trie.resolve("/a/:id").unwrap();
        assert_eq!(matched.params.get("id"), Some(":id"));
    }
}
