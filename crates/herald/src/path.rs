//! Helpers for slash-separated coordination-service paths.
//!
//! Paths are treated as opaque strings split on [`SEPARATOR`]. The helpers
//! normalise duplicate separators at the join point and map the root and
//! bare names onto well-defined parents.

/// Hierarchy separator used by the coordination service.
pub const SEPARATOR: char = '/';

/// A path split into its parent and final node name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAndNode {
    parent: String,
    node: String,
}

impl PathAndNode {
    /// Parent path, `/` for top-level nodes.
    #[must_use]
    pub fn parent(&self) -> &str {
        self.parent.as_str()
    }

    /// Final path component; empty for the root or a trailing separator.
    #[must_use]
    pub fn node(&self) -> &str {
        self.node.as_str()
    }
}

/// Splits `path` at its last separator.
///
/// A path without any separator is returned whole as the parent with an
/// empty node, mirroring how the coordination service treats bare names.
#[must_use]
pub fn split_path(path: &str) -> PathAndNode {
    let Some(index) = path.rfind(SEPARATOR) else {
        return PathAndNode {
            parent: path.to_owned(),
            node: String::new(),
        };
    };
    let (head, tail) = path.split_at(index);
    let node = tail.trim_start_matches(SEPARATOR);
    let parent = if head.is_empty() { "/" } else { head };
    if node.is_empty() {
        return PathAndNode {
            parent: String::from("/"),
            node: String::new(),
        };
    }
    PathAndNode {
        parent: parent.to_owned(),
        node: node.to_owned(),
    }
}

/// Joins `child` onto `parent` with exactly one separator between them.
///
/// The result is always absolute. An empty child yields the normalised
/// parent.
#[must_use]
pub fn make_path(parent: &str, child: &str) -> String {
    let head = parent.trim_end_matches(SEPARATOR);
    let tail = child.trim_start_matches(SEPARATOR);
    let mut path = String::with_capacity(head.len() + tail.len() + 2);
    if !head.starts_with(SEPARATOR) {
        path.push(SEPARATOR);
    }
    path.push_str(head);
    if tail.is_empty() {
        return path;
    }
    if !path.ends_with(SEPARATOR) {
        path.push(SEPARATOR);
    }
    path.push_str(tail);
    path
}
