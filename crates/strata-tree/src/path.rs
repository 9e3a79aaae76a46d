//! Dot-separated key paths into configuration trees.

use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// A path into a configuration tree, as a sequence of table keys.
///
/// Paths are written and parsed in dot notation (`cache.derived_data`).
/// The empty path addresses the tree root and displays as `(root)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    /// The root path (no segments).
    pub fn root() -> Self {
        Self::default()
    }

    /// True if this path addresses the tree root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The key segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// A new path with `key` appended.
    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Self { segments }
    }

    /// Append a key in place.
    pub fn push(&mut self, key: &str) {
        self.segments.push(key.to_string());
    }

    /// The path without its final segment, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The final segment, or `None` for the root.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

impl From<&str> for NodePath {
    fn from(s: &str) -> Self {
        let segments = s
            .split('.')
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect();
        Self { segments }
    }
}

impl From<String> for NodePath {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "(root)");
        }
        write!(f, "{}", self.segments.join("."))
    }
}

// Serialized as the dot-notation string, so paths read naturally in
// reports and error payloads.
impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.segments.join("."))
    }
}

impl<'de> Deserialize<'de> for NodePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodePath::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = NodePath::from("cache.derived_data");
        assert_eq!(path.segments(), &["cache", "derived_data"]);
        assert_eq!(path.to_string(), "cache.derived_data");
    }

    #[test]
    fn test_root_display() {
        assert_eq!(NodePath::root().to_string(), "(root)");
        assert!(NodePath::from("").is_root());
    }

    #[test]
    fn test_child_and_parent() {
        let path = NodePath::from("a").child("b");
        assert_eq!(path.to_string(), "a.b");
        assert_eq!(path.parent().unwrap().to_string(), "a");
        assert_eq!(path.last(), Some("b"));
        assert_eq!(NodePath::root().parent(), None);
    }

    #[test]
    fn test_empty_segments_skipped() {
        let path = NodePath::from("a..b.");
        assert_eq!(path.segments(), &["a", "b"]);
    }

    #[test]
    fn test_serde_round_trip() {
        let path = NodePath::from("a.b.c");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"a.b.c\"");

        let back: NodePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
