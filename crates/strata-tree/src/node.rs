//! Configuration tree nodes.
//!
//! A tree is built once from composed layers, resolved once, and discarded.
//! Resolution never mutates its input; it produces a new tree.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ResolveError;
use crate::path::NodePath;

/// Mapping from key to child node. A `BTreeMap` so nothing ever depends on
/// hash iteration order.
pub type Table = BTreeMap<String, Node>;

/// Read view of the final resolved tree, handed to override functions.
///
/// Values are materialized on demand: `get` resolves the addressed subtree
/// of the original root before returning it, so an override observes final
/// values of siblings and ancestors.
pub trait ResolveView {
    /// The resolved node at `path` in the final tree.
    ///
    /// Fails with [`ResolveError::MissingKey`] if the path does not exist,
    /// or [`ResolveError::Cycle`] if resolving it leads back to an override
    /// currently being resolved.
    fn get(&self, path: &NodePath) -> Result<Node, ResolveError>;

    /// Convenience form of [`get`](Self::get) taking dot notation.
    fn get_at(&self, path: &str) -> Result<Node, ResolveError> {
        self.get(&NodePath::from(path))
    }
}

/// An override resolution function.
///
/// `ctx` views the fully resolved final tree; `base` is the override's own
/// unresolved base subtree (always a [`Node::Table`]). The returned node may
/// itself contain further overrides; resolution recurses until none remain.
pub trait OverlayFn: Send + Sync {
    fn apply(&self, ctx: &dyn ResolveView, base: &Node) -> Result<Node, ResolveError>;
}

impl<F> OverlayFn for F
where
    F: Fn(&dyn ResolveView, &Node) -> Result<Node, ResolveError> + Send + Sync,
{
    fn apply(&self, ctx: &dyn ResolveView, base: &Node) -> Result<Node, ResolveError> {
        self(ctx, base)
    }
}

/// A container tagged with an override function.
#[derive(Clone)]
pub struct OverlayNode {
    /// The override's own unresolved base entries.
    pub base: Table,
    /// Resolution function, invoked against the final tree.
    pub func: Arc<dyn OverlayFn>,
}

impl fmt::Debug for OverlayNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayNode")
            .field("base", &self.base)
            .field("func", &"<fn>")
            .finish()
    }
}

impl PartialEq for OverlayNode {
    fn eq(&self, other: &Self) -> bool {
        // Functions have no structural equality; compare by identity.
        self.base == other.base && Arc::ptr_eq(&self.func, &other.func)
    }
}

/// A node in a configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An opaque value: scalar or array. Arrays never merge.
    Leaf(Value),
    /// A container of named children.
    Table(Table),
    /// A container whose final value is computed by an override function.
    Overlay(OverlayNode),
}

impl Node {
    /// A leaf holding `value`.
    pub fn leaf(value: impl Into<Value>) -> Self {
        Node::Leaf(value.into())
    }

    /// An empty table.
    pub fn table() -> Self {
        Node::Table(Table::new())
    }

    /// An override node over `base` resolved by `func`.
    pub fn overlay(base: Table, func: impl OverlayFn + 'static) -> Self {
        Node::Overlay(OverlayNode {
            base,
            func: Arc::new(func),
        })
    }

    /// Build a marker-free tree from a plain JSON value. Objects become
    /// tables; everything else (arrays included) becomes a leaf.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Node::Table(
                map.iter()
                    .map(|(key, child)| (key.clone(), Node::from_value(child)))
                    .collect(),
            ),
            other => Node::Leaf(other.clone()),
        }
    }

    /// Convert a resolved tree back to a plain JSON value.
    ///
    /// Fails with [`ResolveError::UnresolvedOverlay`] if any override
    /// marker remains, naming its path.
    pub fn to_value(&self) -> Result<Value, ResolveError> {
        self.to_value_at(&NodePath::root())
    }

    fn to_value_at(&self, path: &NodePath) -> Result<Value, ResolveError> {
        match self {
            Node::Leaf(value) => Ok(value.clone()),
            Node::Table(entries) => {
                let mut map = serde_json::Map::new();
                for (key, child) in entries {
                    map.insert(key.clone(), child.to_value_at(&path.child(key))?);
                }
                Ok(Value::Object(map))
            }
            Node::Overlay(_) => Err(ResolveError::UnresolvedOverlay {
                path: path.to_string(),
            }),
        }
    }

    /// Short label for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Leaf(_) => "leaf",
            Node::Table(_) => "table",
            Node::Overlay(_) => "overlay",
        }
    }

    /// True if no override marker remains anywhere in the tree.
    pub fn is_resolved(&self) -> bool {
        match self {
            Node::Leaf(_) => true,
            Node::Table(entries) => entries.values().all(Node::is_resolved),
            Node::Overlay(_) => false,
        }
    }

    /// Direct child of a table node.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Table(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Descend through tables along `path`. Stops at the first non-table.
    pub fn lookup(&self, path: &NodePath) -> Option<&Node> {
        let mut current = self;
        for segment in path.segments() {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Leaf value as `u64`, if this is a numeric leaf.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Node::Leaf(value) => value.as_u64(),
            _ => None,
        }
    }

    /// Leaf value as `i64`, if this is a numeric leaf.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Leaf(value) => value.as_i64(),
            _ => None,
        }
    }

    /// Leaf value as `&str`, if this is a string leaf.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Leaf(value) => value.as_str(),
            _ => None,
        }
    }

    /// Leaf value as `bool`, if this is a boolean leaf.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Leaf(value) => value.as_bool(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_objects_become_tables() {
        let node = Node::from_value(&json!({"a": 1, "b": {"c": 2}}));

        assert_eq!(node.get("a").unwrap().as_u64(), Some(1));
        assert_eq!(
            node.lookup(&NodePath::from("b.c")).unwrap().as_u64(),
            Some(2)
        );
    }

    #[test]
    fn test_arrays_are_leaves() {
        let node = Node::from_value(&json!({"schemes": ["A", "B"]}));
        let schemes = node.get("schemes").unwrap();
        assert!(matches!(schemes, Node::Leaf(Value::Array(_))));
    }

    #[test]
    fn test_value_round_trip() {
        let value = json!({"a": 1, "b": {"c": [1, 2], "d": null}});
        let node = Node::from_value(&value);
        assert_eq!(node.to_value().unwrap(), value);
    }

    #[test]
    fn test_to_value_rejects_overlay() {
        let mut entries = Table::new();
        entries.insert(
            "b".to_string(),
            Node::overlay(Table::new(), |_: &dyn ResolveView, base: &Node| {
                Ok(base.clone())
            }),
        );
        let node = Node::Table(entries);

        let err = node.to_value().unwrap_err();
        match err {
            ResolveError::UnresolvedOverlay { path } => assert_eq!(path, "b"),
            other => panic!("expected UnresolvedOverlay, got {other:?}"),
        }
    }

    #[test]
    fn test_overlay_equality_is_by_identity() {
        let func: Arc<dyn OverlayFn> =
            Arc::new(|_: &dyn ResolveView, base: &Node| Ok(base.clone()));
        let a = Node::Overlay(OverlayNode {
            base: Table::new(),
            func: Arc::clone(&func),
        });
        let b = Node::Overlay(OverlayNode {
            base: Table::new(),
            func: Arc::clone(&func),
        });
        let c = Node::overlay(Table::new(), |_: &dyn ResolveView, base: &Node| {
            Ok(base.clone())
        });

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_is_resolved() {
        let plain = Node::from_value(&json!({"a": {"b": 1}}));
        assert!(plain.is_resolved());

        let mut entries = Table::new();
        entries.insert(
            "x".to_string(),
            Node::overlay(Table::new(), |_: &dyn ResolveView, base: &Node| {
                Ok(base.clone())
            }),
        );
        assert!(!Node::Table(entries).is_resolved());
    }
}
