//! Reserved layer markers
//!
//! Layer files express overrides declaratively through reserved keys:
//! `$final` (consumed during merging), `$ref` (copy a value from the final
//! resolved tree), and `$overlay` (apply a named override function from the
//! registry). Lifting turns a merged value into a tree with override nodes
//! in place of the remaining markers.

use serde_json::Value;
use strata_tree::{Node, NodePath, OverlayNode, ResolveError, ResolveView, Table};

use super::ComposeError;
use crate::registry::OverlayRegistry;

/// Marks a subtree as authoritative during merging: it replaces the base
/// subtree instead of merging into it.
pub const FINAL_MARKER: &str = "$final";

/// Copies the value at a dot path from the final resolved tree.
pub const REF_MARKER: &str = "$ref";

/// Applies a named override function from the registry, with the rest of
/// the table as its base.
pub const OVERLAY_MARKER: &str = "$overlay";

/// Override function that copies the final value at a fixed path.
#[derive(Debug, Clone)]
pub struct RefOverlay {
    /// Path copied from the final resolved tree.
    pub target: NodePath,
}

impl strata_tree::OverlayFn for RefOverlay {
    fn apply(&self, ctx: &dyn ResolveView, _base: &Node) -> Result<Node, ResolveError> {
        ctx.get(&self.target)
    }
}

/// Turn a merged layer value into a tree, converting `$ref` and `$overlay`
/// markers into override nodes.
pub fn lift(value: &Value, registry: &OverlayRegistry) -> Result<Node, ComposeError> {
    lift_at(value, &NodePath::root(), registry)
}

fn lift_at(
    value: &Value,
    path: &NodePath,
    registry: &OverlayRegistry,
) -> Result<Node, ComposeError> {
    let Value::Object(map) = value else {
        return Ok(Node::Leaf(value.clone()));
    };

    if let Some(target) = map.get(REF_MARKER) {
        if map.len() != 1 {
            return Err(ComposeError::InvalidMarker {
                path: path.to_string(),
                message: format!("'{REF_MARKER}' must be the only key of its table"),
            });
        }
        let Some(target) = target.as_str() else {
            return Err(ComposeError::InvalidMarker {
                path: path.to_string(),
                message: format!("'{REF_MARKER}' must be a string path, found {}", value_kind(target)),
            });
        };
        return Ok(Node::overlay(
            Table::new(),
            RefOverlay {
                target: NodePath::from(target),
            },
        ));
    }

    if let Some(name) = map.get(OVERLAY_MARKER) {
        let Some(name) = name.as_str() else {
            return Err(ComposeError::InvalidMarker {
                path: path.to_string(),
                message: format!("'{OVERLAY_MARKER}' must be a string name, found {}", value_kind(name)),
            });
        };
        let Some(func) = registry.get(name) else {
            return Err(ComposeError::UnknownOverlay {
                name: name.to_string(),
                path: path.to_string(),
            });
        };
        let mut base = Table::new();
        for (key, child) in map {
            if key == OVERLAY_MARKER {
                continue;
            }
            base.insert(key.clone(), lift_at(child, &path.child(key), registry)?);
        }
        return Ok(Node::Overlay(OverlayNode { base, func }));
    }

    if map.contains_key(FINAL_MARKER) {
        // merging consumes every $final; one surviving to the lift means
        // the value never went through composition
        return Err(ComposeError::InvalidMarker {
            path: path.to_string(),
            message: format!("'{FINAL_MARKER}' is only meaningful inside a layer merge"),
        });
    }

    let mut entries = Table::new();
    for (key, child) in map {
        entries.insert(key.clone(), lift_at(child, &path.child(key), registry)?);
    }
    Ok(Node::Table(entries))
}

/// Short type label for marker error messages.
pub(super) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use serde_json::json;

    #[test]
    fn test_lift_plain_value() {
        let registry = OverlayRegistry::new();
        let node = lift(&json!({"a": 1, "b": {"c": true}}), &registry).unwrap();

        assert!(node.is_resolved());
        assert_eq!(node.to_value().unwrap(), json!({"a": 1, "b": {"c": true}}));
    }

    #[test]
    fn test_lift_ref_resolves_against_final_tree() {
        let registry = OverlayRegistry::new();
        let merged = json!({
            "service": {"port": 8080},
            "probe": {"port": {"$ref": "service.port"}}
        });

        let tree = lift(&merged, &registry).unwrap();
        let resolved = Resolver::new().resolve(&tree).unwrap();

        assert_eq!(
            resolved.to_value().unwrap(),
            json!({"service": {"port": 8080}, "probe": {"port": 8080}})
        );
    }

    #[test]
    fn test_ref_must_be_sole_key() {
        let registry = OverlayRegistry::new();
        let err = lift(&json!({"x": {"$ref": "a", "extra": 1}}), &registry).unwrap_err();

        match err {
            ComposeError::InvalidMarker { path, message } => {
                assert_eq!(path, "x");
                assert!(message.contains("only key"));
            }
            other => panic!("expected InvalidMarker, got {other:?}"),
        }
    }

    #[test]
    fn test_ref_to_missing_key_fails_resolution() {
        let registry = OverlayRegistry::new();
        let tree = lift(&json!({"x": {"$ref": "absent.key"}}), &registry).unwrap();

        let err = Resolver::new().resolve(&tree).unwrap_err();
        match err {
            ResolveError::MissingKey { path, key } => {
                assert_eq!(path, "(root)");
                assert_eq!(key, "absent");
            }
            other => panic!("expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn test_ref_cycle_is_detected() {
        let registry = OverlayRegistry::new();
        let merged = json!({
            "a": {"$ref": "b"},
            "b": {"$ref": "a"}
        });

        let tree = lift(&merged, &registry).unwrap();
        let err = Resolver::new().resolve(&tree).unwrap_err();
        assert!(matches!(err, ResolveError::Cycle { .. }));
    }

    #[test]
    fn test_overlay_marker_uses_registry() {
        let mut registry = OverlayRegistry::new();
        registry
            .register("double-jobs", |ctx: &dyn ResolveView, base: &Node| {
                let jobs = base.get("jobs").and_then(Node::as_u64).unwrap_or(1);
                let scale = ctx.get_at("scale")?.as_u64().unwrap_or(1);
                Ok(Node::from_value(&json!({ "jobs": jobs * scale })))
            })
            .unwrap();

        let merged = json!({
            "scale": 4,
            "build": {"$overlay": "double-jobs", "jobs": 2}
        });

        let tree = lift(&merged, &registry).unwrap();
        let resolved = Resolver::new().resolve(&tree).unwrap();

        assert_eq!(
            resolved.to_value().unwrap(),
            json!({"scale": 4, "build": {"jobs": 8}})
        );
    }

    #[test]
    fn test_unknown_overlay_name() {
        let registry = OverlayRegistry::new();
        let err = lift(&json!({"build": {"$overlay": "nope"}}), &registry).unwrap_err();

        match err {
            ComposeError::UnknownOverlay { name, path } => {
                assert_eq!(name, "nope");
                assert_eq!(path, "build");
            }
            other => panic!("expected UnknownOverlay, got {other:?}"),
        }
    }

    #[test]
    fn test_stray_final_marker_is_rejected() {
        let registry = OverlayRegistry::new();
        let err = lift(&json!({"a": {"$final": true}}), &registry).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidMarker { .. }));
    }
}
