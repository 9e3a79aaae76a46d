//! Layer merge logic
//!
//! Deep merge of layer values with:
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)
//! - `$final = true` on an object: the subtree is authoritative and
//!   replaces the base subtree instead of merging into it

use serde_json::Value;
use strata_tree::NodePath;

use super::markers::{value_kind, FINAL_MARKER, REF_MARKER};
use super::ComposeError;

/// Deep merge two layer values.
///
/// Merge semantics:
/// - Objects: deep-merge by key (recursive)
/// - Arrays: REPLACE (second wins entirely)
/// - Scalars: override (second wins)
/// - Null: override (null can override any value)
/// - An object carrying `$final = true` or a `$ref` binding replaces the
///   base subtree instead of merging
pub fn deep_merge(base: Value, overlay: Value) -> Result<Value, ComposeError> {
    merge_at(base, overlay, &NodePath::root())
}

/// Merge config layers in order (first is base, last has highest precedence).
pub fn merge_layers(layers: impl IntoIterator<Item = Value>) -> Result<Value, ComposeError> {
    layers
        .into_iter()
        .try_fold(Value::Null, |merged, layer| deep_merge(merged, layer))
}

fn merge_at(base: Value, overlay: Value, path: &NodePath) -> Result<Value, ComposeError> {
    match (base, overlay) {
        // Both objects: deep merge, unless the overlay side is marked
        // authoritative or is a reference binding
        (Value::Object(mut base_map), Value::Object(mut overlay_map)) => {
            if take_final_marker(&mut overlay_map, path)? {
                return strip_final(Value::Object(overlay_map), path);
            }
            if overlay_map.contains_key(REF_MARKER) {
                return Ok(Value::Object(overlay_map));
            }

            for (key, overlay_value) in overlay_map {
                let child = path.child(&key);
                let merged = match base_map.remove(&key) {
                    Some(base_value) => merge_at(base_value, overlay_value, &child)?,
                    None => strip_final(overlay_value, &child)?,
                };
                base_map.insert(key, merged);
            }
            Ok(Value::Object(base_map))
        }

        // Arrays, scalars and any other case: overlay wins
        (_, overlay) => strip_final(overlay, path),
    }
}

/// Remove a `$final` key from `map`, validating its type. Returns whether
/// the subtree was marked authoritative.
fn take_final_marker(
    map: &mut serde_json::Map<String, Value>,
    path: &NodePath,
) -> Result<bool, ComposeError> {
    match map.remove(FINAL_MARKER) {
        None => Ok(false),
        Some(Value::Bool(authoritative)) => Ok(authoritative),
        Some(other) => Err(ComposeError::InvalidMarker {
            path: path.to_string(),
            message: format!("'{FINAL_MARKER}' must be a boolean, found {}", value_kind(&other)),
        }),
    }
}

/// Remove `$final` markers at every level of `value`. Markers below a
/// replaced (or freshly introduced) subtree have nothing left to replace.
fn strip_final(value: Value, path: &NodePath) -> Result<Value, ComposeError> {
    match value {
        Value::Object(mut map) => {
            take_final_marker(&mut map, path)?;
            let mut stripped = serde_json::Map::new();
            for (key, child) in map {
                let child_path = path.child(&key);
                stripped.insert(key, strip_final(child, &child_path)?);
            }
            Ok(Value::Object(stripped))
        }
        other => Ok(other),
    }
}
