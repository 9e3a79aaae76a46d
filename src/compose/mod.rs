//! Layer composition
//!
//! Assembles a configuration tree from an ordered stack of layers: the
//! first layer is the base, later layers take precedence. Composition runs
//! in two steps: a deep merge of plain values (where `$final` marks a
//! subtree as authoritative) and a lift that turns the remaining markers
//! (`$ref`, `$overlay`) into override nodes for the resolver.

mod markers;
mod merge;

pub use markers::{lift, RefOverlay, FINAL_MARKER, OVERLAY_MARKER, REF_MARKER};
pub use merge::{deep_merge, merge_layers};

use serde_json::Value;
use strata_tree::Node;
use thiserror::Error;

use crate::registry::OverlayRegistry;

/// Errors raised while composing layers into a tree.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A reserved marker key was used with the wrong shape or in the
    /// wrong place.
    #[error("invalid marker at '{path}': {message}")]
    InvalidMarker { path: String, message: String },

    /// A `$overlay` marker named an overlay absent from the registry.
    #[error("unknown overlay '{name}' at '{path}'")]
    UnknownOverlay { name: String, path: String },

    /// Composition was requested with no layers at all.
    #[error("no layers to compose")]
    Empty,
}

/// Merge `layers` in order and lift markers into override nodes.
pub fn compose(
    layers: impl IntoIterator<Item = Value>,
    registry: &OverlayRegistry,
) -> Result<Node, ComposeError> {
    let mut layers = layers.into_iter().peekable();
    if layers.peek().is_none() {
        return Err(ComposeError::Empty);
    }
    let merged = merge_layers(layers)?;
    lift(&merged, registry)
}
