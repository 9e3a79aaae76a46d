//! Strata - layered configuration resolution
//!
//! This crate composes a configuration from a base layer plus ordered
//! overlay layers, then resolves override markers against the final tree
//! (self-referential overrides included) to produce a plain configuration
//! with provenance.

pub mod compose;
pub mod loader;
pub mod pipeline;
pub mod registry;
pub mod resolved;
pub mod resolver;

pub use compose::{compose, deep_merge, merge_layers, ComposeError, RefOverlay};
pub use loader::{Layer, LayerError, LayerOrigin, LayerSet};
pub use pipeline::{resolve_layers, StrataError};
pub use registry::{OverlayRegistry, RegistryError};
pub use resolved::{LayerSource, ResolvedConfig};
pub use resolver::Resolver;
pub use strata_tree::{
    Node, NodePath, OverlayFn, OverlayNode, ResolveError, ResolveView, Table, DEFAULT_STEP_BUDGET,
};
