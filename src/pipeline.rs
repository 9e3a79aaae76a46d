//! Compose-and-resolve pipeline
//!
//! Ties the stages together: merge the layer stack, lift markers, resolve
//! overrides, and package the result with provenance.

use thiserror::Error;

use crate::compose::{self, ComposeError};
use crate::loader::{LayerError, LayerSet};
use crate::registry::OverlayRegistry;
use crate::resolved::{LayerSource, ResolvedConfig};
use crate::resolver::Resolver;
use strata_tree::ResolveError;

/// Any failure between loading layers and producing resolved output.
#[derive(Debug, Error)]
pub enum StrataError {
    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Compose `layers`, resolve every override, and return the result with
/// provenance. Fails (rather than returning a partial tree) on the first
/// composition or resolution error.
pub fn resolve_layers(
    layers: &LayerSet,
    registry: &OverlayRegistry,
    resolver: &Resolver,
) -> Result<ResolvedConfig, StrataError> {
    let tree = compose::compose(layers.values(), registry)?;
    let resolved = resolver.resolve(&tree)?;
    let config = resolved.to_value()?;

    let sources: Vec<LayerSource> = layers.layers().iter().map(LayerSource::from).collect();
    Ok(ResolvedConfig::new(config, sources))
}
