//! Named override registry
//!
//! Layers refer to override functions by name through the `$overlay`
//! marker. The registry is an explicit object constructed once per
//! invocation and passed into composition; there is no process-wide
//! registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use strata_tree::OverlayFn;
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate overlay name '{0}'")]
    DuplicateName(String),

    #[error("overlay name must not be empty")]
    EmptyName,
}

/// Maps overlay names to their functions for one composition run.
#[derive(Default, Clone)]
pub struct OverlayRegistry {
    entries: BTreeMap<String, Arc<dyn OverlayFn>>,
}

impl OverlayRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `name`. Names are single-use.
    pub fn register(
        &mut self,
        name: &str,
        func: impl OverlayFn + 'static,
    ) -> Result<(), RegistryError> {
        self.register_arc(name, Arc::new(func))
    }

    /// Register an already-shared function under `name`.
    pub fn register_arc(
        &mut self,
        name: &str,
        func: Arc<dyn OverlayFn>,
    ) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.entries.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        self.entries.insert(name.to_string(), func);
        Ok(())
    }

    /// The function registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<dyn OverlayFn>> {
        self.entries.get(name).map(Arc::clone)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Number of registered overlays.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for OverlayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayRegistry")
            .field("names", &self.names())
            .finish()
    }
}
