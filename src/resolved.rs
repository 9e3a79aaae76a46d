//! Resolved configuration with provenance
//!
//! The output of a resolution run: the marker-free configuration plus
//! information about the layers that produced it and a canonical digest
//! for comparing runs.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use strata_tree::ResolveError;

use crate::loader::{Layer, LayerOrigin};

/// Schema version for resolved output.
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier.
pub const SCHEMA_ID: &str = "strata/resolved_config@1";

/// A contributing layer with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSource {
    /// Origin of this layer.
    pub origin: LayerOrigin,

    /// File path (None for inline layers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for inline layers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl From<&Layer> for LayerSource {
    fn from(layer: &Layer) -> Self {
        Self {
            origin: layer.origin,
            path: layer
                .path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            digest: layer.digest.clone(),
        }
    }
}

/// A resolved configuration with full provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Schema version.
    pub schema_version: u32,

    /// Schema identifier.
    pub schema_id: String,

    /// When this configuration was resolved.
    pub created_at: DateTime<Utc>,

    /// The resolved, marker-free configuration.
    pub config: Value,

    /// Contributing layers in precedence order (base first).
    pub sources: Vec<LayerSource>,
}

impl ResolvedConfig {
    /// Package a resolved value with its contributing sources.
    pub fn new(config: Value, sources: Vec<LayerSource>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config,
            sources,
        }
    }

    /// SHA-256 over the canonical (RFC 8785) JSON form of the config, so
    /// equal configurations agree on a fingerprint regardless of key
    /// order or formatting.
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        let canonical = serde_json_canonicalizer::to_vec(&self.config)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Get a config value by dot-separated path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Like [`get`](Self::get), but reports the deepest existing subtree
    /// and the key that was missing.
    pub fn lookup(&self, path: &str) -> Result<&Value, ResolveError> {
        let mut current = &self.config;
        let mut walked = Vec::new();
        for part in path.split('.').filter(|p| !p.is_empty()) {
            if !current.is_object() {
                return Err(ResolveError::NotATable {
                    path: join_or_root(&walked),
                    kind: value_kind(current),
                });
            }
            current = current.get(part).ok_or_else(|| ResolveError::MissingKey {
                path: join_or_root(&walked),
                key: part.to_string(),
            })?;
            walked.push(part);
        }
        Ok(current)
    }

    /// Get a config value as u64.
    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    /// Get a config value as string.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    /// Get a config value as bool.
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.as_bool())
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the pretty JSON form to a file.
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {e}"),
            )
        })?;
        fs::write(path, json)
    }
}

fn join_or_root(walked: &[&str]) -> String {
    if walked.is_empty() {
        "(root)".to_string()
    } else {
        walked.join(".")
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "leaf",
        Value::Number(_) => "leaf",
        Value::String(_) => "leaf",
        Value::Array(_) => "leaf",
        Value::Object(_) => "table",
    }
}
