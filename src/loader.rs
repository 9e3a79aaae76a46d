//! Layer file loading
//!
//! Loads layer definitions from TOML or JSON files, recording provenance
//! (file path and SHA-256 digest of the raw bytes) for each layer, and
//! collects layer stacks from files or directories.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

/// Where a layer came from, for provenance reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerOrigin {
    /// The base layer of the stack.
    Base,
    /// An overlay layer on top of the base.
    Overlay,
    /// A layer supplied programmatically, with no backing file.
    Inline,
}

/// Errors raised while loading layer files.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("failed to read layer {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse layer {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported layer format for {path} (expected .toml or .json)")]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to scan layer directory {path}: {source}")]
    Scan {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// A single configuration layer with provenance.
#[derive(Debug, Clone)]
pub struct Layer {
    /// The layer's value, as parsed.
    pub value: Value,

    /// Origin of this layer.
    pub origin: LayerOrigin,

    /// Backing file (None for inline layers).
    pub path: Option<PathBuf>,

    /// SHA-256 digest of the raw file bytes (None for inline layers).
    pub digest: Option<String>,
}

impl Layer {
    /// A layer supplied programmatically.
    pub fn inline(value: Value) -> Self {
        Self {
            value,
            origin: LayerOrigin::Inline,
            path: None,
            digest: None,
        }
    }

    /// Load a layer from a TOML or JSON file, selected by extension.
    pub fn from_path(path: &Path, origin: LayerOrigin) -> Result<Self, LayerError> {
        let bytes = fs::read(path).map_err(|source| LayerError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes).map_err(|e| LayerError::Parse {
            path: path.to_path_buf(),
            message: format!("invalid UTF-8: {e}"),
        })?;

        let value = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                let toml_value: toml::Value =
                    toml::from_str(&contents).map_err(|e| LayerError::Parse {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                toml_to_json(toml_value)
            }
            Some("json") => serde_json::from_str(&contents).map_err(|e| LayerError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
            _ => {
                return Err(LayerError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        Ok(Self {
            value,
            origin,
            path: Some(path.to_path_buf()),
            digest: Some(digest),
        })
    }
}

/// Convert a TOML value to a JSON value.
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            Value::Object(map)
        }
    }
}

/// An ordered stack of layers: first is the base, later layers take
/// precedence.
#[derive(Debug, Clone, Default)]
pub struct LayerSet {
    layers: Vec<Layer>,
}

impl LayerSet {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer with the highest precedence so far.
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Append every `*.toml` / `*.json` file under `dir`, in sorted path
    /// order, as overlay layers. Other files are ignored.
    pub fn push_dir(&mut self, dir: &Path) -> Result<(), LayerError> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = entry.map_err(|source| LayerError::Scan {
                path: dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            match entry.path().extension().and_then(|ext| ext.to_str()) {
                Some("toml") | Some("json") => paths.push(entry.path().to_path_buf()),
                _ => {}
            }
        }
        paths.sort();

        for path in paths {
            self.push(Layer::from_path(&path, LayerOrigin::Overlay)?);
        }
        Ok(())
    }

    /// The layers, lowest precedence first.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True if no layers were added.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The layer values in precedence order, for composition.
    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.layers.iter().map(|layer| layer.value.clone())
    }
}
