//! Resolution error types.

use thiserror::Error;

/// Errors raised while resolving a configuration tree.
///
/// All variants are fatal to the resolution request; no partial tree is
/// ever returned alongside one of these.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// An override chain did not terminate, either because a path was
    /// re-entered while already being resolved or because the step budget
    /// ran out.
    #[error("override chain did not terminate within {limit} applications at '{path}' (chain: {chain})")]
    Cycle {
        /// Path of the override that tripped detection.
        path: String,
        /// In-flight override paths, outermost first, joined with ` -> `.
        chain: String,
        /// The configured step budget.
        limit: usize,
    },

    /// An override or a downstream consumer referenced a key that does not
    /// exist in the resolved tree.
    #[error("missing key '{key}' under '{path}'")]
    MissingKey { path: String, key: String },

    /// A path tried to descend through a value that is not a table.
    #[error("cannot descend into '{path}': expected a table, found {kind}")]
    NotATable { path: String, kind: &'static str },

    /// A tree still carrying an override marker was used where only a
    /// fully resolved tree is valid.
    #[error("unresolved override remains at '{path}'")]
    UnresolvedOverlay { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_paths() {
        let err = ResolveError::MissingKey {
            path: "build".to_string(),
            key: "jobs".to_string(),
        };
        assert_eq!(err.to_string(), "missing key 'jobs' under 'build'");

        let err = ResolveError::Cycle {
            path: "a".to_string(),
            chain: "a -> b -> a".to_string(),
            limit: 1000,
        };
        assert!(err.to_string().contains("1000"));
        assert!(err.to_string().contains("a -> b -> a"));
    }
}
