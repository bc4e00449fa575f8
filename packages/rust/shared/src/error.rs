//! Error types for poolset.
//!
//! Library crates use [`PoolsetError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Only conditions that must abort a run are errors. Recoverable data-quality
//! problems are collected as diagnostics by the pipeline instead.

use std::path::PathBuf;

/// Top-level error type for all poolset operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolsetError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to a source.
    #[error("network error: {0}")]
    Network(String),

    /// Payload or file content could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The authoritative override dataset is missing. Always fatal.
    #[error("override dataset not found at {path:?}")]
    OverridesNotFound { path: PathBuf },

    /// Data validation error (unexpected shape, out-of-range settings).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Writing an export surface failed.
    #[error("export error: {0}")]
    Export(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PoolsetError>;

impl PoolsetError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PoolsetError::config("page_size must be positive");
        assert_eq!(err.to_string(), "config error: page_size must be positive");

        let err = PoolsetError::validation("expected a JSON array");
        assert!(err.to_string().contains("JSON array"));
    }

    #[test]
    fn overrides_not_found_names_path() {
        let err = PoolsetError::OverridesNotFound {
            path: PathBuf::from("/tmp/missing/overrides.json"),
        };
        assert!(err.to_string().contains("overrides.json"));
    }
}
