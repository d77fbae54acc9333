//! Error taxonomy for the configuration engine.

use thiserror::Error;

/// Errors produced while loading, merging, reading or watching configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No codec is registered for the descriptor's format.
    #[error("unsupported format {format:?} for descriptor {name:?}")]
    UnsupportedFormat { name: String, format: String },

    /// The codec rejected the descriptor's bytes.
    #[error("failed to decode descriptor {name:?} (format {format:?}): {message}")]
    Decode {
        name: String,
        format: String,
        message: String,
    },

    /// A dotted path with empty segments or non-ASCII characters.
    #[error("invalid key path {0:?}")]
    InvalidPath(String),

    /// The path is absent from the resolved tree.
    #[error("key not found: {0}")]
    NotFound(String),

    /// A typed accessor could not convert the node.
    #[error("cannot read {path:?} as {expected}: found {found}")]
    TypeAssert {
        path: String,
        expected: &'static str,
        found: String,
    },

    /// The watcher was stopped.
    #[error("watcher cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem notification failure.
    #[error("watch error: {0}")]
    Watch(String),

    /// The merged tree could not be serialized.
    #[error("failed to encode config: {0}")]
    Encode(#[source] serde_json::Error),

    /// The merged tree does not fit the requested structure.
    #[error("failed to scan config: {0}")]
    Scan(#[source] serde_json::Error),

    /// Adapter-level failure reported by a source.
    #[error("source {name:?}: {message}")]
    Source { name: String, message: String },
}

impl ConfigError {
    /// True when a watcher reported that it was stopped.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConfigError::Cancelled)
    }
}

impl From<notify::Error> for ConfigError {
    fn from(e: notify::Error) -> Self {
        ConfigError::Watch(e.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConfigError>;
