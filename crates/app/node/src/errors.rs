//! Error types for the node crate.

use kortana_chain_index::ChainIndexError;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error when loading config.
    #[error("failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    /// File I/O error when writing the default config.
    #[error("failed to write config file '{path}': {source}")]
    FileWrite {
        path: String,
        source: std::io::Error,
    },

    /// YAML parsing error.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    /// Layered config (file plus CLI overrides) could not be extracted.
    #[error("failed to resolve config from '{path}': {source}")]
    Extract {
        path: String,
        source: Box<figment::Error>,
    },

    /// Validation failed with one or more errors.
    #[error("config validation failed:\n{}", .0.join("\n"))]
    ValidationFailed(Vec<String>),
}

/// Errors that stop a running node.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Opening the index or indexing a block failed.
    #[error(transparent)]
    Index(#[from] ChainIndexError),

    /// A line from the engine feed could not be read or decoded.
    #[error("engine feed error at line {line}: {reason}")]
    Feed { line: u64, reason: String },

    /// The JSON-RPC server could not start.
    #[error("rpc server error: {0}")]
    Rpc(String),
}
