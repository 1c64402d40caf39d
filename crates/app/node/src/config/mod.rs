//! Configuration loading and validation.
//!
//! This module provides:
//! - Configuration types with serde support
//! - YAML file loading (layered through figment) and default-file generation
//! - Fail-fast validation that collects all errors

mod loader;
pub mod types;
mod validation;

pub(crate) use loader::extract_config;
pub use loader::{build_figment, load_config, load_config_from_str, write_default_config};
pub use types::{
    ChainConfig, FilterConfig, IndexBackend, IndexConfig, NodeConfig, ObservabilityConfig,
    RpcConfig,
};
pub use validation::validate_config;
