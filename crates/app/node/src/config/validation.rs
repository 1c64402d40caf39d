//! Configuration validation.
//!
//! Validates configuration and collects all errors before returning,
//! enabling users to fix multiple issues in a single iteration.

use std::net::SocketAddr;

use crate::config::types::{
    FilterConfig, IndexBackend, IndexConfig, NodeConfig, ObservabilityConfig, RpcConfig,
};
use crate::errors::ConfigError;

/// Maximum allowed history page size.
const MAX_HISTORY_RESULTS: usize = 100_000;

/// Validate the entire node configuration.
///
/// Collects all validation errors and returns them together, allowing users
/// to fix multiple issues at once.
pub fn validate_config(config: &NodeConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_chain_config(config, &mut errors);
    validate_index_config(&config.index, &mut errors);
    validate_filter_config(&config.filters, &mut errors);
    validate_rpc_config(&config.rpc, &mut errors);
    validate_observability_config(&config.observability, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(errors))
    }
}

fn validate_chain_config(config: &NodeConfig, errors: &mut Vec<String>) {
    if config.chain.chain_id == 0 {
        errors.push("chain.chain_id must be greater than 0".to_string());
    }
}

fn validate_index_config(config: &IndexConfig, errors: &mut Vec<String>) {
    if config.backend == IndexBackend::Sqlite && config.path.is_empty() {
        errors.push("index.path cannot be empty for the sqlite backend".to_string());
    }

    if config.retention_blocks == Some(0) {
        errors.push(
            "index.retention_blocks must be at least 1 (omit it to keep all history)".to_string(),
        );
    }
}

fn validate_filter_config(config: &FilterConfig, errors: &mut Vec<String>) {
    if config.idle_timeout_secs == 0 {
        errors.push("filters.idle_timeout_secs must be greater than 0".to_string());
    }

    if config.sweep_interval_secs == 0 {
        errors.push("filters.sweep_interval_secs must be greater than 0".to_string());
    }
}

fn validate_rpc_config(config: &RpcConfig, errors: &mut Vec<String>) {
    if config.enabled && config.http_addr.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "rpc.http_addr '{}' must be a socket address in ip:port format",
            config.http_addr
        ));
    }

    if config.max_history_results == 0 || config.max_history_results > MAX_HISTORY_RESULTS {
        errors.push(format!(
            "rpc.max_history_results must be between 1 and {}",
            MAX_HISTORY_RESULTS
        ));
    }
}

fn validate_observability_config(config: &ObservabilityConfig, errors: &mut Vec<String>) {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.log_level.to_lowercase().as_str()) {
        errors.push(format!(
            "observability.log_level '{}' is invalid. Valid levels: trace, debug, info, warn, error",
            config.log_level
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_of(config: &NodeConfig) -> Vec<String> {
        match validate_config(config) {
            Ok(()) => vec![],
            Err(ConfigError::ValidationFailed(errors)) => errors,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    #[test]
    fn test_default_config_passes() {
        assert!(validate_config(&NodeConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_chain_id_fails() {
        let mut config = NodeConfig::default();
        config.chain.chain_id = 0;

        let errors = errors_of(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("chain_id"));
    }

    #[test]
    fn test_empty_path_only_matters_for_sqlite() {
        let mut config = NodeConfig::default();
        config.index.path = String::new();
        assert_eq!(errors_of(&config).len(), 1);

        config.index.backend = IndexBackend::Memory;
        assert!(errors_of(&config).is_empty());
    }

    #[test]
    fn test_zero_retention_fails() {
        let mut config = NodeConfig::default();
        config.index.retention_blocks = Some(0);
        assert!(errors_of(&config)[0].contains("retention_blocks"));

        config.index.retention_blocks = Some(1);
        assert!(errors_of(&config).is_empty());
    }

    #[test]
    fn test_bad_rpc_addr_ignored_when_disabled() {
        let mut config = NodeConfig::default();
        config.rpc.http_addr = "localhost".to_string();
        assert_eq!(errors_of(&config).len(), 1);

        config.rpc.enabled = false;
        assert!(errors_of(&config).is_empty());
    }

    #[test]
    fn test_all_errors_collected() {
        let mut config = NodeConfig::default();
        config.chain.chain_id = 0;
        config.filters.idle_timeout_secs = 0;
        config.filters.sweep_interval_secs = 0;
        config.rpc.max_history_results = 0;
        config.observability.log_level = "loud".to_string();

        assert_eq!(errors_of(&config).len(), 5);
    }
}
