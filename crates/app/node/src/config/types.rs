//! Configuration types for the node.

use std::time::Duration;

use kortana_chain_index::IndexSettings;
use serde::{Deserialize, Serialize};

/// Root configuration for a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Chain-specific configuration.
    pub chain: ChainConfig,

    /// Address history index configuration.
    #[serde(default)]
    pub index: IndexConfig,

    /// Polling filter configuration.
    #[serde(default)]
    pub filters: FilterConfig,

    /// JSON-RPC server configuration.
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig { chain_id: 1 },
            index: IndexConfig::default(),
            filters: FilterConfig::default(),
            rpc: RpcConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Chain-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Unique chain identifier. Must be > 0.
    pub chain_id: u64,
}

/// Where the address history index lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Process memory; history is lost on restart.
    Memory,
    /// SQLite database at `index.path`.
    Sqlite,
}

/// Address history index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    #[serde(default = "IndexConfig::default_backend")]
    pub backend: IndexBackend,

    /// Path to the SQLite database file.
    #[serde(default = "IndexConfig::default_path")]
    pub path: String,

    /// Sequence number of the first block the engine will commit.
    #[serde(default)]
    pub first_block: u64,

    /// Number of most recent blocks kept queryable. Unset keeps everything.
    #[serde(default)]
    pub retention_blocks: Option<u64>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: Self::default_backend(),
            path: Self::default_path(),
            first_block: 0,
            retention_blocks: None,
        }
    }
}

impl IndexConfig {
    const fn default_backend() -> IndexBackend {
        IndexBackend::Sqlite
    }

    fn default_path() -> String {
        "./data/chain-index.sqlite".to_string()
    }

    pub fn settings(&self) -> IndexSettings {
        IndexSettings {
            first_block: self.first_block,
            retention_blocks: self.retention_blocks,
        }
    }
}

/// Polling filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Filters not polled for this long are destroyed. Default: 300.
    #[serde(default = "FilterConfig::default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// How often idle filters are swept. Default: 30.
    #[serde(default = "FilterConfig::default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: Self::default_idle_timeout_secs(),
            sweep_interval_secs: Self::default_sweep_interval_secs(),
        }
    }
}

impl FilterConfig {
    const fn default_idle_timeout_secs() -> u64 {
        300
    }

    const fn default_sweep_interval_secs() -> u64 {
        30
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// RPC server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcConfig {
    /// Whether the RPC server is enabled.
    #[serde(default = "RpcConfig::default_enabled")]
    pub enabled: bool,

    /// HTTP address to bind to.
    #[serde(default = "RpcConfig::default_http_addr")]
    pub http_addr: String,

    /// Upper bound on entries returned by one history query.
    #[serde(default = "RpcConfig::default_max_history_results")]
    pub max_history_results: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            http_addr: Self::default_http_addr(),
            max_history_results: Self::default_max_history_results(),
        }
    }
}

impl RpcConfig {
    const fn default_enabled() -> bool {
        true
    }

    fn default_http_addr() -> String {
        "127.0.0.1:8545".to_string()
    }

    const fn default_max_history_results() -> usize {
        kortana_eth_jsonrpc::DEFAULT_MAX_HISTORY_RESULTS
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is unset. Default: "info".
    #[serde(default = "ObservabilityConfig::default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

impl ObservabilityConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}
