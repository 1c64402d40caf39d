use std::path::PathBuf;

use clap::Args;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{build_figment, extract_config, validate_config, NodeConfig};
use crate::errors::ConfigError;
use crate::DEFAULT_CONFIG_PATH;

#[derive(Debug, Clone, Args)]
pub struct CommonNodeArgs {
    /// Config YAML path
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log level override
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunConfigArgs {
    /// JSON-RPC HTTP address override
    #[arg(long)]
    pub rpc_addr: Option<String>,

    /// Chain ID override
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// Disable JSON-RPC server
    #[arg(long)]
    pub disable_rpc: bool,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonNodeArgs,
    #[command(flatten)]
    pub native: RunConfigArgs,
}

#[derive(Debug, Clone, Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub common: CommonNodeArgs,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

/// Resolve a NodeConfig from: defaults < YAML < CLI flags.
///
/// A missing config file is an error; `kortanad init` writes one.
pub fn resolve_node_config(
    common: &CommonNodeArgs,
    native: &RunConfigArgs,
) -> Result<NodeConfig, ConfigError> {
    let mut figment = build_figment(&common.config)?;

    // Apply CLI overrides (highest priority)
    if let Some(ref v) = common.log_level {
        figment = figment.merge(("observability.log_level", v.as_str()));
    }
    if let Some(ref v) = native.rpc_addr {
        figment = figment.merge(("rpc.http_addr", v.as_str()));
    }
    if let Some(v) = native.chain_id {
        figment = figment.merge(("chain.chain_id", v));
    }
    if native.disable_rpc {
        figment = figment.merge(("rpc.enabled", false));
    }

    let config = extract_config(figment, &common.config)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn init_tracing(log_level: &str) {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();
}
