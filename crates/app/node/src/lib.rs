//! Node wiring for the Kortana chain index.
//!
//! This crate assembles a running node from its configuration:
//! - Address history index (in-memory or SQLite) behind a single ingest lane
//! - Block filter registry with a background idle-filter sweeper
//! - JSON-RPC server backed by `ChainStateProvider`
//! - Engine feed of committed blocks as JSON lines

pub mod cli;
pub mod config;
pub mod errors;
pub mod feed;

use std::net::SocketAddr;
use std::sync::Arc;

use kortana_chain_index::{
    spawn_filter_sweeper, AddressHistoryIndex, ChainIndexer, ChainStateProvider, FilterRegistry,
    InMemoryHistoryIndex, PersistentHistoryIndex, DEFAULT_LOG_CAPACITY,
};
use kortana_eth_jsonrpc::{start_server, RpcServerConfig, ServerHandle};
use tokio::io::AsyncBufRead;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use cli::{
    init_tracing, resolve_node_config, CommonNodeArgs, InitArgs, RunArgs, RunConfigArgs,
};
pub use config::{
    load_config, load_config_from_str, validate_config, write_default_config, IndexBackend,
    IndexConfig, NodeConfig,
};
pub use errors::{ConfigError, NodeError};
pub use feed::feed_blocks;

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "./kortana.yaml";

type SharedIndexer = Arc<ChainIndexer<dyn AddressHistoryIndex>>;

/// A started node: indexing lane, filter sweeper and (optionally) RPC server.
pub struct RunningNode {
    indexer: SharedIndexer,
    filters: Arc<FilterRegistry>,
    rpc: Option<(SocketAddr, ServerHandle)>,
    shutdown_tx: watch::Sender<bool>,
    sweeper: JoinHandle<()>,
}

impl RunningNode {
    /// Open the index and start the background services described by `config`.
    pub async fn start(config: &NodeConfig) -> Result<Self, NodeError> {
        let index = open_index(&config.index)?;
        let log_capacity = config
            .index
            .retention_blocks
            .map_or(DEFAULT_LOG_CAPACITY, |blocks| {
                usize::try_from(blocks).unwrap_or(usize::MAX)
            });
        let indexer: SharedIndexer = Arc::new(ChainIndexer::new(index.clone(), log_capacity));

        let filters = Arc::new(FilterRegistry::new(
            indexer.notifier().clone(),
            config.filters.idle_timeout(),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = spawn_filter_sweeper(
            filters.clone(),
            config.filters.sweep_interval(),
            shutdown_rx,
        );

        let rpc = if config.rpc.enabled {
            let http_addr = config
                .rpc
                .http_addr
                .parse()
                .map_err(|e| NodeError::Rpc(format!("invalid rpc.http_addr: {e}")))?;
            let rpc_config = RpcServerConfig {
                http_addr,
                chain_id: config.chain.chain_id,
                max_history_results: config.rpc.max_history_results,
            };
            let provider =
                ChainStateProvider::new(index, indexer.notifier().clone(), filters.clone());
            let started = start_server(rpc_config, provider)
                .await
                .map_err(|e| NodeError::Rpc(e.to_string()))?;
            Some(started)
        } else {
            tracing::info!("JSON-RPC server disabled");
            None
        };

        Ok(Self {
            indexer,
            filters,
            rpc,
            shutdown_tx,
            sweeper,
        })
    }

    /// Address the JSON-RPC server is bound to, if enabled.
    pub fn rpc_addr(&self) -> Option<SocketAddr> {
        self.rpc.as_ref().map(|(addr, _)| *addr)
    }

    pub fn indexer(&self) -> &SharedIndexer {
        &self.indexer
    }

    pub fn filters(&self) -> &Arc<FilterRegistry> {
        &self.filters
    }

    /// Index every block read from `reader` until EOF.
    pub async fn feed<R: AsyncBufRead + Unpin>(&self, reader: R) -> Result<u64, NodeError> {
        feed_blocks(reader, self.indexer.clone()).await
    }

    /// Stop the sweeper and the RPC server.
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(true).is_err() {
            tracing::debug!("filter sweeper already stopped");
        }
        if let Some((_, handle)) = self.rpc {
            tracing::info!("Stopping RPC server...");
            if handle.stop().is_ok() {
                handle.stopped().await;
            }
            tracing::info!("RPC server stopped");
        }
        if let Err(e) = self.sweeper.await {
            tracing::warn!(error = %e, "filter sweeper did not exit cleanly");
        }
    }
}

fn open_index(config: &IndexConfig) -> Result<Arc<dyn AddressHistoryIndex>, NodeError> {
    let settings = config.settings();
    let index: Arc<dyn AddressHistoryIndex> = match config.backend {
        IndexBackend::Memory => {
            tracing::info!("using in-memory address history index");
            Arc::new(InMemoryHistoryIndex::new(settings))
        }
        IndexBackend::Sqlite => {
            tracing::info!(path = %config.path, "opening address history index");
            Arc::new(PersistentHistoryIndex::open(&config.path, settings)?)
        }
    };
    Ok(index)
}

/// Run the node: index blocks from stdin and serve JSON-RPC until Ctrl+C.
///
/// When stdin closes the node keeps serving queries. A feed or indexing
/// failure shuts the node down and is returned.
pub async fn run_node(config: NodeConfig) -> Result<(), NodeError> {
    tracing::info!("=== Kortana chain index node ===");
    let node = RunningNode::start(&config).await?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let outcome = tokio::select! {
        result = node.feed(stdin) => match result {
            Ok(blocks) => {
                tracing::info!(blocks, "engine feed closed, serving queries (Ctrl+C to stop)");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "cannot listen for Ctrl+C");
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "engine feed stopped");
                Err(e)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
            Ok(())
        }
    };

    node.shutdown().await;
    outcome
}

/// Write the default configuration file for `kortanad init`.
pub fn init_node(common: &CommonNodeArgs, force: bool) -> Result<(), NodeError> {
    if write_default_config(&common.config, force)? {
        tracing::info!(path = %common.config.display(), "wrote default configuration");
    } else {
        tracing::info!(
            path = %common.config.display(),
            "configuration already exists; pass --force to overwrite"
        );
    }
    Ok(())
}
