//! JSON-RPC server implementation.
//!
//! This module provides the RPC server that implements the Ethereum-compatible API.

use std::net::SocketAddr;
use std::sync::Arc;

use alloy_primitives::{Address, B256, U64};
use async_trait::async_trait;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::RpcModule;
use kortana_rpc_types::{
    BlockNumberOrTag, BlockTag, FilterId, HistoryCursor, RpcBlock, RpcHistoryEntry, RpcReceipt,
    RpcTransaction,
};

use crate::api::{EthApiServer, KortanaApiServer, NetApiServer, Web3ApiServer};
use crate::error::RpcError;

/// Client version string returned by `web3_clientVersion`.
pub const CLIENT_VERSION: &str = "kortana/0.1.0";

/// Default cap on entries returned by one `eth_getAddressHistory` call.
pub const DEFAULT_MAX_HISTORY_RESULTS: usize = 1000;

/// Configuration for the RPC server.
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    /// Address to bind the HTTP server to.
    pub http_addr: SocketAddr,
    /// Chain ID to return for eth_chainId.
    pub chain_id: u64,
    /// Upper bound on the `limit` of `eth_getAddressHistory`.
    pub max_history_results: usize,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([127, 0, 0, 1], 8545)),
            chain_id: 1,
            max_history_results: DEFAULT_MAX_HISTORY_RESULTS,
        }
    }
}

/// Trait for providing chain state to the RPC server.
///
/// This is the integration point between the RPC layer and the indexing
/// subsystem. Implement this trait to provide actual chain data.
#[async_trait]
pub trait StateProvider: Send + Sync + 'static {
    /// Get the current block number, or `None` before the first block.
    async fn block_number(&self) -> Result<Option<u64>, RpcError>;

    /// Get a retained block by number.
    async fn get_block_by_number(
        &self,
        number: u64,
        full_transactions: bool,
    ) -> Result<Option<RpcBlock>, RpcError>;

    /// Get a retained transaction by hash.
    async fn get_transaction_by_hash(&self, hash: B256)
        -> Result<Option<RpcTransaction>, RpcError>;

    /// Get a retained transaction receipt by hash.
    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<RpcReceipt>, RpcError>;

    /// Install a new-block filter at the current head.
    async fn new_block_filter(&self) -> Result<FilterId, RpcError>;

    /// Hashes of blocks committed since the filter's last poll.
    async fn get_filter_changes(&self, id: &FilterId) -> Result<Vec<B256>, RpcError>;

    /// Remove a filter.
    async fn uninstall_filter(&self, id: &FilterId) -> Result<(), RpcError>;

    /// At most `limit` history entries for `address`, after `cursor`.
    async fn get_address_history(
        &self,
        address: Address,
        cursor: Option<HistoryCursor>,
        limit: usize,
    ) -> Result<Vec<RpcHistoryEntry>, RpcError>;

    /// The `created` entry of a contract, if retained.
    async fn get_contract_deployment(
        &self,
        contract: Address,
    ) -> Result<Option<RpcHistoryEntry>, RpcError>;
}

/// A no-op state provider for testing and development.
///
/// Reports an empty chain and knows no filters.
pub struct NoopStateProvider;

#[async_trait]
impl StateProvider for NoopStateProvider {
    async fn block_number(&self) -> Result<Option<u64>, RpcError> {
        Ok(None)
    }

    async fn get_block_by_number(
        &self,
        _number: u64,
        _full_transactions: bool,
    ) -> Result<Option<RpcBlock>, RpcError> {
        Ok(None)
    }

    async fn get_transaction_by_hash(
        &self,
        _hash: B256,
    ) -> Result<Option<RpcTransaction>, RpcError> {
        Ok(None)
    }

    async fn get_transaction_receipt(&self, _hash: B256) -> Result<Option<RpcReceipt>, RpcError> {
        Ok(None)
    }

    async fn new_block_filter(&self) -> Result<FilterId, RpcError> {
        Err(RpcError::InternalError(
            "filters are not available".to_string(),
        ))
    }

    async fn get_filter_changes(&self, id: &FilterId) -> Result<Vec<B256>, RpcError> {
        Err(RpcError::FilterNotFound(id.to_string()))
    }

    async fn uninstall_filter(&self, id: &FilterId) -> Result<(), RpcError> {
        Err(RpcError::FilterNotFound(id.to_string()))
    }

    async fn get_address_history(
        &self,
        _address: Address,
        _cursor: Option<HistoryCursor>,
        _limit: usize,
    ) -> Result<Vec<RpcHistoryEntry>, RpcError> {
        Ok(vec![])
    }

    async fn get_contract_deployment(
        &self,
        _contract: Address,
    ) -> Result<Option<RpcHistoryEntry>, RpcError> {
        Ok(None)
    }
}

/// The RPC server implementation.
pub struct EthRpcServer<S: StateProvider> {
    config: RpcServerConfig,
    state: Arc<S>,
}

impl<S: StateProvider> EthRpcServer<S> {
    /// Create a new RPC server with the given configuration and state provider.
    pub fn new(config: RpcServerConfig, state: S) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Resolve the requested history page size against the configured cap.
    fn resolve_history_limit(&self, limit: Option<U64>) -> Result<usize, RpcError> {
        let max = self.config.max_history_results;
        match limit {
            None => Ok(max),
            Some(l) if l.is_zero() => Err(RpcError::InvalidParams(
                "limit must be at least 1".to_string(),
            )),
            Some(l) => Ok(usize::try_from(l.to::<u64>()).map_or(max, |l| l.min(max))),
        }
    }

    /// Resolve a block number or tag. `None` means the chain is still empty.
    async fn resolve_block_number(&self, block: BlockNumberOrTag) -> Result<Option<u64>, RpcError> {
        match block {
            BlockNumberOrTag::Number(n) => Ok(Some(n.to::<u64>())),
            BlockNumberOrTag::Tag(tag) => match tag {
                BlockTag::Latest | BlockTag::Safe | BlockTag::Finalized | BlockTag::Pending => {
                    self.state.block_number().await
                }
                BlockTag::Earliest => Ok(Some(0)),
            },
        }
    }
}

#[async_trait]
impl<S: StateProvider> EthApiServer for EthRpcServer<S> {
    async fn chain_id(&self) -> Result<U64, ErrorObjectOwned> {
        Ok(U64::from(self.config.chain_id))
    }

    async fn block_number(&self) -> Result<U64, ErrorObjectOwned> {
        let number = self
            .state
            .block_number()
            .await
            .map_err(ErrorObjectOwned::from)?;
        Ok(U64::from(number.unwrap_or(0)))
    }

    async fn get_block_by_number(
        &self,
        block: BlockNumberOrTag,
        full_transactions: bool,
    ) -> Result<Option<RpcBlock>, ErrorObjectOwned> {
        let block_num = self
            .resolve_block_number(block)
            .await
            .map_err(ErrorObjectOwned::from)?;
        match block_num {
            Some(n) => self
                .state
                .get_block_by_number(n, full_transactions)
                .await
                .map_err(|e| e.into()),
            None => Ok(None),
        }
    }

    async fn get_transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<RpcTransaction>, ErrorObjectOwned> {
        self.state
            .get_transaction_by_hash(hash)
            .await
            .map_err(|e| e.into())
    }

    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<RpcReceipt>, ErrorObjectOwned> {
        self.state
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| e.into())
    }

    async fn new_block_filter(&self) -> Result<FilterId, ErrorObjectOwned> {
        self.state.new_block_filter().await.map_err(|e| e.into())
    }

    async fn get_filter_changes(&self, id: FilterId) -> Result<Vec<B256>, ErrorObjectOwned> {
        self.state
            .get_filter_changes(&id)
            .await
            .map_err(|e| e.into())
    }

    async fn uninstall_filter(&self, id: FilterId) -> Result<bool, ErrorObjectOwned> {
        self.state
            .uninstall_filter(&id)
            .await
            .map_err(ErrorObjectOwned::from)?;
        Ok(true)
    }

    async fn get_address_history(
        &self,
        address: Address,
        cursor: Option<HistoryCursor>,
        limit: Option<U64>,
    ) -> Result<Vec<RpcHistoryEntry>, ErrorObjectOwned> {
        let limit = self
            .resolve_history_limit(limit)
            .map_err(ErrorObjectOwned::from)?;
        self.state
            .get_address_history(address, cursor, limit)
            .await
            .map_err(|e| e.into())
    }
}

#[async_trait]
impl<S: StateProvider> KortanaApiServer for EthRpcServer<S> {
    async fn get_contract_deployment(
        &self,
        contract: Address,
    ) -> Result<Option<RpcHistoryEntry>, ErrorObjectOwned> {
        self.state
            .get_contract_deployment(contract)
            .await
            .map_err(|e| e.into())
    }
}

#[async_trait]
impl<S: StateProvider> Web3ApiServer for EthRpcServer<S> {
    async fn client_version(&self) -> Result<String, ErrorObjectOwned> {
        Ok(CLIENT_VERSION.to_string())
    }
}

#[async_trait]
impl<S: StateProvider> NetApiServer for EthRpcServer<S> {
    async fn version(&self) -> Result<String, ErrorObjectOwned> {
        Ok(self.config.chain_id.to_string())
    }
}

/// Start the JSON-RPC server.
///
/// Returns the bound address (useful when binding to port 0) and a handle
/// that stops the server when asked.
pub async fn start_server<S: StateProvider>(
    config: RpcServerConfig,
    state: S,
) -> Result<(SocketAddr, ServerHandle), Box<dyn std::error::Error + Send + Sync>> {
    let server = Server::builder().build(config.http_addr).await?;
    let local_addr = server.local_addr()?;

    let eth_rpc = EthRpcServer::new(config, state);
    let mut module = RpcModule::new(());

    module.merge(EthApiServer::into_rpc(eth_rpc.clone()))?;
    module.merge(Web3ApiServer::into_rpc(eth_rpc.clone()))?;
    module.merge(NetApiServer::into_rpc(eth_rpc.clone()))?;
    module.merge(KortanaApiServer::into_rpc(eth_rpc))?;

    let handle = server.start(module);
    tracing::info!(%local_addr, "JSON-RPC server listening");
    Ok((local_addr, handle))
}

// Need Clone for the RPC server to be used in multiple places
impl<S: StateProvider> Clone for EthRpcServer<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        }
    }
}
