//! JSON-RPC API trait definitions using jsonrpsee.
//!
//! This module defines the Ethereum-compatible JSON-RPC API that the server implements.

use alloy_primitives::{Address, B256, U64};
use jsonrpsee::proc_macros::rpc;
use kortana_rpc_types::{
    BlockNumberOrTag, FilterId, HistoryCursor, RpcBlock, RpcHistoryEntry, RpcReceipt,
    RpcTransaction,
};

/// Ethereum namespace RPC API.
///
/// The chain, block, transaction, filter and address-history methods
/// wallets poll against.
#[rpc(server, namespace = "eth")]
pub trait EthApi {
    /// Returns the current chain ID.
    #[method(name = "chainId")]
    async fn chain_id(&self) -> Result<U64, jsonrpsee::types::ErrorObjectOwned>;

    /// Returns the number of the most recent block.
    #[method(name = "blockNumber")]
    async fn block_number(&self) -> Result<U64, jsonrpsee::types::ErrorObjectOwned>;

    /// Returns a retained block by number or tag.
    #[method(name = "getBlockByNumber")]
    async fn get_block_by_number(
        &self,
        block: BlockNumberOrTag,
        full_transactions: bool,
    ) -> Result<Option<RpcBlock>, jsonrpsee::types::ErrorObjectOwned>;

    /// Returns a retained transaction by hash.
    #[method(name = "getTransactionByHash")]
    async fn get_transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<RpcTransaction>, jsonrpsee::types::ErrorObjectOwned>;

    /// Returns the receipt of a retained transaction.
    #[method(name = "getTransactionReceipt")]
    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<RpcReceipt>, jsonrpsee::types::ErrorObjectOwned>;

    /// Creates a filter that reports newly committed block hashes.
    #[method(name = "newBlockFilter")]
    async fn new_block_filter(&self) -> Result<FilterId, jsonrpsee::types::ErrorObjectOwned>;

    /// Returns block hashes committed since the filter was last polled.
    #[method(name = "getFilterChanges")]
    async fn get_filter_changes(
        &self,
        id: FilterId,
    ) -> Result<Vec<B256>, jsonrpsee::types::ErrorObjectOwned>;

    /// Removes a filter.
    #[method(name = "uninstallFilter")]
    async fn uninstall_filter(
        &self,
        id: FilterId,
    ) -> Result<bool, jsonrpsee::types::ErrorObjectOwned>;

    /// Returns the transactions an address sent, received or was created by,
    /// oldest first, starting after `cursor`.
    #[method(name = "getAddressHistory")]
    async fn get_address_history(
        &self,
        address: Address,
        cursor: Option<HistoryCursor>,
        limit: Option<U64>,
    ) -> Result<Vec<RpcHistoryEntry>, jsonrpsee::types::ErrorObjectOwned>;
}

/// Kortana-specific RPC API.
#[rpc(server, namespace = "kortana")]
pub trait KortanaApi {
    /// Returns the transaction that deployed a contract, if still retained.
    #[method(name = "getContractDeployment")]
    async fn get_contract_deployment(
        &self,
        contract: Address,
    ) -> Result<Option<RpcHistoryEntry>, jsonrpsee::types::ErrorObjectOwned>;
}

/// Web3 namespace RPC API.
#[rpc(server, namespace = "web3")]
pub trait Web3Api {
    /// Returns the current client version.
    #[method(name = "clientVersion")]
    async fn client_version(&self) -> Result<String, jsonrpsee::types::ErrorObjectOwned>;
}

/// Net namespace RPC API.
#[rpc(server, namespace = "net")]
pub trait NetApi {
    /// Returns the current network ID.
    #[method(name = "version")]
    async fn version(&self) -> Result<String, jsonrpsee::types::ErrorObjectOwned>;
}
