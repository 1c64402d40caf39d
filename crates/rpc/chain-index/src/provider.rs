//! StateProvider implementation using the address history index.
//!
//! This module provides `ChainStateProvider` which implements the `StateProvider`
//! trait from `kortana_eth_jsonrpc` using:
//! - an `AddressHistoryIndex` for block, transaction, history and deployment queries
//! - the `BlockNotifier` for the chain head
//! - the `FilterRegistry` for block filters

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use kortana_eth_jsonrpc::error::RpcError;
use kortana_eth_jsonrpc::StateProvider;
use kortana_rpc_types::{
    BlockTransactions, FilterId, HistoryCursor, RpcBlock, RpcHistoryEntry, RpcReceipt,
    RpcTransaction,
};

use crate::error::ChainIndexError;
use crate::filters::{FilterKind, FilterRegistry};
use crate::history::AddressHistoryIndex;
use crate::notifier::BlockNotifier;
use crate::types::HistoryPosition;

/// State provider backed by the indexing subsystem.
///
/// This is the main integration point between the RPC server and the chain data.
pub struct ChainStateProvider<I: AddressHistoryIndex + ?Sized> {
    index: Arc<I>,
    notifier: Arc<BlockNotifier>,
    filters: Arc<FilterRegistry>,
}

impl<I: AddressHistoryIndex + ?Sized> ChainStateProvider<I> {
    pub fn new(index: Arc<I>, notifier: Arc<BlockNotifier>, filters: Arc<FilterRegistry>) -> Self {
        Self {
            index,
            notifier,
            filters,
        }
    }
}

impl From<ChainIndexError> for RpcError {
    fn from(err: ChainIndexError) -> Self {
        match err {
            ChainIndexError::FilterNotFound(id) => RpcError::FilterNotFound(id.to_string()),
            ChainIndexError::RetentionExpired {
                requested,
                oldest_available,
            } => RpcError::RetentionExpired {
                requested,
                oldest_available,
            },
            _ => RpcError::InternalError(err.to_string()),
        }
    }
}

fn cursor_position(cursor: HistoryCursor) -> Result<HistoryPosition, RpcError> {
    let transaction_index = u32::try_from(cursor.transaction_index.to::<u64>())
        .map_err(|_| RpcError::InvalidParams("cursor transaction index out of range".to_string()))?;
    Ok(HistoryPosition {
        block_number: cursor.block_number.to(),
        transaction_index,
        role: cursor.role.into(),
    })
}

#[async_trait]
impl<I: AddressHistoryIndex + ?Sized + 'static> StateProvider for ChainStateProvider<I> {
    async fn block_number(&self) -> Result<Option<u64>, RpcError> {
        Ok(self.notifier.head())
    }

    async fn get_block_by_number(
        &self,
        number: u64,
        full_transactions: bool,
    ) -> Result<Option<RpcBlock>, RpcError> {
        let block = match self.index.get_block(number)? {
            Some(b) => b,
            None => return Ok(None),
        };

        let records = self.index.get_block_transactions(number)?;
        let gas_used = records.last().map_or(0, |r| r.cumulative_gas_used);
        let transactions = if full_transactions {
            BlockTransactions::Full(records.iter().map(|r| r.to_rpc_transaction()).collect())
        } else {
            BlockTransactions::Hashes(block.transaction_hashes.clone())
        };

        Ok(Some(block.to_rpc_block(gas_used, transactions)))
    }

    async fn get_transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<RpcTransaction>, RpcError> {
        Ok(self
            .index
            .get_transaction(hash)?
            .map(|r| r.to_rpc_transaction()))
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<RpcReceipt>, RpcError> {
        Ok(self.index.get_transaction(hash)?.map(|r| r.to_rpc_receipt()))
    }

    async fn new_block_filter(&self) -> Result<FilterId, RpcError> {
        Ok(self.filters.create(FilterKind::NewBlocks))
    }

    async fn get_filter_changes(&self, id: &FilterId) -> Result<Vec<B256>, RpcError> {
        Ok(self.filters.poll(id)?)
    }

    async fn uninstall_filter(&self, id: &FilterId) -> Result<(), RpcError> {
        Ok(self.filters.destroy(id)?)
    }

    async fn get_address_history(
        &self,
        address: Address,
        cursor: Option<HistoryCursor>,
        limit: usize,
    ) -> Result<Vec<RpcHistoryEntry>, RpcError> {
        let cursor = cursor.map(cursor_position).transpose()?;
        let entries = self.index.query(address, cursor, Some(limit)).map_err(|e| {
            if let ChainIndexError::RetentionExpired { requested, .. } = &e {
                tracing::warn!(%address, requested, "history cursor outside retention window");
            }
            e
        })?;
        Ok(entries.iter().map(|e| e.to_rpc_entry()).collect())
    }

    async fn get_contract_deployment(
        &self,
        contract: Address,
    ) -> Result<Option<RpcHistoryEntry>, RpcError> {
        Ok(self
            .index
            .find_deployment(contract)?
            .map(|e| e.to_rpc_entry()))
    }
}
