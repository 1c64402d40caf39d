//! Types for chain data indexing.
//!
//! These types are optimized for storage and indexing, separate from the RPC
//! response types in `kortana_rpc_types`.

use alloy_primitives::{Address, B256, U256, U64};
use kortana_rpc_types::{
    BlockTransactions, HistoryRole, RpcBlock, RpcHistoryEntry, RpcReceipt, RpcTransaction,
};
use serde::{Deserialize, Serialize};

/// Committed block header with the ordered list of its transaction hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlock {
    /// Block sequence number.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Block timestamp (Unix seconds).
    pub timestamp: u64,
    /// Transaction hashes in block order.
    pub transaction_hashes: Vec<B256>,
}

impl StoredBlock {
    /// Convert to RPC block format.
    ///
    /// `gas_used` is summed by the caller from the block's receipts.
    pub fn to_rpc_block(&self, gas_used: u64, transactions: BlockTransactions) -> RpcBlock {
        RpcBlock {
            number: U64::from(self.number),
            hash: self.hash,
            parent_hash: self.parent_hash,
            timestamp: U64::from(self.timestamp),
            gas_used: U64::from(gas_used),
            transactions,
        }
    }
}

/// Transaction as included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub hash: B256,
    pub from: Address,
    /// Recipient address (None for contract creation).
    pub to: Option<Address>,
    pub value: U256,
    pub nonce: u64,
    /// Length of the raw input payload in bytes.
    pub payload_len: usize,
}

impl StoredTransaction {
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

/// Execution outcome of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReceipt {
    pub transaction_hash: B256,
    pub success: bool,
    pub gas_used: u64,
    /// Contract address assigned by a successful deployment.
    pub contract_address: Option<Address>,
    pub log_count: u64,
}

/// A transaction, its receipt and where it landed, as retained for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub block_number: u64,
    pub block_hash: B256,
    pub transaction_index: u32,
    pub transaction: StoredTransaction,
    pub receipt: StoredReceipt,
    /// Gas used in the block up to and including this transaction.
    pub cumulative_gas_used: u64,
}

impl TransactionRecord {
    pub fn hash(&self) -> B256 {
        self.transaction.hash
    }

    /// Convert to RPC transaction format.
    pub fn to_rpc_transaction(&self) -> RpcTransaction {
        let tx = &self.transaction;
        RpcTransaction {
            hash: tx.hash,
            nonce: U64::from(tx.nonce),
            block_hash: self.block_hash,
            block_number: U64::from(self.block_number),
            transaction_index: U64::from(self.transaction_index),
            from: tx.from,
            to: tx.to,
            value: tx.value,
            input_size: U64::from(tx.payload_len as u64),
        }
    }

    /// Convert to RPC receipt format.
    pub fn to_rpc_receipt(&self) -> RpcReceipt {
        let status = if self.receipt.success {
            RpcReceipt::STATUS_SUCCESS
        } else {
            RpcReceipt::STATUS_FAILURE
        };
        RpcReceipt {
            transaction_hash: self.transaction.hash,
            transaction_index: U64::from(self.transaction_index),
            block_hash: self.block_hash,
            block_number: U64::from(self.block_number),
            from: self.transaction.from,
            to: self.transaction.to,
            cumulative_gas_used: U64::from(self.cumulative_gas_used),
            gas_used: U64::from(self.receipt.gas_used),
            contract_address: self.receipt.contract_address,
            log_count: U64::from(self.receipt.log_count),
            status: U64::from(status),
        }
    }
}

/// A committed block exactly as handed over by the execution engine.
#[derive(Debug, Clone)]
pub struct CommittedBlock {
    pub block: StoredBlock,
    pub transactions: Vec<StoredTransaction>,
    pub receipts: Vec<StoredReceipt>,
}

/// Role of an address in a transaction.
///
/// The derived order is the order entries of one transaction are listed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Sender,
    Recipient,
    Created,
}

impl Role {
    /// Compact code used by the SQLite backend.
    pub fn as_u8(self) -> u8 {
        match self {
            Role::Sender => 0,
            Role::Recipient => 1,
            Role::Created => 2,
        }
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Role::Sender),
            1 => Some(Role::Recipient),
            2 => Some(Role::Created),
            _ => None,
        }
    }
}

impl From<Role> for HistoryRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Sender => HistoryRole::Sender,
            Role::Recipient => HistoryRole::Recipient,
            Role::Created => HistoryRole::Created,
        }
    }
}

impl From<HistoryRole> for Role {
    fn from(role: HistoryRole) -> Self {
        match role {
            HistoryRole::Sender => Role::Sender,
            HistoryRole::Recipient => Role::Recipient,
            HistoryRole::Created => Role::Created,
        }
    }
}

/// Position of an entry within an address's history.
///
/// Ordering is lexicographic over (block, transaction index, role), which is
/// exactly the order history is returned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HistoryPosition {
    pub block_number: u64,
    pub transaction_index: u32,
    pub role: Role,
}

/// One (address, transaction) pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressHistoryEntry {
    pub address: Address,
    pub block_number: u64,
    pub transaction_index: u32,
    pub transaction_hash: B256,
    pub role: Role,
}

impl AddressHistoryEntry {
    pub fn position(&self) -> HistoryPosition {
        HistoryPosition {
            block_number: self.block_number,
            transaction_index: self.transaction_index,
            role: self.role,
        }
    }

    /// Convert to RPC history format.
    pub fn to_rpc_entry(&self) -> RpcHistoryEntry {
        RpcHistoryEntry {
            hash: self.transaction_hash,
            block_number: U64::from(self.block_number),
            role: self.role.into(),
            transaction_index: U64::from(self.transaction_index),
        }
    }
}

/// Everything one block contributes to the index, ready to append.
#[derive(Debug, Clone)]
pub struct BlockEntries {
    pub block: StoredBlock,
    /// Entries in position order.
    pub entries: Vec<AddressHistoryEntry>,
    /// Transactions with their receipts, in block order.
    pub transactions: Vec<TransactionRecord>,
}

impl BlockEntries {
    pub fn number(&self) -> u64 {
        self.block.number
    }
}
