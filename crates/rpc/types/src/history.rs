//! Address-history response and cursor types.

use alloy_primitives::{B256, U64};
use serde::{Deserialize, Serialize};

/// How an address took part in a transaction.
///
/// Variants are ordered the way entries of one transaction are listed:
/// sender first, then recipient, then the contract created by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    /// The address signed the transaction (outflow).
    Sender,
    /// The address received the transaction (inflow).
    Recipient,
    /// The address was assigned to a contract deployed by the transaction.
    Created,
}

/// One transaction summary returned by `eth_getAddressHistory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcHistoryEntry {
    /// Transaction hash
    pub hash: B256,
    /// Block containing the transaction
    pub block_number: U64,
    /// Role of the queried address
    pub role: HistoryRole,
    /// Position of the transaction within its block
    pub transaction_index: U64,
}

/// Pagination cursor for `eth_getAddressHistory`.
///
/// Results start strictly after the entry identified by the cursor. Clients
/// normally build it from the last entry of the previous page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCursor {
    pub block_number: U64,
    pub transaction_index: U64,
    pub role: HistoryRole,
}

impl From<&RpcHistoryEntry> for HistoryCursor {
    fn from(entry: &RpcHistoryEntry) -> Self {
        Self {
            block_number: entry.block_number,
            transaction_index: entry.transaction_index,
            role: entry.role,
        }
    }
}
