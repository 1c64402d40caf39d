//! Wire types for the Kortana JSON-RPC indexing surface.
//!
//! This crate provides the JSON shapes exchanged with wallet clients
//! (address-history entries, history cursors, filter identifiers, block,
//! transaction and receipt lookups) and the shapes consumed from the
//! execution engine when a block is committed.

use alloy_primitives::U64;
use serde::{Deserialize, Serialize};

pub mod block;
pub mod engine;
pub mod filter;
pub mod history;
pub mod transaction;

pub use block::{BlockNumberOrTag, BlockTag, BlockTransactions, RpcBlock};
pub use engine::{EngineBlock, EngineReceipt, EngineTransaction, ReceiptStatus};
pub use filter::FilterId;
pub use history::{HistoryCursor, HistoryRole, RpcHistoryEntry};
pub use transaction::{RpcReceipt, RpcTransaction};

/// Retention window reported alongside a `RetentionExpired` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionWindow {
    /// The block number the request referred to.
    pub requested: U64,
    /// The oldest block still retained by the node.
    pub oldest_available: U64,
}

impl RetentionWindow {
    pub fn new(requested: u64, oldest_available: u64) -> Self {
        Self {
            requested: U64::from(requested),
            oldest_available: U64::from(oldest_available),
        }
    }
}
