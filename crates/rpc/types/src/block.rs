//! Block lookup types for `eth_getBlockByNumber`.

use alloy_primitives::{B256, U64};
use serde::{Deserialize, Serialize};

use crate::transaction::RpcTransaction;

/// A retained block as returned by `eth_getBlockByNumber`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    pub number: U64,
    pub hash: B256,
    pub parent_hash: B256,
    /// Block timestamp (Unix seconds)
    pub timestamp: U64,
    /// Gas used by all transactions in the block
    pub gas_used: U64,
    pub transactions: BlockTransactions,
}

/// Block transactions - either just hashes or full transaction objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTransactions {
    Hashes(Vec<B256>),
    Full(Vec<RpcTransaction>),
}

impl BlockTransactions {
    pub fn len(&self) -> usize {
        match self {
            BlockTransactions::Hashes(hashes) => hashes.len(),
            BlockTransactions::Full(txs) => txs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Block number or tag for RPC requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockNumberOrTag {
    /// Specific block number (hex encoded)
    Number(U64),
    Tag(BlockTag),
}

impl Default for BlockNumberOrTag {
    fn default() -> Self {
        BlockNumberOrTag::Tag(BlockTag::Latest)
    }
}

/// Standard Ethereum block tags.
///
/// Every committed block is final here, so all tags except `earliest` name
/// the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    Latest,
    Earliest,
    Pending,
    Safe,
    Finalized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_number_or_tag_parsing() {
        let number: BlockNumberOrTag = serde_json::from_str("\"0x2a\"").unwrap();
        assert_eq!(number, BlockNumberOrTag::Number(U64::from(42)));

        let latest: BlockNumberOrTag = serde_json::from_str("\"latest\"").unwrap();
        assert_eq!(latest, BlockNumberOrTag::Tag(BlockTag::Latest));

        let earliest: BlockNumberOrTag = serde_json::from_str("\"earliest\"").unwrap();
        assert_eq!(earliest, BlockNumberOrTag::Tag(BlockTag::Earliest));

        assert!(serde_json::from_str::<BlockNumberOrTag>("\"newest\"").is_err());
    }

    #[test]
    fn test_block_serialization_with_hashes() {
        let block = RpcBlock {
            number: U64::from(1),
            hash: B256::repeat_byte(0x01),
            parent_hash: B256::ZERO,
            timestamp: U64::from(1_234_567_890u64),
            gas_used: U64::from(21_000u64),
            transactions: BlockTransactions::Hashes(vec![B256::repeat_byte(0xaa)]),
        };

        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["number"], "0x1");
        assert_eq!(json["timestamp"], "0x499602d2");
        assert_eq!(json["gasUsed"], "0x5208");
        assert_eq!(
            json["transactions"],
            serde_json::json!([format!("0x{}", "aa".repeat(32))])
        );
    }
}
