//! Transaction and receipt lookup types.

use alloy_primitives::{Address, B256, U256, U64};
use serde::{Deserialize, Serialize};

/// A committed transaction as returned by `eth_getTransactionByHash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub hash: B256,
    pub nonce: U64,
    pub block_hash: B256,
    pub block_number: U64,
    /// Position of the transaction within its block
    pub transaction_index: U64,
    pub from: Address,
    /// Recipient address (null for contract creation)
    pub to: Option<Address>,
    pub value: U256,
    /// Length of the input payload in bytes
    pub input_size: U64,
}

/// Execution outcome as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: B256,
    pub transaction_index: U64,
    pub block_hash: B256,
    pub block_number: U64,
    pub from: Address,
    /// Recipient address (null for contract creation)
    pub to: Option<Address>,
    /// Gas used in the block up to and including this transaction
    pub cumulative_gas_used: U64,
    pub gas_used: U64,
    /// Contract address if this was a successful contract creation
    pub contract_address: Option<Address>,
    /// Number of logs emitted
    pub log_count: U64,
    /// Status (1 = success, 0 = failure)
    pub status: U64,
}

impl RpcReceipt {
    /// Status code for successful transaction.
    pub const STATUS_SUCCESS: u64 = 1;
    /// Status code for failed transaction.
    pub const STATUS_FAILURE: u64 = 0;

    pub fn is_success(&self) -> bool {
        self.status == U64::from(Self::STATUS_SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_json_shape() {
        let receipt = RpcReceipt {
            transaction_hash: B256::repeat_byte(0x11),
            transaction_index: U64::from(1),
            block_hash: B256::repeat_byte(0x22),
            block_number: U64::from(9),
            from: Address::repeat_byte(0x0a),
            to: None,
            cumulative_gas_used: U64::from(141_000u64),
            gas_used: U64::from(120_000u64),
            contract_address: Some(Address::repeat_byte(0xcc)),
            log_count: U64::ZERO,
            status: U64::from(RpcReceipt::STATUS_SUCCESS),
        };

        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["status"], "0x1");
        assert_eq!(json["gasUsed"], "0x1d4c0");
        assert_eq!(json["to"], serde_json::Value::Null);
        assert_eq!(
            json["contractAddress"],
            format!("0x{}", "cc".repeat(20))
        );
        assert!(receipt.is_success());
    }

    #[test]
    fn test_transaction_json_shape() {
        let tx = RpcTransaction {
            hash: B256::ZERO,
            nonce: U64::from(1),
            block_hash: B256::ZERO,
            block_number: U64::from(3),
            transaction_index: U64::ZERO,
            from: Address::ZERO,
            to: Some(Address::repeat_byte(0x0b)),
            value: U256::from(1000),
            input_size: U64::ZERO,
        };

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["nonce"], "0x1");
        assert_eq!(json["value"], "0x3e8");
        assert_eq!(json["blockNumber"], "0x3");
        assert_eq!(json["to"], format!("0x{}", "0b".repeat(20)));
    }
}
