//! Integration helpers for converting execution-engine output to chain-index
//! storage types.
//!
//! Receipt status normalization already happened while deserializing the
//! [`EngineBlock`]; from here on a receipt's outcome is a plain boolean.

use kortana_rpc_types::{EngineBlock, EngineReceipt, EngineTransaction};

use crate::error::ChainIndexResult;
use crate::history::AddressHistoryIndex;
use crate::indexer::ChainIndexer;
use crate::types::{CommittedBlock, StoredBlock, StoredReceipt, StoredTransaction};

/// Build indexable data from a committed engine block.
pub fn build_index_data(block: EngineBlock) -> CommittedBlock {
    let EngineBlock {
        number,
        hash,
        parent_hash,
        timestamp,
        transactions,
        receipts,
    } = block;

    let transactions: Vec<StoredTransaction> =
        transactions.into_iter().map(build_stored_transaction).collect();
    let receipts = receipts.into_iter().map(build_stored_receipt).collect();

    CommittedBlock {
        block: StoredBlock {
            number: number.to(),
            hash,
            parent_hash,
            timestamp: timestamp.to(),
            transaction_hashes: transactions.iter().map(|tx| tx.hash).collect(),
        },
        transactions,
        receipts,
    }
}

fn build_stored_transaction(tx: EngineTransaction) -> StoredTransaction {
    StoredTransaction {
        hash: tx.hash,
        from: tx.from,
        to: tx.to,
        value: tx.value,
        nonce: tx.nonce.to(),
        payload_len: tx.input.len(),
    }
}

fn build_stored_receipt(receipt: EngineReceipt) -> StoredReceipt {
    StoredReceipt {
        transaction_hash: receipt.transaction_hash,
        success: receipt.status.is_success(),
        gas_used: receipt.gas_used.to(),
        contract_address: receipt.contract_address,
        log_count: receipt.log_count.to(),
    }
}

/// Helper to index an engine block.
///
/// This is a convenience function that builds the index data and hands it to
/// the ingest lane.
pub fn index_block<I>(indexer: &ChainIndexer<I>, block: EngineBlock) -> ChainIndexResult<()>
where
    I: AddressHistoryIndex + ?Sized,
{
    indexer.on_block_committed(build_index_data(block))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{IndexSettings, InMemoryHistoryIndex};
    use crate::types::Role;
    use alloy_primitives::Address;
    use std::sync::Arc;

    fn engine_block(json: serde_json::Value) -> EngineBlock {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_build_index_data_normalizes_statuses() {
        let block = engine_block(serde_json::json!({
            "number": "0x7",
            "hash": format!("0x{}", "07".repeat(32)),
            "timestamp": "0x64",
            "transactions": [
                { "hash": format!("0x{}", "a1".repeat(32)), "from": format!("0x{}", "0a".repeat(20)), "to": format!("0x{}", "0b".repeat(20)), "value": "0x1", "input": "0xdeadbeef" },
                { "hash": format!("0x{}", "a2".repeat(32)), "from": format!("0x{}", "0a".repeat(20)) },
                { "hash": format!("0x{}", "a3".repeat(32)), "from": format!("0x{}", "0a".repeat(20)) }
            ],
            "receipts": [
                { "transactionHash": format!("0x{}", "a1".repeat(32)), "status": 1, "gasUsed": "0x5208" },
                { "transactionHash": format!("0x{}", "a2".repeat(32)), "status": "0x1", "contractAddress": format!("0x{}", "cc".repeat(20)) },
                { "transactionHash": format!("0x{}", "a3".repeat(32)) }
            ]
        }));

        let committed = build_index_data(block);
        assert_eq!(committed.block.number, 7);
        assert_eq!(committed.block.timestamp, 100);
        assert_eq!(committed.block.transaction_hashes.len(), 3);
        assert_eq!(committed.transactions[0].payload_len, 4);
        assert!(committed.transactions[1].is_contract_creation());
        assert_eq!(committed.receipts[0].gas_used, 21_000);

        let statuses: Vec<bool> = committed.receipts.iter().map(|r| r.success).collect();
        assert_eq!(statuses, vec![true, true, false]);
    }

    #[test]
    fn test_index_block_records_deployment() {
        let index: Arc<dyn AddressHistoryIndex> =
            Arc::new(InMemoryHistoryIndex::new(IndexSettings::default()));
        let indexer = ChainIndexer::new(index, 16);
        let contract = Address::repeat_byte(0xcc);

        let block = engine_block(serde_json::json!({
            "number": "0x0",
            "hash": format!("0x{}", "01".repeat(32)),
            "transactions": [
                { "hash": format!("0x{}", "a1".repeat(32)), "from": format!("0x{}", "0d".repeat(20)) }
            ],
            "receipts": [
                { "transactionHash": format!("0x{}", "a1".repeat(32)), "status": "0x1", "contractAddress": contract }
            ]
        }));

        index_block(&indexer, block).unwrap();
        let found = indexer.index().find_deployment(contract).unwrap().unwrap();
        assert_eq!(found.role, Role::Created);
        assert_eq!(found.block_number, 0);
    }
}
