//! Receipt ingest: turns a committed block into address-history records.
//!
//! This is a pure transform. It validates that the engine's transactions and
//! receipts line up with the block and that every receipt agrees with its
//! transaction, then emits one entry per (address, transaction) pairing:
//!
//! - the sender, always;
//! - the recipient, when the transaction has one (a self-transfer yields both);
//! - the assigned contract address, for a deployment whose receipt reports
//!   success.
//!
//! A failed deployment never produces an entry for the would-be contract.
//!
//! Every transaction is also kept with its receipt as a [`TransactionRecord`]
//! so it can be looked up by hash.

use std::collections::HashSet;

use alloy_primitives::B256;

use crate::error::{ChainIndexError, ChainIndexResult};
use crate::types::{
    AddressHistoryEntry, BlockEntries, CommittedBlock, Role, StoredReceipt, StoredTransaction,
    TransactionRecord,
};

/// Produce the history entries for one committed block.
pub fn ingest_block(committed: &CommittedBlock) -> ChainIndexResult<BlockEntries> {
    let block = &committed.block;
    check_block_shape(committed)?;

    let mut entries = Vec::with_capacity(committed.transactions.len() * 2);
    let mut records = Vec::with_capacity(committed.transactions.len());
    let mut cumulative_gas_used = 0u64;
    for (index, (tx, receipt)) in committed
        .transactions
        .iter()
        .zip(&committed.receipts)
        .enumerate()
    {
        check_receipt(tx, receipt)?;

        let transaction_index =
            u32::try_from(index).map_err(|_| ChainIndexError::MismatchedBlock {
                block: block.number,
                reason: format!("transaction index {index} exceeds u32"),
            })?;

        let entry = |address, role| AddressHistoryEntry {
            address,
            block_number: block.number,
            transaction_index,
            transaction_hash: tx.hash,
            role,
        };

        entries.push(entry(tx.from, Role::Sender));
        if let Some(to) = tx.to {
            entries.push(entry(to, Role::Recipient));
        }
        if let (true, Some(contract)) = (receipt.success, receipt.contract_address) {
            entries.push(entry(contract, Role::Created));
        }

        cumulative_gas_used = cumulative_gas_used.saturating_add(receipt.gas_used);
        records.push(TransactionRecord {
            block_number: block.number,
            block_hash: block.hash,
            transaction_index,
            transaction: tx.clone(),
            receipt: receipt.clone(),
            cumulative_gas_used,
        });
    }

    tracing::debug!(
        block = block.number,
        transactions = committed.transactions.len(),
        entries = entries.len(),
        "ingested block"
    );

    Ok(BlockEntries {
        block: block.clone(),
        entries,
        transactions: records,
    })
}

fn check_block_shape(committed: &CommittedBlock) -> ChainIndexResult<()> {
    let block = &committed.block;
    let mismatch = |reason: String| ChainIndexError::MismatchedBlock {
        block: block.number,
        reason,
    };

    let expected = block.transaction_hashes.len();
    if committed.transactions.len() != expected {
        return Err(mismatch(format!(
            "block lists {expected} transactions, engine supplied {}",
            committed.transactions.len()
        )));
    }
    if committed.receipts.len() != expected {
        return Err(mismatch(format!(
            "block lists {expected} transactions, engine supplied {} receipts",
            committed.receipts.len()
        )));
    }

    let mut seen: HashSet<B256> = HashSet::with_capacity(expected);
    for (index, ((listed, tx), receipt)) in block
        .transaction_hashes
        .iter()
        .zip(&committed.transactions)
        .zip(&committed.receipts)
        .enumerate()
    {
        if *listed != tx.hash {
            return Err(mismatch(format!(
                "transaction {index} is {}, block lists {listed}",
                tx.hash
            )));
        }
        if receipt.transaction_hash != tx.hash {
            return Err(mismatch(format!(
                "receipt {index} belongs to {}, expected {}",
                receipt.transaction_hash, tx.hash
            )));
        }
        if !seen.insert(tx.hash) {
            return Err(mismatch(format!("duplicate transaction {}", tx.hash)));
        }
    }

    Ok(())
}

fn check_receipt(tx: &StoredTransaction, receipt: &StoredReceipt) -> ChainIndexResult<()> {
    let inconsistent = |reason: String| ChainIndexError::InconsistentReceipt {
        tx_hash: tx.hash,
        reason,
    };

    match (tx.is_contract_creation(), receipt.success, receipt.contract_address) {
        (true, true, None) => Err(inconsistent(
            "successful contract creation has no contract address".to_string(),
        )),
        (true, false, Some(addr)) => Err(inconsistent(format!(
            "failed contract creation carries contract address {addr}"
        ))),
        (false, _, Some(addr)) => Err(inconsistent(format!(
            "call transaction carries contract address {addr}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{block_hash, committed, deployment, transfer, tx_hash};
    use alloy_primitives::Address;

    const A: Address = Address::new([0x0a; 20]);
    const B: Address = Address::new([0x0b; 20]);
    const C: Address = Address::new([0x0c; 20]);

    #[test]
    fn test_transfer_yields_sender_and_recipient() {
        let block = committed(5, vec![transfer(tx_hash(5, 0), A, B)]);
        let out = ingest_block(&block).unwrap();

        assert_eq!(out.number(), 5);
        assert_eq!(out.entries.len(), 2);
        assert_eq!((out.entries[0].address, out.entries[0].role), (A, Role::Sender));
        assert_eq!((out.entries[1].address, out.entries[1].role), (B, Role::Recipient));
        assert!(out.entries.iter().all(|e| e.block_number == 5));
    }

    #[test]
    fn test_self_transfer_yields_two_entries() {
        let block = committed(1, vec![transfer(tx_hash(1, 0), A, A)]);
        let out = ingest_block(&block).unwrap();

        let roles: Vec<_> = out.entries.iter().map(|e| (e.address, e.role)).collect();
        assert_eq!(roles, vec![(A, Role::Sender), (A, Role::Recipient)]);
    }

    #[test]
    fn test_successful_deployment_records_contract() {
        let block = committed(3, vec![deployment(tx_hash(3, 0), A, true, Some(C))]);
        let out = ingest_block(&block).unwrap();

        let roles: Vec<_> = out.entries.iter().map(|e| (e.address, e.role)).collect();
        assert_eq!(roles, vec![(A, Role::Sender), (C, Role::Created)]);
    }

    #[test]
    fn test_failed_deployment_records_only_sender() {
        let block = committed(3, vec![deployment(tx_hash(3, 0), A, false, None)]);
        let out = ingest_block(&block).unwrap();

        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.entries[0].role, Role::Sender);
    }

    #[test]
    fn test_inconsistent_receipts_are_rejected() {
        let cases = vec![
            deployment(tx_hash(2, 0), A, true, None),
            deployment(tx_hash(2, 0), A, false, Some(C)),
            {
                let (tx, mut receipt) = transfer(tx_hash(2, 0), A, B);
                receipt.contract_address = Some(C);
                (tx, receipt)
            },
        ];

        for pair in cases {
            let err = ingest_block(&committed(2, vec![pair])).unwrap_err();
            assert!(
                matches!(err, ChainIndexError::InconsistentReceipt { tx_hash: hash, .. } if hash == tx_hash(2, 0)),
                "unexpected error: {err:?}"
            );
        }
    }

    #[test]
    fn test_positions_follow_block_order() {
        let block = committed(
            9,
            vec![
                transfer(tx_hash(9, 0), A, B),
                deployment(tx_hash(9, 1), B, true, Some(C)),
                transfer(tx_hash(9, 2), C, A),
            ],
        );
        let out = ingest_block(&block).unwrap();

        let gas: Vec<_> = out
            .transactions
            .iter()
            .map(|r| (r.transaction_index, r.cumulative_gas_used))
            .collect();
        assert_eq!(gas, vec![(0, 21_000), (1, 141_000), (2, 162_000)]);
        assert!(out.transactions.iter().all(|r| r.block_hash == block.block.hash));

        let positions: Vec<_> = out.entries.iter().map(|e| e.position()).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
        assert_eq!(out.entries.len(), 6);
    }

    #[test]
    fn test_mismatched_receipts_are_rejected() {
        let mut block = committed(4, vec![transfer(tx_hash(4, 0), A, B)]);
        block.receipts.clear();
        assert!(matches!(
            ingest_block(&block),
            Err(ChainIndexError::MismatchedBlock { block: 4, .. })
        ));

        let mut block = committed(4, vec![transfer(tx_hash(4, 0), A, B)]);
        block.receipts[0].transaction_hash = tx_hash(4, 7);
        assert!(matches!(
            ingest_block(&block),
            Err(ChainIndexError::MismatchedBlock { block: 4, .. })
        ));

        let mut block = committed(4, vec![transfer(tx_hash(4, 0), A, B)]);
        block.block.transaction_hashes[0] = tx_hash(4, 9);
        assert!(matches!(
            ingest_block(&block),
            Err(ChainIndexError::MismatchedBlock { block: 4, .. })
        ));
    }

    #[test]
    fn test_duplicate_transactions_are_rejected() {
        let block = committed(
            6,
            vec![transfer(tx_hash(6, 0), A, B), transfer(tx_hash(6, 0), A, B)],
        );
        assert!(matches!(
            ingest_block(&block),
            Err(ChainIndexError::MismatchedBlock { block: 6, .. })
        ));
    }

    #[test]
    fn test_empty_block_yields_no_entries() {
        let out = ingest_block(&committed(0, vec![])).unwrap();
        assert!(out.entries.is_empty());
        assert!(out.transactions.is_empty());
        assert_eq!(out.block.hash, block_hash(0));
    }
}
