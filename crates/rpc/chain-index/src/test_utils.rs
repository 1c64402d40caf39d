//! Block builders shared by unit tests across the crate.

use alloy_primitives::{Address, B256, U256};

use crate::ingest::ingest_block;
use crate::types::{BlockEntries, CommittedBlock, StoredBlock, StoredReceipt, StoredTransaction};

pub fn tx_hash(block: u64, index: u32) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[0..8].copy_from_slice(&block.to_be_bytes());
    bytes[8..12].copy_from_slice(&index.to_be_bytes());
    bytes[31] = 0x01;
    B256::from(bytes)
}

pub fn block_hash(number: u64) -> B256 {
    let mut bytes = [0xbbu8; 32];
    bytes[24..].copy_from_slice(&number.to_be_bytes());
    B256::from(bytes)
}

pub fn transfer(hash: B256, from: Address, to: Address) -> (StoredTransaction, StoredReceipt) {
    (
        StoredTransaction {
            hash,
            from,
            to: Some(to),
            value: U256::from(1),
            nonce: 0,
            payload_len: 0,
        },
        StoredReceipt {
            transaction_hash: hash,
            success: true,
            gas_used: 21_000,
            contract_address: None,
            log_count: 0,
        },
    )
}

pub fn deployment(
    hash: B256,
    from: Address,
    success: bool,
    contract_address: Option<Address>,
) -> (StoredTransaction, StoredReceipt) {
    (
        StoredTransaction {
            hash,
            from,
            to: None,
            value: U256::ZERO,
            nonce: 0,
            payload_len: 512,
        },
        StoredReceipt {
            transaction_hash: hash,
            success,
            gas_used: 120_000,
            contract_address,
            log_count: 0,
        },
    )
}

pub fn committed(number: u64, pairs: Vec<(StoredTransaction, StoredReceipt)>) -> CommittedBlock {
    let (transactions, receipts): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
    CommittedBlock {
        block: StoredBlock {
            number,
            hash: block_hash(number),
            parent_hash: block_hash(number.wrapping_sub(1)),
            timestamp: 1_700_000_000 + number,
            transaction_hashes: transactions.iter().map(|tx| tx.hash).collect(),
        },
        transactions,
        receipts,
    }
}

/// Ingest a block of plain transfers, one transaction per (from, to) pair.
pub fn transfer_entries(number: u64, transfers: &[(Address, Address)]) -> BlockEntries {
    let pairs = transfers
        .iter()
        .enumerate()
        .map(|(i, (from, to))| transfer(tx_hash(number, i as u32), *from, *to))
        .collect();
    ingest_block(&committed(number, pairs)).expect("transfer block should ingest")
}

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}
