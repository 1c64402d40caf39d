//! Address history index trait and in-memory implementation.
//!
//! The `AddressHistoryIndex` trait is the contract both backends honour:
//!
//! - `append` takes one block's entries at a time, strictly in sequence, and
//!   makes them visible all at once.
//! - `query` is read-only and returns entries in (block, transaction index,
//!   role) order, starting strictly after an optional cursor.
//! - Entries older than the retention window are pruned on append. A cursor
//!   that points below the window is reported as `RetentionExpired` rather
//!   than silently answered with an empty page.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy_primitives::{Address, B256};
use parking_lot::{Mutex, RwLock};

use crate::error::{ChainIndexError, ChainIndexResult};
use crate::types::{
    AddressHistoryEntry, BlockEntries, HistoryPosition, Role, StoredBlock, TransactionRecord,
};

/// Where the index starts and how much of it is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSettings {
    /// Sequence number of the first block the index accepts.
    pub first_block: u64,
    /// Number of most recent blocks kept queryable. `None` keeps everything.
    pub retention_blocks: Option<u64>,
}

impl IndexSettings {
    pub fn archive(first_block: u64) -> Self {
        Self {
            first_block,
            retention_blocks: None,
        }
    }

    pub fn with_retention(mut self, blocks: u64) -> Self {
        self.retention_blocks = Some(blocks);
        self
    }

    /// Oldest block still retained once every block below `next_block` is indexed.
    pub fn oldest_retained(&self, next_block: u64) -> u64 {
        match self.retention_blocks {
            Some(keep) => next_block.saturating_sub(keep.max(1)).max(self.first_block),
            None => self.first_block,
        }
    }
}

/// Durable mapping from address to its ordered transaction history.
///
/// All methods are synchronous; callers on an async runtime wrap writes in
/// `spawn_blocking`.
pub trait AddressHistoryIndex: Send + Sync {
    /// Append one block's entries. The block must be exactly `next_block()`.
    fn append(&self, entries: BlockEntries) -> ChainIndexResult<()>;

    /// Entries for `address` strictly after `cursor`, at most `limit` of them.
    ///
    /// `limit: None` returns everything retained. An address with no history
    /// yields an empty vector.
    fn query(
        &self,
        address: Address,
        cursor: Option<HistoryPosition>,
        limit: Option<usize>,
    ) -> ChainIndexResult<Vec<AddressHistoryEntry>>;

    /// Sequence number the next appended block must carry.
    fn next_block(&self) -> u64;

    /// Sequence number of the first block this index accepted.
    fn first_block(&self) -> u64;

    /// Oldest block still queryable.
    fn oldest_retained_block(&self) -> u64;

    /// Get a retained block by number.
    fn get_block(&self, number: u64) -> ChainIndexResult<Option<StoredBlock>>;

    /// Transactions of a retained block with their receipts, in block order.
    ///
    /// Empty for a block outside the retention window.
    fn get_block_transactions(&self, number: u64) -> ChainIndexResult<Vec<TransactionRecord>>;

    /// A retained transaction and its receipt, by transaction hash.
    fn get_transaction(&self, hash: B256) -> ChainIndexResult<Option<TransactionRecord>>;

    /// The earliest retained `Created` entry for a contract address.
    ///
    /// An address deployed more than once (for example after a
    /// self-destruct) resolves to its oldest deployment still inside the
    /// retention window.
    fn find_deployment(&self, contract: Address) -> ChainIndexResult<Option<AddressHistoryEntry>>;

    /// Get the latest indexed block number.
    fn latest_block_number(&self) -> Option<u64> {
        let next = self.next_block();
        (next > self.first_block()).then(|| next - 1)
    }
}

pub(crate) fn check_cursor(cursor: Option<HistoryPosition>, oldest: u64) -> ChainIndexResult<()> {
    match cursor {
        Some(cursor) if cursor.block_number < oldest => Err(ChainIndexError::RetentionExpired {
            requested: cursor.block_number,
            oldest_available: oldest,
        }),
        _ => Ok(()),
    }
}

pub(crate) fn check_sequence(expected: u64, got: u64) -> ChainIndexResult<()> {
    if expected == got {
        Ok(())
    } else {
        Err(ChainIndexError::OrderingViolation { expected, got })
    }
}

type HistoryLog = Arc<RwLock<VecDeque<AddressHistoryEntry>>>;

struct RetainedBlock {
    block: StoredBlock,
    /// Addresses with at least one entry in this block, used for pruning.
    touched: Vec<Address>,
}

/// In-memory address history index.
///
/// Each address owns its own log behind its own lock, so readers of different
/// addresses never contend and a reader only briefly contends with the writer
/// on the address it is reading. A block becomes visible when the `next_block`
/// watermark moves past it; entries above the watermark are skipped by readers.
pub struct InMemoryHistoryIndex {
    settings: IndexSettings,
    /// Single-writer lane for `append`.
    writer: Mutex<()>,
    next_block: AtomicU64,
    oldest_block: AtomicU64,
    blocks: RwLock<VecDeque<RetainedBlock>>,
    histories: RwLock<HashMap<Address, HistoryLog>>,
    /// `Created` entries per contract address, oldest first.
    deployments: RwLock<HashMap<Address, VecDeque<AddressHistoryEntry>>>,
    transactions: RwLock<HashMap<B256, TransactionRecord>>,
}

impl InMemoryHistoryIndex {
    pub fn new(settings: IndexSettings) -> Self {
        tracing::info!(
            first_block = settings.first_block,
            retention = ?settings.retention_blocks,
            "In-memory history index initialized"
        );
        Self {
            settings,
            writer: Mutex::new(()),
            next_block: AtomicU64::new(settings.first_block),
            oldest_block: AtomicU64::new(settings.first_block),
            blocks: RwLock::new(VecDeque::new()),
            histories: RwLock::new(HashMap::new()),
            deployments: RwLock::new(HashMap::new()),
            transactions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of addresses with retained history.
    pub fn address_count(&self) -> usize {
        self.histories.read().len()
    }

    fn log_for(&self, address: Address) -> HistoryLog {
        if let Some(log) = self.histories.read().get(&address) {
            return Arc::clone(log);
        }
        Arc::clone(self.histories.write().entry(address).or_default())
    }

    fn prune(&self, next_block: u64) {
        let oldest = self.settings.oldest_retained(next_block);
        if oldest <= self.oldest_block.load(Ordering::Acquire) {
            return;
        }
        // Readers filter on the watermark first, so entries below it are
        // already invisible before they are physically removed.
        self.oldest_block.store(oldest, Ordering::Release);

        let mut expired: HashSet<Address> = HashSet::new();
        let mut expired_txs: Vec<B256> = Vec::new();
        let mut dropped = 0usize;
        {
            let mut blocks = self.blocks.write();
            while blocks.front().is_some_and(|b| b.block.number < oldest) {
                if let Some(retained) = blocks.pop_front() {
                    expired.extend(retained.touched);
                    expired_txs.extend(retained.block.transaction_hashes);
                    dropped += 1;
                }
            }
        }

        {
            let mut transactions = self.transactions.write();
            for hash in &expired_txs {
                // A later block may have reused the hash.
                if transactions
                    .get(hash)
                    .is_some_and(|r| r.block_number < oldest)
                {
                    transactions.remove(hash);
                }
            }
        }

        for address in &expired {
            let log = self.histories.read().get(address).cloned();
            if let Some(log) = log {
                let now_empty = {
                    let mut log = log.write();
                    while log.front().is_some_and(|e| e.block_number < oldest) {
                        log.pop_front();
                    }
                    log.is_empty()
                };
                if now_empty {
                    self.histories.write().remove(address);
                }
            }

            let mut deployments = self.deployments.write();
            if let Some(created) = deployments.get_mut(address) {
                while created.front().is_some_and(|e| e.block_number < oldest) {
                    created.pop_front();
                }
                if created.is_empty() {
                    deployments.remove(address);
                }
            }
        }

        tracing::debug!(oldest, dropped, addresses = expired.len(), "pruned history");
    }
}

impl AddressHistoryIndex for InMemoryHistoryIndex {
    fn append(&self, data: BlockEntries) -> ChainIndexResult<()> {
        let _lane = self.writer.lock();
        let number = data.number();
        check_sequence(self.next_block.load(Ordering::Acquire), number)?;

        let mut touched = Vec::new();
        let mut seen = HashSet::new();
        for entry in data.entries {
            if seen.insert(entry.address) {
                touched.push(entry.address);
            }
            if entry.role == Role::Created {
                self.deployments
                    .write()
                    .entry(entry.address)
                    .or_default()
                    .push_back(entry.clone());
            }
            self.log_for(entry.address).write().push_back(entry);
        }

        {
            let mut transactions = self.transactions.write();
            for record in data.transactions {
                transactions.insert(record.hash(), record);
            }
        }

        self.blocks.write().push_back(RetainedBlock {
            block: data.block,
            touched,
        });
        self.next_block.store(number + 1, Ordering::Release);
        self.prune(number + 1);

        tracing::debug!(block = number, "appended block to history index");
        Ok(())
    }

    fn query(
        &self,
        address: Address,
        cursor: Option<HistoryPosition>,
        limit: Option<usize>,
    ) -> ChainIndexResult<Vec<AddressHistoryEntry>> {
        let next = self.next_block.load(Ordering::Acquire);
        let oldest = self.oldest_block.load(Ordering::Acquire);
        check_cursor(cursor, oldest)?;

        let Some(log) = self.histories.read().get(&address).cloned() else {
            return Ok(Vec::new());
        };
        let log = log.read();

        let after_cursor = cursor.map_or(0, |c| log.partition_point(|e| e.position() <= c));
        let in_window = log.partition_point(|e| e.block_number < oldest);
        let start = after_cursor.max(in_window);

        Ok(log
            .range(start..)
            .take_while(|e| e.block_number < next)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn next_block(&self) -> u64 {
        self.next_block.load(Ordering::Acquire)
    }

    fn first_block(&self) -> u64 {
        self.settings.first_block
    }

    fn oldest_retained_block(&self) -> u64 {
        self.oldest_block.load(Ordering::Acquire)
    }

    fn get_block(&self, number: u64) -> ChainIndexResult<Option<StoredBlock>> {
        let next = self.next_block.load(Ordering::Acquire);
        if number >= next || number < self.oldest_block.load(Ordering::Acquire) {
            return Ok(None);
        }

        let blocks = self.blocks.read();
        let Some(front) = blocks.front() else {
            return Ok(None);
        };
        let offset = number.checked_sub(front.block.number);
        Ok(offset
            .and_then(|o| usize::try_from(o).ok())
            .and_then(|o| blocks.get(o))
            .map(|b| b.block.clone()))
    }

    fn get_block_transactions(&self, number: u64) -> ChainIndexResult<Vec<TransactionRecord>> {
        let Some(block) = self.get_block(number)? else {
            return Ok(Vec::new());
        };
        let transactions = self.transactions.read();
        Ok(block
            .transaction_hashes
            .iter()
            .filter_map(|hash| transactions.get(hash))
            .filter(|r| r.block_number == number)
            .cloned()
            .collect())
    }

    fn get_transaction(&self, hash: B256) -> ChainIndexResult<Option<TransactionRecord>> {
        let next = self.next_block.load(Ordering::Acquire);
        let oldest = self.oldest_block.load(Ordering::Acquire);
        Ok(self
            .transactions
            .read()
            .get(&hash)
            .filter(|r| r.block_number >= oldest && r.block_number < next)
            .cloned())
    }

    fn find_deployment(&self, contract: Address) -> ChainIndexResult<Option<AddressHistoryEntry>> {
        let next = self.next_block.load(Ordering::Acquire);
        let oldest = self.oldest_block.load(Ordering::Acquire);
        Ok(self
            .deployments
            .read()
            .get(&contract)
            .and_then(|created| {
                created
                    .iter()
                    .find(|e| e.block_number >= oldest && e.block_number < next)
            })
            .cloned())
    }
}

/// Lazy, page-fetching iterator over one address's history.
///
/// Each page is a separate `query`, so the iterator never holds a lock across
/// calls to `next`. If a page fails (for example because the cursor fell out of
/// the retention window) the error is yielded once and iteration stops; the
/// caller can resume from [`HistoryIter::cursor`].
pub struct HistoryIter<'a, I: AddressHistoryIndex + ?Sized> {
    index: &'a I,
    address: Address,
    cursor: Option<HistoryPosition>,
    page_size: usize,
    page: VecDeque<AddressHistoryEntry>,
    exhausted: bool,
}

impl<'a, I: AddressHistoryIndex + ?Sized> HistoryIter<'a, I> {
    pub fn new(index: &'a I, address: Address, page_size: usize) -> Self {
        Self {
            index,
            address,
            cursor: None,
            page_size: page_size.max(1),
            page: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Start strictly after `cursor` instead of at the oldest retained entry.
    pub fn starting_after(mut self, cursor: HistoryPosition) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Position of the last entry fetched from the index.
    pub fn cursor(&self) -> Option<HistoryPosition> {
        self.cursor
    }

    fn fetch_page(&mut self) -> ChainIndexResult<()> {
        let page = self
            .index
            .query(self.address, self.cursor, Some(self.page_size))?;
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.cursor = Some(last.position());
        }
        self.page = page.into();
        Ok(())
    }
}

impl<I: AddressHistoryIndex + ?Sized> Iterator for HistoryIter<'_, I> {
    type Item = ChainIndexResult<AddressHistoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() && !self.exhausted {
            if let Err(err) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        self.page.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ingest_block;
    use crate::test_utils::{addr, committed, deployment, transfer_entries, tx_hash};

    #[test]
    fn test_transfer_visible_to_both_parties() {
        let index = InMemoryHistoryIndex::new(IndexSettings::archive(5));
        let (a, b) = (addr(0x0a), addr(0x0b));

        index.append(transfer_entries(5, &[(a, b)])).unwrap();

        let history_a = index.query(a, None, None).unwrap();
        assert_eq!(history_a.len(), 1);
        assert_eq!(history_a[0].role, Role::Sender);
        assert_eq!(history_a[0].block_number, 5);

        let history_b = index.query(b, None, None).unwrap();
        assert_eq!(history_b.len(), 1);
        assert_eq!(history_b[0].role, Role::Recipient);
        assert_eq!(history_b[0].block_number, 5);
    }

    #[test]
    fn test_unknown_address_has_empty_history() {
        let index = InMemoryHistoryIndex::new(IndexSettings::default());
        index
            .append(transfer_entries(0, &[(addr(1), addr(2))]))
            .unwrap();
        assert!(index.query(addr(3), None, None).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_order_append_is_rejected() {
        let index = InMemoryHistoryIndex::new(IndexSettings::default());
        index
            .append(transfer_entries(0, &[(addr(1), addr(2))]))
            .unwrap();

        let err = index
            .append(transfer_entries(2, &[(addr(1), addr(2))]))
            .unwrap_err();
        assert!(matches!(
            err,
            ChainIndexError::OrderingViolation {
                expected: 1,
                got: 2
            }
        ));

        // Replaying a block is just as wrong as skipping one.
        let err = index
            .append(transfer_entries(0, &[(addr(1), addr(2))]))
            .unwrap_err();
        assert!(matches!(err, ChainIndexError::OrderingViolation { .. }));
        assert_eq!(index.next_block(), 1);
        assert_eq!(index.query(addr(1), None, None).unwrap().len(), 1);
    }

    #[test]
    fn test_cursor_and_limit_paginate() {
        let index = InMemoryHistoryIndex::new(IndexSettings::default());
        let (a, b) = (addr(0x0a), addr(0x0b));
        for n in 0..5 {
            index.append(transfer_entries(n, &[(a, b), (b, a)])).unwrap();
        }

        let all = index.query(a, None, None).unwrap();
        assert_eq!(all.len(), 10);

        let first = index.query(a, None, Some(3)).unwrap();
        assert_eq!(first, all[..3]);

        let second = index
            .query(a, Some(first[2].position()), Some(3))
            .unwrap();
        assert_eq!(second, all[3..6]);

        let rest = index.query(a, Some(second[2].position()), None).unwrap();
        assert_eq!(rest, all[6..]);

        assert!(index.query(a, None, Some(0)).unwrap().is_empty());
    }

    #[test]
    fn test_query_is_idempotent() {
        let index = InMemoryHistoryIndex::new(IndexSettings::default());
        let (a, b) = (addr(0x0a), addr(0x0b));
        for n in 0..3 {
            index.append(transfer_entries(n, &[(a, b)])).unwrap();
        }

        let cursor = Some(index.query(a, None, Some(1)).unwrap()[0].position());
        let once = index.query(a, cursor, Some(10)).unwrap();
        let twice = index.query(a, cursor, Some(10)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_retention_prunes_and_reports_expired_cursor() {
        let index = InMemoryHistoryIndex::new(IndexSettings::archive(0).with_retention(3));
        let (a, b) = (addr(0x0a), addr(0x0b));
        for n in 0..3 {
            index.append(transfer_entries(n, &[(a, b)])).unwrap();
        }
        let early_cursor = index.query(a, None, Some(1)).unwrap()[0].position();
        assert_eq!(index.oldest_retained_block(), 0);

        for n in 3..6 {
            index.append(transfer_entries(n, &[(a, b)])).unwrap();
        }

        assert_eq!(index.oldest_retained_block(), 3);
        let history = index.query(a, None, None).unwrap();
        let blocks: Vec<_> = history.iter().map(|e| e.block_number).collect();
        assert_eq!(blocks, vec![3, 4, 5]);

        let err = index.query(a, Some(early_cursor), None).unwrap_err();
        assert!(matches!(
            err,
            ChainIndexError::RetentionExpired {
                requested: 0,
                oldest_available: 3
            }
        ));

        assert!(index.get_block(2).unwrap().is_none());
        assert_eq!(index.get_block(3).unwrap().unwrap().number, 3);
    }

    #[test]
    fn test_pruning_drops_idle_addresses() {
        let index = InMemoryHistoryIndex::new(IndexSettings::archive(0).with_retention(1));
        index
            .append(transfer_entries(0, &[(addr(1), addr(2))]))
            .unwrap();
        index
            .append(transfer_entries(1, &[(addr(3), addr(4))]))
            .unwrap();

        assert_eq!(index.address_count(), 2);
        assert!(index.query(addr(1), None, None).unwrap().is_empty());
        assert_eq!(index.query(addr(3), None, None).unwrap().len(), 1);
    }

    #[test]
    fn test_find_deployment() {
        let index = InMemoryHistoryIndex::new(IndexSettings::default());
        let (deployer, contract) = (addr(0x0d), addr(0xcc));

        let block = committed(0, vec![deployment(tx_hash(0, 0), deployer, true, Some(contract))]);
        index.append(ingest_block(&block).unwrap()).unwrap();

        let found = index.find_deployment(contract).unwrap().unwrap();
        assert_eq!(found.transaction_hash, tx_hash(0, 0));
        assert_eq!(found.role, Role::Created);

        let history = index.query(contract, None, None).unwrap();
        assert_eq!(history, vec![found]);
        assert!(index.find_deployment(deployer).unwrap().is_none());
    }

    #[test]
    fn test_repeated_deployment_resolves_to_earliest_retained() {
        let index = InMemoryHistoryIndex::new(IndexSettings::archive(0).with_retention(3));
        let (deployer, contract) = (addr(0x0d), addr(0xcc));
        for n in 0..2 {
            let block = committed(n, vec![deployment(tx_hash(n, 0), deployer, true, Some(contract))]);
            index.append(ingest_block(&block).unwrap()).unwrap();
        }

        let found = index.find_deployment(contract).unwrap().unwrap();
        assert_eq!(found.block_number, 0);
        assert_eq!(found.transaction_hash, tx_hash(0, 0));

        // Once block 0 ages out, the redeployment in block 1 takes over.
        for n in 2..4 {
            index.append(transfer_entries(n, &[])).unwrap();
        }
        assert_eq!(index.oldest_retained_block(), 1);
        let found = index.find_deployment(contract).unwrap().unwrap();
        assert_eq!(found.block_number, 1);
        assert_eq!(found.transaction_hash, tx_hash(1, 0));

        index.append(transfer_entries(4, &[])).unwrap();
        assert!(index.find_deployment(contract).unwrap().is_none());
    }

    #[test]
    fn test_failed_deployment_leaves_no_contract_history() {
        let index = InMemoryHistoryIndex::new(IndexSettings::default());
        let (deployer, would_be) = (addr(0x0d), addr(0xcc));

        let block = committed(0, vec![deployment(tx_hash(0, 0), deployer, false, None)]);
        index.append(ingest_block(&block).unwrap()).unwrap();

        assert!(index.query(would_be, None, None).unwrap().is_empty());
        assert!(index.find_deployment(would_be).unwrap().is_none());
        assert_eq!(index.query(deployer, None, None).unwrap().len(), 1);
    }

    #[test]
    fn test_transactions_are_retrievable_until_pruned() {
        let index = InMemoryHistoryIndex::new(IndexSettings::archive(0).with_retention(2));
        let (a, b) = (addr(0x0a), addr(0x0b));
        index
            .append(transfer_entries(0, &[(a, b), (b, a)]))
            .unwrap();

        let record = index.get_transaction(tx_hash(0, 1)).unwrap().unwrap();
        assert_eq!(record.block_number, 0);
        assert_eq!(record.transaction_index, 1);
        assert_eq!(record.transaction.from, b);
        assert_eq!(record.cumulative_gas_used, 42_000);
        assert!(index.get_transaction(tx_hash(0, 2)).unwrap().is_none());

        let in_block: Vec<_> = index
            .get_block_transactions(0)
            .unwrap()
            .iter()
            .map(|r| r.hash())
            .collect();
        assert_eq!(in_block, vec![tx_hash(0, 0), tx_hash(0, 1)]);

        for n in 1..3 {
            index.append(transfer_entries(n, &[(a, b)])).unwrap();
        }
        assert!(index.get_transaction(tx_hash(0, 0)).unwrap().is_none());
        assert!(index.get_block_transactions(0).unwrap().is_empty());
        assert!(index.get_transaction(tx_hash(2, 0)).unwrap().is_some());
    }

    #[test]
    fn test_latest_block_number_tracks_appends() {
        let index = InMemoryHistoryIndex::new(IndexSettings::archive(10));
        assert_eq!(index.latest_block_number(), None);
        assert_eq!(index.next_block(), 10);

        index.append(transfer_entries(10, &[])).unwrap();
        assert_eq!(index.latest_block_number(), Some(10));
        assert_eq!(index.get_block(10).unwrap().unwrap().number, 10);
        assert!(index.get_block(11).unwrap().is_none());
    }

    #[test]
    fn test_history_iter_pages_lazily() {
        let index = InMemoryHistoryIndex::new(IndexSettings::default());
        let (a, b) = (addr(0x0a), addr(0x0b));
        for n in 0..7 {
            index.append(transfer_entries(n, &[(a, b)])).unwrap();
        }

        let expected = index.query(a, None, None).unwrap();
        let collected: Vec<_> = HistoryIter::new(&index, a, 2)
            .collect::<ChainIndexResult<_>>()
            .unwrap();
        assert_eq!(collected, expected);

        let resumed: Vec<_> = HistoryIter::new(&index, a, 3)
            .starting_after(expected[4].position())
            .collect::<ChainIndexResult<_>>()
            .unwrap();
        assert_eq!(resumed, expected[5..]);
    }

    #[test]
    fn test_history_iter_over_trait_object() {
        let index: Arc<dyn AddressHistoryIndex> =
            Arc::new(InMemoryHistoryIndex::new(IndexSettings::default()));
        index
            .append(transfer_entries(0, &[(addr(1), addr(2))]))
            .unwrap();

        let mut iter = HistoryIter::new(index.as_ref(), addr(2), 10);
        assert_eq!(iter.next().unwrap().unwrap().role, Role::Recipient);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_history_iter_surfaces_retention_error() {
        let index = InMemoryHistoryIndex::new(IndexSettings::archive(0).with_retention(2));
        let (a, b) = (addr(0x0a), addr(0x0b));
        index.append(transfer_entries(0, &[(a, b)])).unwrap();
        let stale = index.query(a, None, None).unwrap()[0].position();
        for n in 1..4 {
            index.append(transfer_entries(n, &[(a, b)])).unwrap();
        }

        let mut iter = HistoryIter::new(&index, a, 2).starting_after(stale);
        assert!(matches!(
            iter.next(),
            Some(Err(ChainIndexError::RetentionExpired { .. }))
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_readers_never_observe_partial_blocks() {
        const TRANSFERS_PER_BLOCK: usize = 4;
        const BLOCKS: u64 = 200;

        let index = Arc::new(InMemoryHistoryIndex::new(IndexSettings::default()));
        let target = addr(0xee);

        let writer = {
            let index = Arc::clone(&index);
            std::thread::spawn(move || {
                for n in 0..BLOCKS {
                    let transfers: Vec<_> = (0..TRANSFERS_PER_BLOCK)
                        .map(|i| (addr(i as u8 + 1), target))
                        .collect();
                    index.append(transfer_entries(n, &transfers)).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    let mut last_seen = 0;
                    while index.next_block() < BLOCKS {
                        let seen = index.query(target, None, None).unwrap().len();
                        assert_eq!(seen % TRANSFERS_PER_BLOCK, 0, "partial block observed");
                        assert!(seen >= last_seen, "history shrank");
                        last_seen = seen;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(
            index.query(target, None, None).unwrap().len(),
            BLOCKS as usize * TRANSFERS_PER_BLOCK
        );
    }
}
