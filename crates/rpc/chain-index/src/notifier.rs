//! Block notifier: the chain head counter and the log of recent block hashes.
//!
//! The notifier is the only source of truth for "current head" seen by the
//! RPC layer. It is published to by the ingest lane after a block has been
//! appended to the history index, so any hash a filter observes is already
//! queryable.
//!
//! Cursors handed out by the notifier are "next block to deliver" values:
//! a cursor of `n` means blocks `< n` have been seen.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::B256;
use parking_lot::RwLock;

use crate::error::{ChainIndexError, ChainIndexResult};
use crate::history::check_sequence;

/// Hashes kept when no retention window is configured.
pub const DEFAULT_LOG_CAPACITY: usize = 65_536;

struct HashLog {
    /// Block number of `hashes[0]`.
    start: u64,
    hashes: VecDeque<B256>,
}

/// Append-only, bounded log of committed block hashes plus the head counter.
pub struct BlockNotifier {
    first_block: u64,
    capacity: usize,
    next: AtomicU64,
    log: RwLock<HashLog>,
}

impl BlockNotifier {
    /// Create a notifier whose next published block is `next_block`.
    ///
    /// Blocks before `next_block` are considered committed but their hashes
    /// are not known; cursors pointing at them are reported as expired.
    pub fn new(first_block: u64, next_block: u64, capacity: usize) -> Self {
        Self {
            first_block,
            capacity: capacity.max(1),
            next: AtomicU64::new(next_block),
            log: RwLock::new(HashLog {
                start: next_block,
                hashes: VecDeque::new(),
            }),
        }
    }

    /// Append a committed block's hash and advance the head.
    pub fn publish(&self, number: u64, hash: B256) -> ChainIndexResult<()> {
        let mut log = self.log.write();
        check_sequence(self.next.load(Ordering::Acquire), number)?;

        log.hashes.push_back(hash);
        while log.hashes.len() > self.capacity {
            log.hashes.pop_front();
            log.start += 1;
        }
        // Readers load `next` before taking the read lock, so the hash must
        // be in the log before the head moves.
        self.next.store(number + 1, Ordering::Release);
        Ok(())
    }

    /// The current chain head, or `None` before the first block.
    pub fn head(&self) -> Option<u64> {
        let next = self.next.load(Ordering::Acquire);
        (next > self.first_block).then(|| next - 1)
    }

    /// Cursor value that delivers only blocks published from now on.
    pub fn cursor(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }

    /// Oldest block whose hash is still in the log.
    pub fn oldest_logged(&self) -> u64 {
        self.log.read().start
    }

    /// Hashes of blocks `from..head` and the cursor to resume from.
    ///
    /// The upper bound is the head as observed at the start of the call.
    pub fn blocks_since(&self, from: u64) -> ChainIndexResult<(Vec<B256>, u64)> {
        let target = self.next.load(Ordering::Acquire);
        if from >= target {
            return Ok((Vec::new(), from));
        }

        let log = self.log.read();
        if from < log.start {
            return Err(ChainIndexError::RetentionExpired {
                requested: from,
                oldest_available: log.start,
            });
        }

        let skip = (from - log.start) as usize;
        let take = (target - from) as usize;
        let hashes: Vec<B256> = log.hashes.iter().skip(skip).take(take).copied().collect();
        Ok((hashes, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::block_hash;

    fn notifier_with(blocks: std::ops::Range<u64>, capacity: usize) -> BlockNotifier {
        let notifier = BlockNotifier::new(blocks.start, blocks.start, capacity);
        for n in blocks {
            notifier.publish(n, block_hash(n)).unwrap();
        }
        notifier
    }

    #[test]
    fn test_head_on_empty_chain() {
        let notifier = BlockNotifier::new(0, 0, 16);
        assert_eq!(notifier.head(), None);
        assert_eq!(notifier.cursor(), 0);
        assert_eq!(notifier.blocks_since(0).unwrap(), (vec![], 0));
    }

    #[test]
    fn test_publish_advances_head() {
        let notifier = notifier_with(0..3, 16);
        assert_eq!(notifier.head(), Some(2));

        let (hashes, cursor) = notifier.blocks_since(1).unwrap();
        assert_eq!(hashes, vec![block_hash(1), block_hash(2)]);
        assert_eq!(cursor, 3);
        assert_eq!(notifier.blocks_since(cursor).unwrap(), (vec![], 3));
    }

    #[test]
    fn test_publish_rejects_gaps_and_replays() {
        let notifier = notifier_with(0..2, 16);
        assert!(matches!(
            notifier.publish(3, block_hash(3)),
            Err(ChainIndexError::OrderingViolation {
                expected: 2,
                got: 3
            })
        ));
        assert!(matches!(
            notifier.publish(1, block_hash(1)),
            Err(ChainIndexError::OrderingViolation { .. })
        ));
        assert_eq!(notifier.head(), Some(1));
    }

    #[test]
    fn test_log_is_bounded() {
        let notifier = notifier_with(0..10, 4);
        assert_eq!(notifier.oldest_logged(), 6);

        let (hashes, _) = notifier.blocks_since(6).unwrap();
        assert_eq!(hashes.len(), 4);
        assert!(matches!(
            notifier.blocks_since(5),
            Err(ChainIndexError::RetentionExpired {
                requested: 5,
                oldest_available: 6
            })
        ));
    }

    #[test]
    fn test_seeded_notifier_continues_sequence() {
        let notifier = BlockNotifier::new(0, 42, 16);
        assert_eq!(notifier.head(), Some(41));
        assert!(notifier.publish(41, block_hash(41)).is_err());

        let cursor = notifier.cursor();
        notifier.publish(42, block_hash(42)).unwrap();
        assert_eq!(
            notifier.blocks_since(cursor).unwrap(),
            (vec![block_hash(42)], 43)
        );
        assert!(notifier.blocks_since(10).is_err());
    }
}
