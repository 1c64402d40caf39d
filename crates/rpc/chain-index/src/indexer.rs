//! The single ingest lane.
//!
//! `ChainIndexer` is the only writer of the history index and the only
//! publisher to the block notifier. Each committed block runs ingest, append
//! and publish under one lock, in that order, so a block hash never reaches a
//! filter before its history entries are queryable.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ChainIndexError, ChainIndexResult};
use crate::history::AddressHistoryIndex;
use crate::ingest::ingest_block;
use crate::notifier::BlockNotifier;
use crate::types::CommittedBlock;

#[derive(Debug, Clone)]
enum LaneState {
    Running,
    Halted { block: u64, reason: String },
}

/// Drives committed blocks into the index and the notifier.
pub struct ChainIndexer<I: AddressHistoryIndex + ?Sized> {
    index: Arc<I>,
    notifier: Arc<BlockNotifier>,
    lane: Mutex<LaneState>,
}

impl<I: AddressHistoryIndex + ?Sized> ChainIndexer<I> {
    /// Create the lane, seeding a notifier from the index's next block so a
    /// reopened index continues its sequence.
    pub fn new(index: Arc<I>, log_capacity: usize) -> Self {
        let notifier = Arc::new(BlockNotifier::new(
            index.first_block(),
            index.next_block(),
            log_capacity,
        ));
        tracing::info!(
            next_block = index.next_block(),
            oldest_block = index.oldest_retained_block(),
            "indexing lane ready"
        );
        Self {
            index,
            notifier,
            lane: Mutex::new(LaneState::Running),
        }
    }

    pub fn index(&self) -> &Arc<I> {
        &self.index
    }

    pub fn notifier(&self) -> &Arc<BlockNotifier> {
        &self.notifier
    }

    /// Where and why the lane stopped, if it did.
    pub fn halted(&self) -> Option<(u64, String)> {
        match &*self.lane.lock() {
            LaneState::Running => None,
            LaneState::Halted { block, reason } => Some((*block, reason.clone())),
        }
    }

    /// Index one committed block and make it visible to filters.
    ///
    /// A fatal error stops the lane; every later call fails with
    /// `IngestHalted` until the process restarts.
    pub fn on_block_committed(&self, committed: CommittedBlock) -> ChainIndexResult<()> {
        let mut lane = self.lane.lock();
        if let LaneState::Halted { block, reason } = &*lane {
            return Err(ChainIndexError::IngestHalted {
                block: *block,
                reason: reason.clone(),
            });
        }

        let number = committed.block.number;
        let result = ingest_block(&committed).and_then(|entries| {
            let hash = entries.block.hash;
            self.index.append(entries)?;
            self.notifier.publish(number, hash)
        });

        match result {
            Ok(()) => {
                tracing::debug!(block = number, "block indexed");
                Ok(())
            }
            Err(err) => {
                if err.is_fatal() {
                    tracing::error!(block = number, error = %err, "indexing halted");
                    *lane = LaneState::Halted {
                        block: number,
                        reason: err.to_string(),
                    };
                }
                Err(err)
            }
        }
    }
}
