//! Filter registry for polling clients.
//!
//! A filter is a server-side cursor into the block notifier's hash log. Each
//! filter sits behind its own mutex so polls on different filters never
//! contend; the map lock is only held long enough to look up or insert a slot.
//!
//! Filters are ephemeral and do not survive a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::B256;
use kortana_rpc_types::FilterId;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{ChainIndexError, ChainIndexResult};
use crate::notifier::BlockNotifier;

/// What a filter reports on each poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Hashes of newly committed blocks.
    NewBlocks,
}

#[derive(Debug)]
struct FilterState {
    kind: FilterKind,
    /// Notifier cursor at creation time.
    created_at: u64,
    /// Next block to deliver.
    cursor: u64,
    last_access: Instant,
    destroyed: bool,
}

type FilterSlot = Arc<Mutex<FilterState>>;

/// Registry of live filters.
pub struct FilterRegistry {
    notifier: Arc<BlockNotifier>,
    filters: RwLock<HashMap<FilterId, FilterSlot>>,
    idle_timeout: Duration,
    salt: u64,
    counter: AtomicU64,
}

impl FilterRegistry {
    pub fn new(notifier: Arc<BlockNotifier>, idle_timeout: Duration) -> Self {
        Self {
            notifier,
            filters: RwLock::new(HashMap::new()),
            idle_timeout,
            salt: rand::random(),
            counter: AtomicU64::new(0),
        }
    }

    /// Install a filter positioned at the current head.
    pub fn create(&self, kind: FilterKind) -> FilterId {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let id = FilterId::new(format!("0x{:016x}{:016x}", self.salt, seq));
        let cursor = self.notifier.cursor();

        let state = FilterState {
            kind,
            created_at: cursor,
            cursor,
            last_access: Instant::now(),
            destroyed: false,
        };
        self.filters
            .write()
            .insert(id.clone(), Arc::new(Mutex::new(state)));

        tracing::debug!(filter = %id, ?kind, cursor, "installed filter");
        id
    }

    /// Return everything committed since the last poll and advance the cursor.
    pub fn poll(&self, id: &FilterId) -> ChainIndexResult<Vec<B256>> {
        let slot = self.slot(id)?;
        let mut state = slot.lock();
        if state.destroyed {
            return Err(ChainIndexError::FilterNotFound(id.clone()));
        }

        match state.kind {
            FilterKind::NewBlocks => {
                let (hashes, cursor) = self.notifier.blocks_since(state.cursor).map_err(|e| {
                    tracing::warn!(filter = %id, cursor = state.cursor, "filter cursor expired");
                    e
                })?;
                state.cursor = cursor;
                state.last_access = Instant::now();
                Ok(hashes)
            }
        }
    }

    /// Remove a filter. Unknown or already removed IDs are reported.
    pub fn destroy(&self, id: &FilterId) -> ChainIndexResult<()> {
        let slot = self
            .filters
            .write()
            .remove(id)
            .ok_or_else(|| ChainIndexError::FilterNotFound(id.clone()))?;

        // Waits for an in-flight poll on this filter to finish.
        let mut state = slot.lock();
        state.destroyed = true;
        tracing::debug!(
            filter = %id,
            polled_blocks = state.cursor - state.created_at,
            "uninstalled filter"
        );
        Ok(())
    }

    /// Destroy every filter idle for longer than the timeout as of `now`.
    ///
    /// Filters with a poll in flight are skipped and reconsidered on the next
    /// sweep.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut filters = self.filters.write();
        let before = filters.len();

        filters.retain(|id, slot| {
            let Some(mut state) = slot.try_lock() else {
                return true;
            };
            if now.saturating_duration_since(state.last_access) <= self.idle_timeout {
                return true;
            }
            state.destroyed = true;
            tracing::debug!(filter = %id, "evicting idle filter");
            false
        });

        let evicted = before - filters.len();
        if evicted > 0 {
            tracing::warn!(evicted, remaining = filters.len(), "evicted idle filters");
        }
        evicted
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Number of live filters.
    pub fn len(&self) -> usize {
        self.filters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: &FilterId) -> ChainIndexResult<FilterSlot> {
        self.filters
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ChainIndexError::FilterNotFound(id.clone()))
    }
}

/// Run `evict_idle` every `interval` until `shutdown` flips to `true`.
pub fn spawn_filter_sweeper(
    registry: Arc<FilterRegistry>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // First tick is immediate

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    registry.evict_idle(Instant::now());
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("filter sweeper stopped");
    })
}
