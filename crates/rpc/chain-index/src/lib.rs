//! Chain data indexing and block filters for RPC queries.
//!
//! This crate records, for every address, every transaction it sent, received
//! or deployed a contract with, and lets many independent clients poll for
//! blocks committed since their last poll.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    RPC Server                        │
//! │              (kortana_eth_jsonrpc)                   │
//! └───────────────────────┬─────────────────────────────┘
//!                         │
//!           ┌─────────────▼─────────────┐
//!           │      StateProvider        │
//!           │   (ChainStateProvider)    │
//!           └─────────────┬─────────────┘
//!                         │
//!         ┌───────────────┼───────────────┐
//!         │               │               │
//!         ▼               ▼               ▼
//! ┌───────────────┐ ┌───────────┐ ┌───────────────┐
//! │ History index │ │  Notifier │ │    Filters    │
//! └───────▲───────┘ └─────▲─────┘ └───────────────┘
//!         │               │
//!         └───────┬───────┘
//!                 │
//!          ┌──────┴──────┐
//!          │ ChainIndexer│ ◄── committed blocks
//!          └─────────────┘
//! ```
//!
//! Blocks enter through [`ChainIndexer::on_block_committed`], which ingests,
//! appends to the history index and only then publishes the block hash.

pub mod error;
pub mod filters;
pub mod history;
pub mod index;
pub mod indexer;
pub mod ingest;
pub mod integration;
pub mod notifier;
pub mod provider;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use error::{ChainIndexError, ChainIndexResult};
pub use filters::{spawn_filter_sweeper, FilterKind, FilterRegistry};
pub use history::{AddressHistoryIndex, HistoryIter, InMemoryHistoryIndex, IndexSettings};
pub use index::PersistentHistoryIndex;
pub use indexer::ChainIndexer;
pub use ingest::ingest_block;
pub use integration::{build_index_data, index_block};
pub use notifier::{BlockNotifier, DEFAULT_LOG_CAPACITY};
pub use provider::ChainStateProvider;
pub use types::*;
