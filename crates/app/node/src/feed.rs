//! Engine feed: committed blocks as JSON lines.
//!
//! Each non-blank line is one [`EngineBlock`]. Blocks are handed to the
//! indexing lane in order; a line that does not decode stops the feed, since
//! skipping it would leave a gap in the sequence.

use std::sync::Arc;

use kortana_chain_index::{build_index_data, AddressHistoryIndex, ChainIndexer};
use kortana_rpc_types::EngineBlock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::errors::NodeError;

/// Read blocks from `reader` until EOF and index each one.
///
/// Returns the number of blocks indexed.
pub async fn feed_blocks<R, I>(reader: R, indexer: Arc<ChainIndexer<I>>) -> Result<u64, NodeError>
where
    R: AsyncBufRead + Unpin,
    I: AddressHistoryIndex + ?Sized + 'static,
{
    let mut lines = reader.lines();
    let mut line_no = 0u64;
    let mut indexed = 0u64;

    loop {
        line_no += 1;
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                return Err(NodeError::Feed {
                    line: line_no,
                    reason: e.to_string(),
                })
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let block: EngineBlock = serde_json::from_str(line).map_err(|e| NodeError::Feed {
            line: line_no,
            reason: format!("invalid block: {e}"),
        })?;
        let committed = build_index_data(block);
        let number = committed.block.number;

        let lane = indexer.clone();
        tokio::task::spawn_blocking(move || lane.on_block_committed(committed))
            .await
            .map_err(|e| NodeError::Feed {
                line: line_no,
                reason: format!("indexing task failed: {e}"),
            })??;

        tracing::debug!(block = number, "fed block to indexer");
        indexed += 1;
    }

    Ok(indexed)
}
