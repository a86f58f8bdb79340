//! Mutable pipeline state, guarded by one mutex.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// A unit of work awaiting the drain phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum QueueEntry {
    /// A raw transaction to scan for payments.
    RawTx {
        /// Raw transaction hex.
        raw: String,
        /// Confirmation height, 0 for mempool.
        height: u32,
    },
    /// Marks that every transaction of a chunk ending at `height` has been
    /// enqueued ahead of it; draining it advances the cursor.
    LastBlock {
        /// Last block height of the completed chunk.
        height: u32,
    },
}

#[derive(Debug, Default)]
pub(crate) struct PipelineState {
    /// FIFO of scan work; the drain phase takes exactly one entry per tick.
    pub queue: VecDeque<QueueEntry>,
    /// Confirmation heights for transactions whose raw bytes are still in
    /// flight, keyed by txid.
    pub tx_heights: HashMap<String, u32>,
    /// Start heights of unanswered history requests and when they were
    /// sent.
    pub pending: HashMap<u32, Instant>,
}
