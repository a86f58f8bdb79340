//! Pipeline tuning knobs.

use std::time::Duration;

use rpa_core::constants::{PENDING_REQUEST_TTL_SECS, SCAN_CHUNK_BLOCKS, SCAN_LOOKBACK_BLOCKS};

/// Configuration for a [`ScanPipeline`](crate::ScanPipeline).
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// How far behind the server tip a wallet with no saved cursor starts.
    pub lookback_blocks: u32,
    /// Maximum blocks per history request.
    pub chunk_blocks: u32,
    /// How long an unanswered history request blocks re-requesting its
    /// start height.
    pub pending_request_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_blocks: SCAN_LOOKBACK_BLOCKS,
            chunk_blocks: SCAN_CHUNK_BLOCKS,
            pending_request_ttl: Duration::from_secs(PENDING_REQUEST_TTL_SECS),
        }
    }
}

impl PipelineConfig {
    /// Sets the fresh-wallet lookback.
    pub fn with_lookback_blocks(mut self, blocks: u32) -> Self {
        self.lookback_blocks = blocks;
        self
    }

    /// Sets the history chunk size.
    pub fn with_chunk_blocks(mut self, blocks: u32) -> Self {
        self.chunk_blocks = blocks.max(1);
        self
    }

    /// Sets the pending-request lifetime.
    pub fn with_pending_request_ttl(mut self, ttl: Duration) -> Self {
        self.pending_request_ttl = ttl;
        self
    }
}
