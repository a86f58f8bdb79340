//! The phased scan loop.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use rpa_core::error::Result;
use rpa_core::traits::{CursorStore, IndexerClient, Keystore, PaymentKeyExtractor};
use rpa_core::types::TxRef;

use crate::config::PipelineConfig;
use crate::state::{PipelineState, QueueEntry};

/// Drives paycode payment discovery against an indexing server.
///
/// One `tick` performs at most one history request and drains at most one
/// queued entry, so a host can call it from any periodic scheduler without
/// the pipeline monopolizing a connection. All collaborator calls that can
/// block happen outside the state lock.
pub struct ScanPipeline {
    config: PipelineConfig,
    client: Arc<dyn IndexerClient + Send + Sync>,
    cursor: Arc<dyn CursorStore + Send + Sync>,
    keystore: Arc<dyn Keystore + Send + Sync>,
    extractor: Arc<dyn PaymentKeyExtractor + Send + Sync>,
    grind_prefix: String,
    state: Mutex<PipelineState>,
}

impl ScanPipeline {
    /// A pipeline scanning for `grind_prefix` (the wallet's uppercase hex
    /// prefix) through the given collaborators.
    pub fn new(
        config: PipelineConfig,
        client: Arc<dyn IndexerClient + Send + Sync>,
        cursor: Arc<dyn CursorStore + Send + Sync>,
        keystore: Arc<dyn Keystore + Send + Sync>,
        extractor: Arc<dyn PaymentKeyExtractor + Send + Sync>,
        grind_prefix: String,
    ) -> Self {
        Self {
            config,
            client,
            cursor,
            keystore,
            extractor,
            grind_prefix,
            state: Mutex::new(PipelineState::default()),
        }
    }

    /// One scheduler beat: maybe request the next history chunk, then
    /// drain one queued entry.
    pub fn tick(&self) -> Result<()> {
        if !self.extractor.ready() {
            return Ok(());
        }
        self.request_next_chunk()?;
        self.drain_one()
    }

    /// Requests prefix-matching mempool transactions. Call on mempool
    /// change notifications rather than every tick.
    pub fn poll_mempool(&self) {
        if !self.extractor.ready() {
            return;
        }
        self.client.request_mempool(&self.grind_prefix);
    }

    /// Number of entries awaiting the drain phase.
    pub fn queue_depth(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Number of unanswered history requests.
    pub fn pending_requests(&self) -> usize {
        self.state.lock().pending.len()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REQUEST PHASE
    // ═══════════════════════════════════════════════════════════════════════════

    fn request_next_chunk(&self) -> Result<()> {
        let Some(server_height) = self.client.server_height() else {
            return Ok(());
        };

        let request = {
            let mut state = self.state.lock();
            // unprocessed work first; new chunks wait
            if !state.queue.is_empty() {
                return Ok(());
            }

            let rpa_height = match self.cursor.rpa_height() {
                Some(h) => h,
                None => {
                    let start = server_height.saturating_sub(self.config.lookback_blocks);
                    self.cursor.set_rpa_height(start)?;
                    info!(start, "initialized scan cursor behind server tip");
                    start
                }
            };
            if rpa_height > server_height {
                return Ok(());
            }

            let ttl = self.config.pending_request_ttl;
            state.pending.retain(|start, sent| {
                let keep = sent.elapsed() < ttl;
                if !keep {
                    warn!(start, "history request timed out, allowing re-request");
                }
                keep
            });
            if state.pending.contains_key(&rpa_height) {
                return Ok(());
            }

            let count = (server_height - rpa_height + 1).min(self.config.chunk_blocks);
            state.pending.insert(rpa_height, Instant::now());
            (rpa_height, count)
        };

        debug!(start = request.0, count = request.1, "requesting history chunk");
        self.client
            .request_history(request.0, request.1, &self.grind_prefix);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RESPONSE CALLBACKS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Feeds back the server's response to a history request. `None`
    /// signals a server-side error; the chunk stays unscanned and is
    /// re-requested on a later tick.
    pub fn on_history_response(&self, start: u32, count: u32, response: Option<Vec<TxRef>>) {
        let txids: Vec<String> = {
            let mut state = self.state.lock();
            state.pending.remove(&start);
            let Some(refs) = response else {
                warn!(start, "history request failed, cursor not advanced");
                return;
            };
            refs.into_iter()
                .map(|r| {
                    if r.height > 0 {
                        state.tx_heights.insert(r.tx_hash.clone(), r.height);
                    }
                    r.tx_hash
                })
                .collect()
        };

        debug!(start, count, matches = txids.len(), "history chunk answered");
        for txid in &txids {
            self.client.request_transaction(txid);
        }
        self.state.lock().queue.push_back(QueueEntry::LastBlock {
            height: start + count - 1,
        });
    }

    /// Feeds back the server's response to a mempool request. Mempool
    /// matches carry no completion sentinel; the cursor never moves for
    /// them.
    pub fn on_mempool_response(&self, response: Option<Vec<TxRef>>) {
        let Some(refs) = response else {
            warn!("mempool request failed");
            return;
        };
        for r in &refs {
            self.client.request_transaction(&r.tx_hash);
        }
    }

    /// Feeds back a raw transaction (or `None` if the server could not
    /// serve it).
    pub fn on_transaction_response(&self, txid: &str, raw: Option<String>) {
        let mut state = self.state.lock();
        let height = state.tx_heights.remove(txid).unwrap_or(0);
        match raw {
            Some(raw) => state.queue.push_back(QueueEntry::RawTx { raw, height }),
            None => warn!(txid, "raw transaction unavailable"),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DRAIN PHASE
    // ═══════════════════════════════════════════════════════════════════════════

    fn drain_one(&self) -> Result<()> {
        let Some(entry) = self.state.lock().queue.pop_front() else {
            return Ok(());
        };
        match entry {
            QueueEntry::RawTx { raw, height } => {
                // extraction is the expensive part; it runs unlocked
                let keys = match self.extractor.extract(&raw) {
                    Ok(keys) => keys,
                    Err(err) => {
                        warn!(height, %err, "failed to scan candidate transaction");
                        return Ok(());
                    }
                };
                for wif in keys {
                    let imported = self.keystore.import_private_key(&wif)?;
                    if imported {
                        info!(height, "imported payment key");
                    } else {
                        debug!(height, "payment key already known");
                    }
                }
            }
            QueueEntry::LastBlock { height } => {
                self.cursor.set_rpa_height(height + 1)?;
                debug!(next = height + 1, "scan cursor advanced");
            }
        }
        Ok(())
    }
}
