//! # Block Ingestion Pipeline
//!
//! Serializes incoming blocks, drops ones already handed off, enforces the
//! continuity rule, and passes chained blocks to the ledger queue.
//!
//! ## Critical Section
//!
//! One mutex covers the whole check-then-handoff sequence:
//! 1. Read the downloaded marker once
//! 2. Deduplication against recently handed-off ids still at or below it
//! 3. Continuity against the same marker
//! 4. Enqueue to the ledger
//! 5. Compare-and-set the downloaded marker and remember the id
//!
//! Two concurrent submissions therefore never both pass the continuity check
//! for the same height. The enqueue is synchronous and never awaits.
//!
//! The ledger worker rewinds the marker without taking this mutex. When a
//! rewind lands between steps 1 and 5 the compare-and-set fails and the block
//! is reported as unchained; the worker later skips the queued copy. A block
//! whose handoff was rewound is no longer a duplicate and may be resent.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::{short_hex, Block};
use tracing::{debug, info, warn};

use crate::domain::{check_continuity, BlockSummary, PeerSyncError, RecentBlockCache};
use crate::ports::LedgerApplier;
use crate::service::ChainStateHandle;

/// What happened to a submitted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Handed to the ledger queue.
    Enqueued,
    /// Already handed off recently; nothing done.
    Duplicate,
}

pub struct BlockIngestionPipeline {
    /// Ids handed to the ledger, guarded together with the continuity check.
    recent: Mutex<RecentBlockCache>,
    chain: ChainStateHandle,
    ledger: Arc<dyn LedgerApplier>,
}

impl BlockIngestionPipeline {
    pub fn new(
        chain: ChainStateHandle,
        ledger: Arc<dyn LedgerApplier>,
        recent_block_cache_size: usize,
    ) -> Self {
        Self {
            recent: Mutex::new(RecentBlockCache::new(recent_block_cache_size)),
            chain,
            ledger,
        }
    }

    /// Offer a block received from `origin`.
    ///
    /// # Errors
    /// - `UnchainedBlock`: height is not the last downloaded height plus one,
    ///   or the ledger side rewound the marker during the handoff
    /// - `Io`: the ledger queue refused the block; state is unchanged
    pub fn ingest(&self, block: Block, origin: SocketAddr) -> Result<IngestOutcome, PeerSyncError> {
        let mut recent = self.recent.lock();
        let observed = self.chain.last_downloaded();

        if recent.contains(&block.id) && observed.is_some_and(|d| block.height <= d.height) {
            debug!(id = %short_hex(&block.id), %origin, "duplicate block ignored");
            return Ok(IngestOutcome::Duplicate);
        }

        check_continuity(observed, block.height).map_err(|e| {
            debug!(id = %short_hex(&block.id), %origin, error = %e, "block rejected");
            e
        })?;

        let summary = BlockSummary {
            id: block.id,
            height: block.height,
        };
        if let Err(e) = self.ledger.enqueue_block(block, origin) {
            warn!(id = %short_hex(&summary.id), height = summary.height, error = %e, "ledger handoff failed");
            return Err(e.into());
        }

        if !self.chain.record_downloaded(observed, summary) {
            let current = self.chain.last_downloaded();
            debug!(
                id = %short_hex(&summary.id),
                height = summary.height,
                current = ?current.map(|d| d.height),
                "downloaded marker moved during handoff"
            );
            return Err(PeerSyncError::UnchainedBlock {
                expected_height: current.map_or(0, |d| d.height),
                received_height: summary.height,
            });
        }
        recent.insert(summary.id);
        info!(id = %short_hex(&summary.id), height = summary.height, %origin, "block queued for application");
        Ok(IngestOutcome::Enqueued)
    }

    /// Number of ids currently remembered for deduplication.
    pub fn recent_len(&self) -> usize {
        self.recent.lock().len()
    }
}
