//! # Chain State Tracker
//!
//! The node's belief about its own chain: the accepted tip and the last
//! block downloaded from the network. One handle is created at startup from
//! persisted storage and cloned into every component that needs it.
//!
//! ## Writers
//!
//! - `record_downloaded`: ingestion pipeline only, inside its critical section;
//!   compare-and-set against the marker its continuity check read
//! - `record_applied` / `rewind_downloaded_to_tip` / `rewind_if_downloaded`:
//!   the ledger side, which may run at any point of an ingestion

use std::sync::Arc;

use parking_lot::RwLock;
use shared_types::{short_hex, Block, BlockHeader};
use tracing::{debug, warn};

use crate::domain::{BlockSummary, ChainStatus};
use crate::ports::SlotClock;

/// The accepted tip, or the empty-chain sentinel.
#[derive(Debug, Clone, Default)]
pub struct ChainTip(Option<Arc<Block>>);

impl ChainTip {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn block(&self) -> Option<&Block> {
        self.0.as_deref()
    }

    /// Tip height; 0 for an empty chain.
    pub fn height(&self) -> u64 {
        self.0.as_ref().map_or(0, |b| b.height)
    }

    pub fn header(&self) -> Option<BlockHeader> {
        self.0.as_ref().map(|b| b.header())
    }

    pub fn summary(&self) -> Option<BlockSummary> {
        self.0.as_ref().map(|b| BlockSummary {
            id: b.id,
            height: b.height,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

#[derive(Debug, Default)]
struct ChainStateInner {
    tip: ChainTip,
    last_downloaded: Option<BlockSummary>,
}

/// Shared handle to the chain state.
#[derive(Clone)]
pub struct ChainStateHandle {
    inner: Arc<RwLock<ChainStateInner>>,
    slots: Arc<dyn SlotClock>,
}

impl ChainStateHandle {
    /// Start from the persisted tip, if any. The downloaded marker starts at
    /// the tip.
    pub fn new(tip: Option<Block>, slots: Arc<dyn SlotClock>) -> Self {
        let tip = ChainTip(tip.map(Arc::new));
        let last_downloaded = tip.summary();
        Self {
            inner: Arc::new(RwLock::new(ChainStateInner {
                tip,
                last_downloaded,
            })),
            slots,
        }
    }

    pub fn current_tip(&self) -> ChainTip {
        self.inner.read().tip.clone()
    }

    /// Last block accepted into the processing sequence; may be ahead of the
    /// tip while the ledger catches up.
    pub fn last_downloaded(&self) -> Option<BlockSummary> {
        self.inner.read().last_downloaded
    }

    pub fn status(&self) -> ChainStatus {
        let tip = self.current_tip();
        ChainStatus {
            height: tip.height(),
            forging_allowed: self.slots.is_forging_allowed(),
            current_slot: self.slots.current_slot(),
            header: tip.header(),
        }
    }

    /// Advance the tip after the ledger applied `block`.
    ///
    /// Returns `false` and leaves state untouched when `block` does not sit
    /// above the current tip.
    pub fn record_applied(&self, block: Block) -> bool {
        let mut inner = self.inner.write();
        let tip_height = inner.tip.height();
        if !inner.tip.is_empty() && block.height <= tip_height {
            warn!(
                height = block.height,
                tip_height, "ignoring applied block at or below tip"
            );
            return false;
        }
        let summary = BlockSummary {
            id: block.id,
            height: block.height,
        };
        if inner.last_downloaded.map_or(true, |d| d.height < summary.height) {
            inner.last_downloaded = Some(summary);
        }
        debug!(height = block.height, id = %short_hex(&block.id), "tip advanced");
        inner.tip = ChainTip(Some(Arc::new(block)));
        true
    }

    /// Drop downloaded-but-unapplied progress after an application failure.
    pub fn rewind_downloaded_to_tip(&self) {
        let mut inner = self.inner.write();
        let rewound = inner.tip.summary();
        if inner.last_downloaded != rewound {
            debug!(
                from = ?inner.last_downloaded.map(|d| d.height),
                to = inner.tip.height(),
                "rewinding downloaded marker to tip"
            );
        }
        inner.last_downloaded = rewound;
    }

    /// Drop `summary` from the downloaded marker if it is still the latest
    /// downloaded block. Used when a queued block turns out to be orphaned.
    pub fn rewind_if_downloaded(&self, summary: BlockSummary) -> bool {
        let mut inner = self.inner.write();
        if inner.last_downloaded != Some(summary) {
            return false;
        }
        debug!(height = summary.height, to = inner.tip.height(), "orphaned download rewound");
        inner.last_downloaded = inner.tip.summary();
        true
    }

    /// Mark `summary` as downloaded if the marker still equals `observed`.
    ///
    /// Returns `false` when the ledger side moved the marker since it was
    /// read; the caller must not treat the block as downloaded.
    pub(crate) fn record_downloaded(&self, observed: Option<BlockSummary>, summary: BlockSummary) -> bool {
        let mut inner = self.inner.write();
        if inner.last_downloaded != observed {
            return false;
        }
        inner.last_downloaded = Some(summary);
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) struct FixedClock {
        pub forging: bool,
        pub slot: u64,
    }

    impl SlotClock for FixedClock {
        fn is_forging_allowed(&self) -> bool {
            self.forging
        }

        fn current_slot(&self) -> u64 {
            self.slot
        }
    }

    pub(crate) fn block(height: u64, tag: u8) -> Block {
        Block {
            id: [tag; 32],
            height,
            previous_block: None,
            timestamp: height * 10,
            generator_public_key: [0u8; 32],
            block_signature: [0u8; 64],
            transactions: Vec::new(),
        }
    }

    fn handle(tip: Option<Block>) -> ChainStateHandle {
        ChainStateHandle::new(tip, Arc::new(FixedClock { forging: true, slot: 77 }))
    }

    #[test]
    fn test_empty_chain_sentinel() {
        let chain = handle(None);
        let tip = chain.current_tip();
        assert!(tip.is_empty());
        assert_eq!(tip.height(), 0);
        assert!(tip.header().is_none());
        assert!(chain.last_downloaded().is_none());
    }

    #[test]
    fn test_status_reads_clock_and_tip() {
        let chain = handle(Some(block(5, 5)));
        let status = chain.status();
        assert_eq!(status.height, 5);
        assert!(status.forging_allowed);
        assert_eq!(status.current_slot, 77);
        assert_eq!(status.header.unwrap().id, [5u8; 32]);
    }

    #[test]
    fn test_downloaded_starts_at_tip() {
        let chain = handle(Some(block(5, 5)));
        assert_eq!(chain.last_downloaded().unwrap().height, 5);
    }

    pub(crate) fn download(chain: &ChainStateHandle, height: u64, tag: u8) {
        let summary = BlockSummary { id: [tag; 32], height };
        assert!(chain.record_downloaded(chain.last_downloaded(), summary));
    }

    #[test]
    fn test_record_downloaded_compares_marker() {
        let chain = handle(Some(block(5, 5)));
        let observed = chain.last_downloaded();
        assert!(chain.record_downloaded(observed, BlockSummary { id: [6u8; 32], height: 6 }));
        // Stale observation: the marker moved since it was read.
        assert!(!chain.record_downloaded(observed, BlockSummary { id: [7u8; 32], height: 7 }));
        assert_eq!(chain.last_downloaded().unwrap().height, 6);
    }

    #[test]
    fn test_rewind_if_downloaded() {
        let chain = handle(Some(block(5, 5)));
        download(&chain, 6, 6);
        assert!(!chain.rewind_if_downloaded(BlockSummary { id: [9u8; 32], height: 6 }));
        assert_eq!(chain.last_downloaded().unwrap().height, 6);
        assert!(chain.rewind_if_downloaded(BlockSummary { id: [6u8; 32], height: 6 }));
        assert_eq!(chain.last_downloaded().unwrap().height, 5);
    }

    #[test]
    fn test_record_applied_advances_tip() {
        let chain = handle(Some(block(5, 5)));
        download(&chain, 6, 6);
        assert!(chain.record_applied(block(6, 6)));
        assert_eq!(chain.current_tip().height(), 6);
        assert_eq!(chain.last_downloaded().unwrap().height, 6);
        assert!(!chain.record_applied(block(6, 9)));
        assert_eq!(chain.current_tip().block().unwrap().id, [6u8; 32]);
    }

    #[test]
    fn test_rewind_to_tip() {
        let chain = handle(Some(block(5, 5)));
        download(&chain, 6, 6);
        chain.rewind_downloaded_to_tip();
        assert_eq!(chain.last_downloaded().unwrap().height, 5);

        let empty = handle(None);
        download(&empty, 1, 1);
        empty.rewind_downloaded_to_tip();
        assert!(empty.last_downloaded().is_none());
    }
}
