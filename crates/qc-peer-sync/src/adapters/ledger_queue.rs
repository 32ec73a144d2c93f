//! # Ledger Handoff Queue
//!
//! Bounded channel between the ingestion pipeline and the ledger.
//!
//! - [`ChannelLedgerApplier`]: the pipeline side; enqueues without waiting
//! - [`LedgerWorker`]: drains the queue in order, applies each block, and
//!   reports the outcome to the chain state
//!
//! Blocks leave the queue in the order they were accepted, so they reach the
//! ledger in strictly increasing height order.

use std::net::SocketAddr;
use std::sync::Arc;

use shared_types::{short_hex, Block};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::{BlockSummary, PortError};
use crate::ports::{BlockApplication, LedgerApplier};
use crate::service::ChainStateHandle;

/// A block waiting for application.
#[derive(Debug)]
pub struct QueuedBlock {
    pub block: Block,
    pub origin: SocketAddr,
}

/// Enqueue side of the ledger queue.
#[derive(Debug, Clone)]
pub struct ChannelLedgerApplier {
    sender: mpsc::Sender<QueuedBlock>,
}

impl ChannelLedgerApplier {
    /// Create a queue holding at most `capacity` blocks.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<QueuedBlock>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl LedgerApplier for ChannelLedgerApplier {
    fn enqueue_block(&self, block: Block, origin: SocketAddr) -> Result<(), PortError> {
        self.sender
            .try_send(QueuedBlock { block, origin })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => PortError::QueueFull("ledger"),
                mpsc::error::TrySendError::Closed(_) => {
                    PortError::Unavailable("ledger worker stopped".to_string())
                }
            })
    }
}

/// Outcome of handling one queued block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Failed,
    /// No longer chains onto the tip after an earlier failure.
    Skipped,
}

/// Drains the ledger queue.
pub struct LedgerWorker {
    receiver: mpsc::Receiver<QueuedBlock>,
    application: Arc<dyn BlockApplication>,
    chain: ChainStateHandle,
}

impl LedgerWorker {
    pub fn new(
        receiver: mpsc::Receiver<QueuedBlock>,
        application: Arc<dyn BlockApplication>,
        chain: ChainStateHandle,
    ) -> Self {
        Self {
            receiver,
            application,
            chain,
        }
    }

    /// Run until every [`ChannelLedgerApplier`] is dropped and the queue is
    /// empty.
    pub async fn run(mut self) {
        info!("ledger worker started");
        while let Some(queued) = self.receiver.recv().await {
            self.handle(queued).await;
        }
        info!("ledger worker stopped");
    }

    pub async fn handle(&self, queued: QueuedBlock) -> ApplyOutcome {
        let QueuedBlock { block, origin } = queued;
        let tip = self.chain.current_tip();
        if !tip.is_empty() && block.height != tip.height() + 1 {
            debug!(
                id = %short_hex(&block.id),
                height = block.height,
                tip_height = tip.height(),
                "dropping queued block that no longer chains"
            );
            self.chain.rewind_if_downloaded(BlockSummary {
                id: block.id,
                height: block.height,
            });
            return ApplyOutcome::Skipped;
        }

        match self.application.apply_incoming_block(&block, origin).await {
            Ok(()) => {
                self.chain.record_applied(block);
                ApplyOutcome::Applied
            }
            Err(e) => {
                warn!(
                    id = %short_hex(&block.id),
                    height = block.height,
                    %origin,
                    error = %e,
                    "block application failed"
                );
                self.chain.rewind_downloaded_to_tip();
                ApplyOutcome::Failed
            }
        }
    }
}
