//! Channel-backed transaction relay.

use shared_types::Hash;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::PortError;
use crate::ports::TransactionBroadcaster;

/// Forwards relay batches to whatever task owns the gossip side.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    sender: mpsc::Sender<Vec<Hash>>,
}

impl ChannelBroadcaster {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Vec<Hash>>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl TransactionBroadcaster for ChannelBroadcaster {
    fn broadcast_transactions(&self, ids: Vec<Hash>) -> Result<(), PortError> {
        let count = ids.len();
        self.sender.try_send(ids).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PortError::QueueFull("broadcast"),
            mpsc::error::TrySendError::Closed(_) => PortError::Unavailable("broadcast channel closed".to_string()),
        })?;
        debug!(count, "transactions queued for relay");
        Ok(())
    }
}
