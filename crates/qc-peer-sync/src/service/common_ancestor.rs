//! # Common-Ancestor Resolver
//!
//! Answers "which of these block ids is on your chain?" so a peer can find
//! where its chain and ours diverge. Candidates are tried in the order the
//! peer sent them; the first one found wins.

use std::sync::Arc;

use shared_types::short_hex;
use tracing::debug;

use crate::domain::{parse_block_ids, CommonBlocksResponse, PeerSyncError};
use crate::ports::BlockStore;
use crate::service::ChainStateHandle;

pub struct CommonAncestorResolver {
    store: Arc<dyn BlockStore>,
    chain: ChainStateHandle,
    max_ids: usize,
}

impl CommonAncestorResolver {
    pub fn new(store: Arc<dyn BlockStore>, chain: ChainStateHandle, max_ids: usize) -> Self {
        Self { store, chain, max_ids }
    }

    /// Resolve a comma-separated candidate list.
    ///
    /// # Errors
    /// - `MissingCommonBlock`: no well-formed candidate is on this chain
    /// - `Io`: the block store failed
    pub async fn find_common_block(&self, raw_ids: &str) -> Result<CommonBlocksResponse, PeerSyncError> {
        let candidates = parse_block_ids(raw_ids, self.max_ids);
        if candidates.is_empty() {
            return Err(PeerSyncError::MissingCommonBlock { candidates: 0 });
        }

        let found = self.store.read_common_blocks(&candidates).await?;
        let common = candidates
            .iter()
            .find_map(|id| found.iter().find(|b| b.id == *id))
            .copied()
            .ok_or(PeerSyncError::MissingCommonBlock {
                candidates: candidates.len(),
            })?;

        let current_height = self.chain.current_tip().height();
        debug!(
            id = %short_hex(&common.id),
            height = common.height,
            current_height,
            "common block found"
        );
        Ok(CommonBlocksResponse { common, current_height })
    }
}
