//! Inbound ports (API) for the peer sync core.

use std::net::SocketAddr;

use async_trait::async_trait;
use serde::Serialize;
use shared_types::{Block, Hash, Transaction};

use crate::domain::{ChainStatus, CommonBlocksResponse, HandshakeHeaders, PeerSyncError, PeerView};

/// Primary API: one method per peer request.
#[async_trait]
pub trait PeerSyncApi: Send + Sync {
    /// Validate a handshake and register (or refresh) the peer.
    ///
    /// # Errors
    /// - `InvalidPeer`: missing field, nethash mismatch, incompatible
    ///   version or self-connection
    async fn accept_new_peer(&self, headers: HandshakeHeaders) -> Result<(), PeerSyncError>;

    /// Known peers, lowest latency first.
    async fn get_peers(&self) -> Vec<PeerView>;

    /// First id of `ids` (comma-separated) that is on this node's chain.
    ///
    /// # Errors
    /// - `MissingCommonBlock`: no candidate is on this chain
    async fn get_common_blocks(&self, ids: &str) -> Result<CommonBlocksResponse, PeerSyncError>;

    /// Tip height, forging flag, slot and tip header.
    async fn get_status(&self) -> ChainStatus;

    /// Offer a block from `origin` to the ingestion pipeline.
    ///
    /// # Errors
    /// - `UnchainedBlock`: height does not follow the last downloaded block
    async fn post_block(&self, block: Block, origin: SocketAddr) -> Result<(), PeerSyncError>;

    /// Validate a batch and admit it to the pool. Returns admitted ids in
    /// admission order.
    ///
    /// # Errors
    /// - `InvalidTransactions`: any transaction failed; nothing admitted
    async fn post_transactions(&self, transactions: Vec<Transaction>) -> Result<Vec<Hash>, PeerSyncError>;

    /// A page of blocks from `last_block_height`, or the tip when the height
    /// is absent or not a positive integer.
    async fn get_blocks(&self, last_block_height: Option<String>) -> Result<Vec<Block>, PeerSyncError>;
}

/// A decoded peer request, as handed over by the transport.
#[derive(Debug, Clone)]
pub enum PeerRequest {
    AcceptNewPeer(HandshakeHeaders),
    GetPeers,
    GetCommonBlocks { ids: String },
    GetStatus,
    PostBlock { block: Box<Block>, origin: SocketAddr },
    PostTransactions(Vec<Transaction>),
    GetBlocks { last_block_height: Option<String> },
}

impl PeerRequest {
    /// Short name used in logs and spans.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AcceptNewPeer(_) => "accept_new_peer",
            Self::GetPeers => "get_peers",
            Self::GetCommonBlocks { .. } => "get_common_blocks",
            Self::GetStatus => "get_status",
            Self::PostBlock { .. } => "post_block",
            Self::PostTransactions(_) => "post_transactions",
            Self::GetBlocks { .. } => "get_blocks",
        }
    }
}

/// Successful response bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PeerResponse {
    /// Request accepted, nothing to return.
    Ack,
    Peers(Vec<PeerView>),
    CommonBlocks(CommonBlocksResponse),
    Status(ChainStatus),
    TransactionIds(Vec<Hash>),
    Blocks(Vec<Block>),
}
