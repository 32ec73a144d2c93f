//! # Peer Request Router
//!
//! Single entry point for decoded peer requests. Each request is routed to
//! the component that owns it:
//!
//! | Request            | Component                   |
//! |--------------------|-----------------------------|
//! | `acceptNewPeer`    | [`PeerRegistry`]            |
//! | `getPeers`         | [`PeerRegistry`]            |
//! | `getCommonBlocks`  | [`CommonAncestorResolver`]  |
//! | `getStatus`        | [`ChainStateHandle`]        |
//! | `postBlock`        | [`BlockIngestionPipeline`]  |
//! | `postTransactions` | [`TransactionPoolGuard`]    |
//! | `getBlocks`        | [`BlockStore`]              |
//!
//! `dispatch` wraps every request in a span carrying a fresh request id and
//! converts failures into the peer-facing error body.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{Block, Hash, Transaction};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{ConfigError, PeerSyncConfig};
use crate::domain::{
    parse_page_height, ChainStatus, CommonBlocksResponse, HandshakeHeaders, PeerErrorResponse,
    PeerSyncError, PeerView, BLOCKS_PAGE_SIZE,
};
use crate::ports::{
    AccountStateProvider, BlockStore, LedgerApplier, PeerCompatibility, PeerRequest, PeerResponse,
    PeerSyncApi, TransactionBroadcaster, TransactionPool, TransactionVerifier,
};
use crate::service::{
    BlockIngestionPipeline, ChainStateHandle, CommonAncestorResolver, PeerRegistry,
    TransactionPoolGuard,
};

/// Collaborators the router wires into its components.
pub struct PeerSyncPorts {
    pub compatibility: Arc<dyn PeerCompatibility>,
    pub ledger: Arc<dyn LedgerApplier>,
    pub store: Arc<dyn BlockStore>,
    pub verifier: Arc<dyn TransactionVerifier>,
    pub accounts: Arc<dyn AccountStateProvider>,
    pub pool: Arc<dyn TransactionPool>,
    pub broadcaster: Arc<dyn TransactionBroadcaster>,
}

pub struct PeerRequestRouter {
    registry: PeerRegistry,
    chain: ChainStateHandle,
    ingestion: BlockIngestionPipeline,
    guard: TransactionPoolGuard,
    resolver: CommonAncestorResolver,
    store: Arc<dyn BlockStore>,
}

impl PeerRequestRouter {
    /// Wire the components. `config` is validated first, so a hand-built
    /// config is held to the same rules as one loaded from TOML.
    pub fn new(
        config: &PeerSyncConfig,
        chain: ChainStateHandle,
        ports: PeerSyncPorts,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry: PeerRegistry::new(ports.compatibility),
            ingestion: BlockIngestionPipeline::new(
                chain.clone(),
                ports.ledger,
                config.recent_block_cache_size,
            ),
            guard: TransactionPoolGuard::new(
                config,
                ports.verifier,
                ports.accounts,
                ports.pool,
                ports.broadcaster,
            ),
            resolver: CommonAncestorResolver::new(
                ports.store.clone(),
                chain.clone(),
                config.max_common_block_ids,
            ),
            store: ports.store,
            chain,
        })
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn chain(&self) -> &ChainStateHandle {
        &self.chain
    }

    pub fn guard(&self) -> &TransactionPoolGuard {
        &self.guard
    }

    /// Route one request inside its own span.
    pub async fn dispatch(&self, request: PeerRequest) -> Result<PeerResponse, PeerErrorResponse> {
        let span = info_span!(
            "peer_request",
            request_id = %Uuid::new_v4(),
            kind = request.kind(),
        );
        async move {
            let result = self.route(request).await;
            match &result {
                Ok(_) => debug!("request completed"),
                Err(PeerSyncError::Io(e)) => warn!(error = %e, "request failed"),
                Err(e) => debug!(error = %e, "request rejected"),
            }
            result.map_err(|e| PeerErrorResponse::from(&e))
        }
        .instrument(span)
        .await
    }

    async fn route(&self, request: PeerRequest) -> Result<PeerResponse, PeerSyncError> {
        match request {
            PeerRequest::AcceptNewPeer(headers) => {
                self.accept_new_peer(headers).await.map(|()| PeerResponse::Ack)
            }
            PeerRequest::GetPeers => Ok(PeerResponse::Peers(self.get_peers().await)),
            PeerRequest::GetCommonBlocks { ids } => {
                self.get_common_blocks(&ids).await.map(PeerResponse::CommonBlocks)
            }
            PeerRequest::GetStatus => Ok(PeerResponse::Status(self.get_status().await)),
            PeerRequest::PostBlock { block, origin } => {
                self.post_block(*block, origin).await.map(|()| PeerResponse::Ack)
            }
            PeerRequest::PostTransactions(transactions) => self
                .post_transactions(transactions)
                .await
                .map(PeerResponse::TransactionIds),
            PeerRequest::GetBlocks { last_block_height } => {
                self.get_blocks(last_block_height).await.map(PeerResponse::Blocks)
            }
        }
    }
}

#[async_trait]
impl PeerSyncApi for PeerRequestRouter {
    async fn accept_new_peer(&self, headers: HandshakeHeaders) -> Result<(), PeerSyncError> {
        self.registry.accept_peer(&headers)
    }

    async fn get_peers(&self) -> Vec<PeerView> {
        self.registry.list_peers()
    }

    async fn get_common_blocks(&self, ids: &str) -> Result<CommonBlocksResponse, PeerSyncError> {
        self.resolver.find_common_block(ids).await
    }

    async fn get_status(&self) -> ChainStatus {
        self.chain.status()
    }

    async fn post_block(&self, block: Block, origin: SocketAddr) -> Result<(), PeerSyncError> {
        self.ingestion.ingest(block, origin).map(|_| ())
    }

    async fn post_transactions(&self, transactions: Vec<Transaction>) -> Result<Vec<Hash>, PeerSyncError> {
        let result = self.guard.process_batch(transactions).await?;
        Ok(result.admitted())
    }

    async fn get_blocks(&self, last_block_height: Option<String>) -> Result<Vec<Block>, PeerSyncError> {
        match parse_page_height(last_block_height.as_deref()) {
            Some(height) => Ok(self.store.read_blocks_from(height, BLOCKS_PAGE_SIZE).await?),
            None => Ok(self.chain.current_tip().block().cloned().into_iter().collect()),
        }
    }
}
