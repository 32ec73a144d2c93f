//! # Peer Sync Core
//!
//! The peer-facing half of a node's synchronization layer: handshakes,
//! block ingestion, transaction admission, and ancestry queries for peers
//! catching up.
//!
//! ## Purpose
//!
//! Validates, sequences, and answers inbound peer requests. Transport,
//! signature primitives, the persistent store, and slot timing stay outside
//! and are reached through outbound ports.
//!
//! ## Components
//!
//! | Component | Type | Owns |
//! |-----------|------|------|
//! | Peer Registry | `PeerRegistry` | peers keyed by ip, latency ordering |
//! | Chain State Tracker | `ChainStateHandle` | tip, last downloaded block, status |
//! | Transaction Pool Guard | `TransactionPoolGuard` | batch validation, fail-closed admission |
//! | Block Ingestion Pipeline | `BlockIngestionPipeline` | dedup, continuity, ledger handoff |
//! | Common-Ancestor Resolver | `CommonAncestorResolver` | fork-point lookup |
//! | Peer Request Router | `PeerRequestRouter` | dispatch, request spans, error bodies |
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | One registry entry per ip | `service/peer_registry.rs` - keyed map |
//! | Downloaded height never skips | `service/ingestion.rs` - critical section |
//! | A block id is handed off once | `domain/value_objects.rs` - `RecentBlockCache` |
//! | No partial batch admission | `service/tx_guard.rs` - `process_batch()` |
//! | Partition sets are disjoint and complete | `domain/services.rs` - `partition_batch()` |
//! | No lock held across `.await` | all of `service/` |
//!
//! ## Request Table
//!
//! | Request | Success | Error |
//! |---------|---------|-------|
//! | `acceptNewPeer` | ack | `InvalidPeer` |
//! | `getPeers` | peers by latency | - |
//! | `getCommonBlocks` | `{common, current_height}` | `MissingCommonBlock` |
//! | `getStatus` | `{height, forging_allowed, current_slot, header}` | - |
//! | `postBlock` | ack | `UnchainedBlock` |
//! | `postTransactions` | admitted ids | `InvalidTransactions` |
//! | `getBlocks` | up to 400 blocks | - |
//!
//! Any of them may also fail with `Io` when a collaborator fails.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - memory store/pool, ledger queue, relay, clock      │
//! │  service/  - the six components, PeerRequestRouter              │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - PeerSyncApi, PeerRequest, PeerResponse     │
//! │  ports/outbound.rs - BlockStore, LedgerApplier, TransactionPool │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/entities.rs      - Peer, ChainStatus, ValidationResult  │
//! │  domain/services.rs      - handshake, continuity, partitioning  │
//! │  domain/value_objects.rs - RecentBlockCache, BLOCKS_PAGE_SIZE   │
//! │  domain/errors.rs        - PeerSyncError, PortError             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wiring
//!
//! ```rust,ignore
//! let config = PeerSyncConfig::from_toml_str(&raw)?;
//! let chain = ChainStateHandle::new(store.tip(), Arc::new(EpochSlotClock::new(epoch, 10)));
//! let (ledger, queue) = ChannelLedgerApplier::channel(config.ledger_queue_capacity);
//! tokio::spawn(LedgerWorker::new(queue, application, chain.clone()).run());
//! let router = PeerRequestRouter::new(&config, chain, ports)?;
//! let response = router.dispatch(PeerRequest::GetStatus).await;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use config::{ConfigError, PeerSyncConfig};
pub use domain::*;
pub use ports::*;
pub use service::*;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
