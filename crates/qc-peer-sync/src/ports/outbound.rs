//! Outbound (Driven) ports for the peer sync core.
//!
//! Everything the core calls but does not own: storage, the ledger,
//! signature checks, account balances, the pending pool, slot timing, and
//! relay. Synchronous ports may be called while a core lock is held and must
//! not block on I/O; async ports are only awaited with no lock held.

use std::net::SocketAddr;

use async_trait::async_trait;
use shared_types::{Block, CommonBlock, Hash, PublicKey, Transaction};

use crate::domain::{PeerHandshake, PortError, RejectReason};

/// Network and version compatibility of a handshake.
pub trait PeerCompatibility: Send + Sync {
    /// `Ok` when the peer may be registered.
    fn check(&self, handshake: &PeerHandshake) -> Result<(), RejectReason>;
}

/// Handoff into the ledger-application sequence.
///
/// Called inside the ingestion critical section, so it must only enqueue.
pub trait LedgerApplier: Send + Sync {
    fn enqueue_block(&self, block: Block, origin: SocketAddr) -> Result<(), PortError>;
}

/// The ledger-application subsystem: verifies and applies one block.
#[async_trait]
pub trait BlockApplication: Send + Sync {
    async fn apply_incoming_block(&self, block: &Block, origin: SocketAddr) -> Result<(), PortError>;
}

/// Persisted block history.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Up to `limit` consecutive blocks starting at `height`, ascending.
    async fn read_blocks_from(&self, height: u64, limit: u32) -> Result<Vec<Block>, PortError>;

    /// The subset of `ids` present on this node's chain, in any order.
    async fn read_common_blocks(&self, ids: &[Hash]) -> Result<Vec<CommonBlock>, PortError>;
}

/// Forging slot timing against wall-clock time.
pub trait SlotClock: Send + Sync {
    fn is_forging_allowed(&self) -> bool;
    fn current_slot(&self) -> u64;
}

/// Relay of admitted transactions to the rest of the network.
pub trait TransactionBroadcaster: Send + Sync {
    fn broadcast_transactions(&self, ids: Vec<Hash>) -> Result<(), PortError>;
}

/// Cryptographic signature check for transactions.
#[async_trait]
pub trait TransactionVerifier: Send + Sync {
    /// `Ok(false)` for a well-formed but wrong signature.
    async fn verify_signature(&self, tx: &Transaction) -> Result<bool, PortError>;
}

/// Confirmed account balances.
#[async_trait]
pub trait AccountStateProvider: Send + Sync {
    async fn balance_of(&self, sender: &PublicKey) -> Result<u64, PortError>;
}

/// The pending-transaction pool.
///
/// Called under the guard's admission lock; implementations must not block
/// on I/O.
pub trait TransactionPool: Send + Sync {
    fn contains(&self, id: &Hash) -> bool;

    /// Transactions from `sender` currently pending.
    fn pending_count(&self, sender: &PublicKey) -> usize;

    /// Insert transactions in the given order.
    fn admit(&self, transactions: Vec<Transaction>) -> Result<(), PortError>;
}
