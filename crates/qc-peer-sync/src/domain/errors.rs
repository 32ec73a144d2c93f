//! # Domain Errors
//!
//! Request-scoped failures of the peer sync core. None of them is fatal to
//! the process; each rejects exactly one peer request.

use serde::Serialize;
use shared_types::Hash;
use thiserror::Error;

/// Failure reported by an outbound collaborator (storage, verification,
/// queues). Peers only ever see it as an unclassified I/O failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("verification service error: {0}")]
    Verification(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("queue full: {0}")]
    QueueFull(&'static str),

    #[error("collaborator timed out")]
    Timeout,
}

/// Why a handshake was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("missing handshake field `{0}`")]
    MissingField(&'static str),

    #[error("malformed handshake field `{0}`")]
    MalformedField(&'static str),

    #[error("nethash does not match this network")]
    NethashMismatch,

    #[error("incompatible protocol version")]
    IncompatibleVersion,

    #[error("peer is this node")]
    SelfConnection,
}

/// Why a single transaction was classified invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxRejection {
    #[error("malformed transaction: {0}")]
    Malformed(String),

    #[error("signature does not verify")]
    BadSignature,

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("transaction already pooled")]
    AlreadyPooled,

    #[error("transaction id repeated within batch")]
    DuplicateInBatch,
}

/// Peer sync errors.
#[derive(Debug, Error)]
pub enum PeerSyncError {
    /// Handshake malformed or incompatible; the peer was not registered.
    #[error("invalid peer: {0}")]
    InvalidPeer(RejectReason),

    /// None of the candidate ids is on this node's chain.
    #[error("no common block among {candidates} candidate ids")]
    MissingCommonBlock { candidates: usize },

    /// Block height does not follow the last downloaded block.
    ///
    /// `expected_height` is the height of the last downloaded block; the only
    /// height that would have chained is `expected_height + 1`.
    #[error("unchained block: last height {expected_height}, received {received_height}")]
    UnchainedBlock {
        expected_height: u64,
        received_height: u64,
    },

    /// At least one transaction in the batch failed validation; nothing from
    /// the batch was admitted.
    #[error("{} invalid transaction(s) in batch", invalid.len())]
    InvalidTransactions { invalid: Vec<Hash> },

    /// Batch holds more transactions than one request may carry; nothing
    /// was checked or admitted.
    #[error("batch of {size} transactions exceeds limit {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// A collaborator failed.
    #[error("I/O failure: {0}")]
    Io(#[from] PortError),
}

impl From<RejectReason> for PeerSyncError {
    fn from(reason: RejectReason) -> Self {
        Self::InvalidPeer(reason)
    }
}

/// Peer-facing error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerErrorKind {
    InvalidPeer,
    MissingCommonBlock,
    UnchainedBlock,
    InvalidTransactions,
    BatchTooLarge,
    Io,
}

/// Error body returned to the transport for a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerErrorResponse {
    pub kind: PeerErrorKind,
    pub message: String,
}

impl From<&PeerSyncError> for PeerErrorResponse {
    fn from(err: &PeerSyncError) -> Self {
        let kind = match err {
            PeerSyncError::InvalidPeer(_) => PeerErrorKind::InvalidPeer,
            PeerSyncError::MissingCommonBlock { .. } => PeerErrorKind::MissingCommonBlock,
            PeerSyncError::UnchainedBlock { .. } => PeerErrorKind::UnchainedBlock,
            PeerSyncError::InvalidTransactions { .. } => PeerErrorKind::InvalidTransactions,
            PeerSyncError::BatchTooLarge { .. } => PeerErrorKind::BatchTooLarge,
            PeerSyncError::Io(_) => PeerErrorKind::Io,
        };
        // Collaborator details stay on this side of the wire.
        let message = match err {
            PeerSyncError::Io(_) => "internal I/O failure".to_string(),
            other => other.to_string(),
        };
        Self { kind, message }
    }
}
