//! Core domain entities for the peer sync core.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};
use shared_types::{BlockHeader, CommonBlock, Hash};

use super::errors::TxRejection;

// =============================================================================
// PEERS
// =============================================================================

/// Handshake fields exactly as a peer sent them. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HandshakeHeaders {
    pub ip: Option<String>,
    pub nethash: Option<String>,
    pub version: Option<String>,
    pub port: Option<String>,
    pub os: Option<String>,
}

/// A handshake that passed field validation. Built only by
/// [`validate_handshake_fields`](super::validate_handshake_fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerHandshake {
    pub ip: IpAddr,
    pub nethash: String,
    pub version: String,
    pub port: u16,
    pub os: String,
}

/// A registered remote node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub ip: IpAddr,
    pub nethash: String,
    pub version: String,
    pub port: u16,
    pub os: String,
    /// Last measured round-trip latency; `None` until measured.
    pub latency: Option<Duration>,
}

impl Peer {
    pub fn from_handshake(handshake: PeerHandshake) -> Self {
        Self {
            ip: handshake.ip,
            nethash: handshake.nethash,
            version: handshake.version,
            port: handshake.port,
            os: handshake.os,
            latency: None,
        }
    }

    /// Overwrite handshake fields, keeping measured latency.
    pub fn refresh(&mut self, handshake: PeerHandshake) {
        self.nethash = handshake.nethash;
        self.version = handshake.version;
        self.port = handshake.port;
        self.os = handshake.os;
    }

    /// Serializable view handed to other peers.
    pub fn view(&self) -> PeerView {
        PeerView {
            ip: self.ip.to_string(),
            port: self.port,
            nethash: self.nethash.clone(),
            version: self.version.clone(),
            os: self.os.clone(),
            latency_ms: self.latency.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}

/// Broadcast view of a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerView {
    pub ip: String,
    pub port: u16,
    pub nethash: String,
    pub version: String,
    pub os: String,
    pub latency_ms: Option<u64>,
}

// =============================================================================
// CHAIN
// =============================================================================

/// Identity of a block the node has downloaded or accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSummary {
    pub id: Hash,
    pub height: u64,
}

/// Answer to a status request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStatus {
    pub height: u64,
    pub forging_allowed: bool,
    pub current_slot: u64,
    /// Tip header; serialized as `{}` while the chain is empty.
    #[serde(serialize_with = "header_or_empty")]
    pub header: Option<BlockHeader>,
}

fn header_or_empty<S: Serializer>(header: &Option<BlockHeader>, s: S) -> Result<S::Ok, S::Error> {
    match header {
        Some(h) => h.serialize(s),
        None => serde_json::Map::new().serialize(s),
    }
}

/// Answer to a common-blocks request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommonBlocksResponse {
    pub common: CommonBlock,
    pub current_height: u64,
}

// =============================================================================
// TRANSACTION BATCHES
// =============================================================================

/// Where one transaction of a batch ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Admitted to the pool, not relayed.
    Accepted,
    /// Admitted to the pool and queued for relay.
    Broadcast,
    /// Failed structural or admission checks.
    Invalid(TxRejection),
    /// Sender already at its pending cap.
    Excess,
}

/// Outcome of running a batch through the guard.
///
/// Holds one entry per distinct input id, in input order, so the four sets
/// partition the input ids by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    entries: Vec<(Hash, Disposition)>,
}

impl ValidationResult {
    pub(crate) fn from_entries(entries: Vec<(Hash, Disposition)>) -> Self {
        Self { entries }
    }

    fn ids_where(&self, pred: impl Fn(&Disposition) -> bool) -> Vec<Hash> {
        self.entries
            .iter()
            .filter(|(_, d)| pred(d))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn accepted(&self) -> Vec<Hash> {
        self.ids_where(|d| matches!(d, Disposition::Accepted))
    }

    pub fn broadcast(&self) -> Vec<Hash> {
        self.ids_where(|d| matches!(d, Disposition::Broadcast))
    }

    pub fn invalid(&self) -> Vec<Hash> {
        self.ids_where(|d| matches!(d, Disposition::Invalid(_)))
    }

    pub fn excess(&self) -> Vec<Hash> {
        self.ids_where(|d| matches!(d, Disposition::Excess))
    }

    /// Every id the pool takes (`accepted` and `broadcast`), in admission order.
    pub fn admitted(&self) -> Vec<Hash> {
        self.ids_where(|d| matches!(d, Disposition::Accepted | Disposition::Broadcast))
    }

    pub fn has_invalid(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, d)| matches!(d, Disposition::Invalid(_)))
    }

    pub fn disposition(&self, id: &Hash) -> Option<&Disposition> {
        self.entries.iter().find(|(e, _)| e == id).map(|(_, d)| d)
    }

    pub fn entries(&self) -> &[(Hash, Disposition)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
