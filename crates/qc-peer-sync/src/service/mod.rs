//! Service layer: the stateful components behind the peer request API.

pub mod chain_state;
pub mod common_ancestor;
pub mod ingestion;
pub mod peer_registry;
pub mod router;
pub mod tx_guard;

pub use chain_state::{ChainStateHandle, ChainTip};
pub use common_ancestor::CommonAncestorResolver;
pub use ingestion::{BlockIngestionPipeline, IngestOutcome};
pub use peer_registry::PeerRegistry;
pub use router::{PeerRequestRouter, PeerSyncPorts};
pub use tx_guard::TransactionPoolGuard;
