//! Adapters implementing the outbound ports.
//!
//! - `memory`: in-memory block store and transaction pool
//! - `ledger_queue`: bounded handoff queue and the worker that drains it
//! - `broadcast`: channel-backed transaction relay
//! - `compatibility`: nethash, version and self-connection checks
//! - `clock`: epoch-based slot clock

pub mod broadcast;
pub mod clock;
pub mod compatibility;
pub mod ledger_queue;
pub mod memory;

pub use broadcast::ChannelBroadcaster;
pub use clock::EpochSlotClock;
pub use compatibility::NetworkCompatibility;
pub use ledger_queue::{ApplyOutcome, ChannelLedgerApplier, LedgerWorker, QueuedBlock};
pub use memory::{InMemoryBlockStore, InMemoryTransactionPool};
