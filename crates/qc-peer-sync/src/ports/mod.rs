//! Ports layer for the peer sync core.
//!
//! - Inbound (Driving) ports: the peer request API
//! - Outbound (Driven) ports: storage, ledger, crypto, pool and relay

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
