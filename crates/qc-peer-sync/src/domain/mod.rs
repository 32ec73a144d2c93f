//! # Domain Layer for Peer Sync
//!
//! Pure business logic with no I/O dependencies.
//!
//! ## Contents
//!
//! - **entities**: `Peer`, `PeerHandshake`, `ChainStatus`, `ValidationResult`
//! - **errors**: `PeerSyncError` taxonomy and the peer-facing error body
//! - **value_objects**: `RecentBlockCache`, protocol constants
//! - **services**: handshake field checks, continuity, batch partitioning,
//!   request parameter parsing

mod entities;
mod errors;
mod services;
mod value_objects;

pub use entities::*;
pub use errors::*;
pub use services::*;
pub use value_objects::*;
