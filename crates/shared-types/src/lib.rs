//! # Shared Types Crate
//!
//! Entities exchanged between the peer sync core and its collaborators.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: blocks and transactions are defined once here.
//! - **Wire Shape Only**: no hashing or signature logic; ids and signatures are
//!   carried, never computed.

pub mod entities;
pub mod hex_id;

pub use entities::*;
pub use hex_id::{hash_from_hex, short_hex, to_hex, HexIdError};
