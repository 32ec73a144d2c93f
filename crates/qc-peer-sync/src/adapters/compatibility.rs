//! Handshake compatibility checks against this node's network settings.

use std::net::SocketAddr;

use crate::config::PeerSyncConfig;
use crate::domain::{version_at_least, PeerHandshake, RejectReason};
use crate::ports::PeerCompatibility;

/// Accepts peers on the same network, at or above the minimum version, that
/// are not this node.
#[derive(Debug, Clone)]
pub struct NetworkCompatibility {
    nethash: String,
    min_version: String,
    own_address: Option<SocketAddr>,
}

impl NetworkCompatibility {
    pub fn new(nethash: impl Into<String>, min_version: impl Into<String>, own_address: Option<SocketAddr>) -> Self {
        Self {
            nethash: nethash.into(),
            min_version: min_version.into(),
            own_address,
        }
    }

    pub fn from_config(config: &PeerSyncConfig) -> Self {
        Self::new(&config.nethash, &config.min_peer_version, config.own_address)
    }
}

impl PeerCompatibility for NetworkCompatibility {
    fn check(&self, handshake: &PeerHandshake) -> Result<(), RejectReason> {
        if !handshake.nethash.eq_ignore_ascii_case(&self.nethash) {
            return Err(RejectReason::NethashMismatch);
        }
        if !version_at_least(&handshake.version, &self.min_version) {
            return Err(RejectReason::IncompatibleVersion);
        }
        if self.own_address == Some(SocketAddr::new(handshake.ip, handshake.port)) {
            return Err(RejectReason::SelfConnection);
        }
        Ok(())
    }
}
