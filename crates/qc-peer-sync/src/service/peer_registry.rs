//! # Peer Registry
//!
//! Known peers keyed by IP, with handshake metadata and measured latency.
//! Reads and writes go through a reader/writer lock; listing may lag a
//! concurrent registration by one write.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::{
    latency_rank, validate_handshake_fields, HandshakeHeaders, Peer, PeerSyncError, PeerView,
};
use crate::ports::PeerCompatibility;

#[derive(Debug)]
struct PeerRecord {
    peer: Peer,
    /// Registration order, used to break latency ties.
    seq: u64,
}

#[derive(Debug, Default)]
struct PeerTable {
    by_ip: HashMap<IpAddr, PeerRecord>,
    next_seq: u64,
}

/// Registry of peers that completed a handshake.
pub struct PeerRegistry {
    table: RwLock<PeerTable>,
    compatibility: Arc<dyn PeerCompatibility>,
}

impl PeerRegistry {
    pub fn new(compatibility: Arc<dyn PeerCompatibility>) -> Self {
        Self {
            table: RwLock::new(PeerTable::default()),
            compatibility,
        }
    }

    /// Validate a handshake and register or refresh the peer.
    ///
    /// A refresh overwrites handshake fields and keeps measured latency and
    /// registration order.
    pub fn accept_peer(&self, headers: &HandshakeHeaders) -> Result<(), PeerSyncError> {
        let handshake = validate_handshake_fields(headers).map_err(|reason| {
            debug!(ip = ?headers.ip, %reason, "handshake rejected");
            PeerSyncError::InvalidPeer(reason)
        })?;

        if let Err(reason) = self.compatibility.check(&handshake) {
            debug!(ip = %handshake.ip, %reason, "handshake rejected");
            return Err(PeerSyncError::InvalidPeer(reason));
        }

        let mut guard = self.table.write();
        let table = &mut *guard;
        let ip = handshake.ip;
        if let Some(record) = table.by_ip.get_mut(&ip) {
            record.peer.refresh(handshake);
            debug!(%ip, "peer handshake refreshed");
        } else {
            let seq = table.next_seq;
            table.next_seq += 1;
            info!(%ip, port = handshake.port, version = %handshake.version, "peer registered");
            table.by_ip.insert(
                ip,
                PeerRecord {
                    peer: Peer::from_handshake(handshake),
                    seq,
                },
            );
        }
        Ok(())
    }

    /// Broadcast views ordered by ascending latency; unmeasured peers last;
    /// ties in registration order.
    pub fn list_peers(&self) -> Vec<PeerView> {
        let table = self.table.read();
        let mut records: Vec<&PeerRecord> = table.by_ip.values().collect();
        records.sort_by_key(|r| latency_rank(r.peer.latency, r.seq));
        records.iter().map(|r| r.peer.view()).collect()
    }

    /// Store a fresh latency measurement. Returns `false` for unknown peers.
    pub fn record_latency(&self, ip: IpAddr, latency: Duration) -> bool {
        match self.table.write().by_ip.get_mut(&ip) {
            Some(record) => {
                record.peer.latency = Some(latency);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, ip: &IpAddr) -> Option<Peer> {
        self.table.read().by_ip.get(ip).map(|r| r.peer.clone())
    }

    pub fn len(&self) -> usize {
        self.table.read().by_ip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PeerHandshake, RejectReason};
    use proptest::prelude::*;

    struct AllowAll;

    impl PeerCompatibility for AllowAll {
        fn check(&self, _handshake: &PeerHandshake) -> Result<(), RejectReason> {
            Ok(())
        }
    }

    struct RejectNethash;

    impl PeerCompatibility for RejectNethash {
        fn check(&self, _handshake: &PeerHandshake) -> Result<(), RejectReason> {
            Err(RejectReason::NethashMismatch)
        }
    }

    fn headers(ip: &str, port: &str) -> HandshakeHeaders {
        HandshakeHeaders {
            ip: Some(ip.into()),
            nethash: Some("net".into()),
            version: Some("1.0.0".into()),
            port: Some(port.into()),
            os: Some("linux".into()),
        }
    }

    fn registry() -> PeerRegistry {
        PeerRegistry::new(Arc::new(AllowAll))
    }

    #[test]
    fn test_accept_then_list_once() {
        let registry = registry();
        registry.accept_peer(&headers("1.1.1.1", "4000")).unwrap();
        registry.accept_peer(&headers("1.1.1.1", "4001")).unwrap();
        let peers = registry.list_peers();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].port, 4001);
    }

    #[test]
    fn test_rejected_peer_not_registered() {
        let registry = PeerRegistry::new(Arc::new(RejectNethash));
        let err = registry.accept_peer(&headers("1.1.1.1", "4000")).unwrap_err();
        assert!(matches!(
            err,
            PeerSyncError::InvalidPeer(RejectReason::NethashMismatch)
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_field_rejected() {
        let registry = registry();
        let mut h = headers("1.1.1.1", "4000");
        h.version = None;
        assert!(matches!(
            registry.accept_peer(&h),
            Err(PeerSyncError::InvalidPeer(RejectReason::MissingField("version")))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reregistration_keeps_latency() {
        let registry = registry();
        let ip: IpAddr = "1.1.1.1".parse().unwrap();
        registry.accept_peer(&headers("1.1.1.1", "4000")).unwrap();
        assert!(registry.record_latency(ip, Duration::from_millis(25)));
        registry.accept_peer(&headers("1.1.1.1", "4000")).unwrap();
        assert_eq!(registry.get(&ip).unwrap().latency, Some(Duration::from_millis(25)));
    }

    #[test]
    fn test_record_latency_unknown_peer() {
        assert!(!registry().record_latency("9.9.9.9".parse().unwrap(), Duration::from_millis(1)));
    }

    #[test]
    fn test_list_orders_by_latency_then_insertion() {
        let registry = registry();
        for ip in ["1.0.0.1", "1.0.0.2", "1.0.0.3", "1.0.0.4"] {
            registry.accept_peer(&headers(ip, "4000")).unwrap();
        }
        registry.record_latency("1.0.0.2".parse().unwrap(), Duration::from_millis(50));
        registry.record_latency("1.0.0.3".parse().unwrap(), Duration::from_millis(10));
        registry.record_latency("1.0.0.4".parse().unwrap(), Duration::from_millis(50));
        let order: Vec<String> = registry.list_peers().into_iter().map(|p| p.ip).collect();
        assert_eq!(order, vec!["1.0.0.3", "1.0.0.2", "1.0.0.4", "1.0.0.1"]);
    }

    #[test]
    fn test_empty_registry_lists_nothing() {
        assert!(registry().list_peers().is_empty());
    }

    proptest! {
        #[test]
        fn prop_list_is_sorted_by_latency(latencies in proptest::collection::vec(0u64..500, 0..30)) {
            let registry = registry();
            for (i, ms) in latencies.iter().enumerate() {
                let ip = format!("10.0.{}.{}", i / 200, i % 200 + 1);
                registry.accept_peer(&headers(&ip, "4000")).unwrap();
                registry.record_latency(ip.parse().unwrap(), Duration::from_millis(*ms));
            }
            let listed: Vec<u64> = registry
                .list_peers()
                .into_iter()
                .map(|p| p.latency_ms.unwrap_or(u64::MAX))
                .collect();
            prop_assert_eq!(listed.len(), latencies.len());
            prop_assert!(listed.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
