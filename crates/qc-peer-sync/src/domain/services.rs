//! Domain services: pure functions over peer requests.
//!
//! Nothing here locks, awaits, or talks to a collaborator. The service layer
//! gathers inputs, then calls these.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::time::Duration;

use shared_types::{hash_from_hex, Hash, PublicKey, Transaction};

use super::entities::{
    BlockSummary, Disposition, HandshakeHeaders, PeerHandshake, ValidationResult,
};
use super::errors::{PeerSyncError, RejectReason, TxRejection};

// =============================================================================
// HANDSHAKE
// =============================================================================

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, RejectReason> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RejectReason::MissingField(name)),
    }
}

/// Check that all five handshake fields are present and typed.
///
/// Network and version compatibility are not judged here.
pub fn validate_handshake_fields(headers: &HandshakeHeaders) -> Result<PeerHandshake, RejectReason> {
    let ip = required(&headers.ip, "ip")?;
    let nethash = required(&headers.nethash, "nethash")?;
    let version = required(&headers.version, "version")?;
    let port = required(&headers.port, "port")?;
    let os = required(&headers.os, "os")?;

    let ip: IpAddr = ip.parse().map_err(|_| RejectReason::MalformedField("ip"))?;
    let port: u16 = match port.parse() {
        Ok(p) if p != 0 => p,
        _ => return Err(RejectReason::MalformedField("port")),
    };

    Ok(PeerHandshake {
        ip,
        nethash: nethash.to_string(),
        version: version.to_string(),
        port,
        os: os.to_string(),
    })
}

/// Parse `major.minor.patch`, ignoring a `-suffix` on the patch component.
pub fn parse_version(version: &str) -> Option<(u64, u64, u64)> {
    let core = version.split('-').next()?;
    let mut parts = core.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

/// True when `version` parses and is not below `minimum`.
pub fn version_at_least(version: &str, minimum: &str) -> bool {
    match (parse_version(version), parse_version(minimum)) {
        (Some(v), Some(min)) => v >= min,
        _ => false,
    }
}

/// Sort key for the peer list: measured latencies ascending, unmeasured
/// last, ties by registration order.
pub fn latency_rank(latency: Option<Duration>, seq: u64) -> (bool, Duration, u64) {
    (latency.is_none(), latency.unwrap_or(Duration::ZERO), seq)
}

// =============================================================================
// BLOCKS
// =============================================================================

/// Continuity rule: with a downloaded block at height `H`, only `H + 1`
/// chains. With nothing downloaded every height is a candidate.
pub fn check_continuity(
    last_downloaded: Option<BlockSummary>,
    received_height: u64,
) -> Result<(), PeerSyncError> {
    match last_downloaded {
        Some(last) if last.height.checked_add(1) != Some(received_height) => {
            Err(PeerSyncError::UnchainedBlock {
                expected_height: last.height,
                received_height,
            })
        }
        _ => Ok(()),
    }
}

/// Height selecting a `getBlocks` page. `None` unless the raw value is a
/// decimal integer of at least 1.
pub fn parse_page_height(raw: Option<&str>) -> Option<u64> {
    let raw = raw?.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u64>().ok().filter(|h| *h >= 1)
}

/// Parse a comma-separated id list from a peer.
///
/// Entries are trimmed and unquoted; entries that are not ids are skipped;
/// duplicates keep their first position; at most `max_ids` are returned.
pub fn parse_block_ids(raw: &str, max_ids: usize) -> Vec<Hash> {
    let mut ids: Vec<Hash> = Vec::new();
    for entry in raw.split(',') {
        if ids.len() == max_ids {
            break;
        }
        let entry = entry.trim().trim_matches('"').trim_matches('\'');
        match hash_from_hex(entry) {
            Ok(id) if !ids.contains(&id) => ids.push(id),
            Ok(_) => {}
            Err(e) => tracing::debug!(entry, error = %e, "skipping malformed block id"),
        }
    }
    ids
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Local structural checks, before the signature is verified.
pub fn check_structure(tx: &Transaction, max_vendor_data_bytes: usize) -> Result<(), TxRejection> {
    if let Err(raw) = tx.kind() {
        return Err(TxRejection::Malformed(format!("unknown type {raw}")));
    }
    if tx.total_spend().is_none() {
        return Err(TxRejection::Malformed("amount + fee overflows".to_string()));
    }
    if let Some(data) = &tx.vendor_data {
        if data.len() > max_vendor_data_bytes {
            return Err(TxRejection::Malformed(format!(
                "vendor data {} bytes exceeds {}",
                data.len(),
                max_vendor_data_bytes
            )));
        }
    }
    Ok(())
}

/// A transaction with everything gathered outside the admission lock.
#[derive(Debug, Clone)]
pub struct PrecheckedTransaction {
    pub id: Hash,
    pub sender: PublicKey,
    pub fee: u64,
    /// `amount + fee`; zero when the structural check failed.
    pub spend: u64,
    /// Outcome of structural and signature checks.
    pub structural: Result<(), TxRejection>,
    /// Sender balance as read before admission.
    pub balance: u64,
}

/// Rules applied while partitioning a batch.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionRules {
    pub max_pending_per_sender: usize,
    pub min_relay_fee: u64,
}

/// Partition a prechecked batch.
///
/// Checks run in order: structure and signature, balance, pool duplicate,
/// pending cap. The cap counts the pool plus transactions from the same
/// sender admitted earlier in this batch.
pub fn partition_batch(
    batch: &[PrecheckedTransaction],
    rules: AdmissionRules,
    is_pooled: impl Fn(&Hash) -> bool,
    pending_count: impl Fn(&PublicKey) -> usize,
) -> ValidationResult {
    let mut occurrences: HashMap<Hash, usize> = HashMap::with_capacity(batch.len());
    for tx in batch {
        *occurrences.entry(tx.id).or_default() += 1;
    }

    let mut admitted_in_batch: HashMap<PublicKey, usize> = HashMap::new();
    let mut emitted: HashSet<Hash> = HashSet::with_capacity(occurrences.len());
    let mut entries: Vec<(Hash, Disposition)> = Vec::with_capacity(occurrences.len());

    for tx in batch {
        if !emitted.insert(tx.id) {
            continue;
        }
        let disposition = if occurrences[&tx.id] > 1 {
            Disposition::Invalid(TxRejection::DuplicateInBatch)
        } else if let Err(reason) = &tx.structural {
            Disposition::Invalid(reason.clone())
        } else if tx.spend > tx.balance {
            Disposition::Invalid(TxRejection::InsufficientBalance {
                required: tx.spend,
                available: tx.balance,
            })
        } else if is_pooled(&tx.id) {
            Disposition::Invalid(TxRejection::AlreadyPooled)
        } else {
            let in_batch = admitted_in_batch.entry(tx.sender).or_default();
            if pending_count(&tx.sender) + *in_batch >= rules.max_pending_per_sender {
                Disposition::Excess
            } else {
                *in_batch += 1;
                if tx.fee >= rules.min_relay_fee {
                    Disposition::Broadcast
                } else {
                    Disposition::Accepted
                }
            }
        };
        entries.push((tx.id, disposition));
    }

    ValidationResult::from_entries(entries)
}
