//! # Transaction Pool Guard
//!
//! Validates batches of peer-submitted transactions and admits them to the
//! pending pool.
//!
//! ## Flow
//!
//! 0. Refuse batches above `max_transactions_per_batch`
//! 1. Precheck (no lock held): structure, signature, sender balances
//! 2. Partition under the admission lock: accepted, broadcast, invalid, excess
//! 3. Fail closed: any invalid transaction rejects the whole batch
//! 4. Admit accepted and broadcast transactions, still under the lock
//! 5. Relay the broadcast set after the lock is released
//!
//! The admission lock spans every sender, so two batches from one sender can
//! never both pass the pending cap.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::{short_hex, Hash, PublicKey, Transaction};
use tracing::{debug, info, warn};

use crate::config::PeerSyncConfig;
use crate::domain::{
    check_structure, partition_batch, AdmissionRules, PeerSyncError, PrecheckedTransaction,
    TxRejection, ValidationResult,
};
use crate::ports::{AccountStateProvider, TransactionBroadcaster, TransactionPool, TransactionVerifier};

pub struct TransactionPoolGuard {
    verifier: Arc<dyn TransactionVerifier>,
    accounts: Arc<dyn AccountStateProvider>,
    pool: Arc<dyn TransactionPool>,
    broadcaster: Arc<dyn TransactionBroadcaster>,
    rules: AdmissionRules,
    max_batch: usize,
    max_vendor_data_bytes: usize,
    /// Serializes partition-and-admit across all batches.
    admission: Mutex<()>,
}

impl TransactionPoolGuard {
    pub fn new(
        config: &PeerSyncConfig,
        verifier: Arc<dyn TransactionVerifier>,
        accounts: Arc<dyn AccountStateProvider>,
        pool: Arc<dyn TransactionPool>,
        broadcaster: Arc<dyn TransactionBroadcaster>,
    ) -> Self {
        Self {
            verifier,
            accounts,
            pool,
            broadcaster,
            rules: AdmissionRules {
                max_pending_per_sender: config.max_pending_per_sender,
                min_relay_fee: config.min_relay_fee,
            },
            max_batch: config.max_transactions_per_batch,
            max_vendor_data_bytes: config.max_vendor_data_bytes,
            admission: Mutex::new(()),
        }
    }

    /// Classify a batch against the current pool without admitting anything.
    pub async fn validate_batch(&self, transactions: &[Transaction]) -> Result<ValidationResult, PeerSyncError> {
        self.check_batch_size(transactions.len())?;
        let prechecked = self.precheck(transactions).await?;
        let _admission = self.admission.lock();
        Ok(self.partition(&prechecked))
    }

    /// Validate a batch and admit it.
    ///
    /// Returns the full classification on success. Excess transactions are
    /// dropped silently.
    ///
    /// # Errors
    /// - `BatchTooLarge`: more than `max_transactions_per_batch` transactions;
    ///   nothing is checked
    /// - `InvalidTransactions`: at least one transaction is invalid; the pool
    ///   is untouched
    /// - `Io`: a collaborator failed; the pool is untouched
    pub async fn process_batch(&self, transactions: Vec<Transaction>) -> Result<ValidationResult, PeerSyncError> {
        if transactions.is_empty() {
            return Ok(ValidationResult::default());
        }
        self.check_batch_size(transactions.len())?;
        let prechecked = self.precheck(&transactions).await?;

        let result = {
            let _admission = self.admission.lock();
            let result = self.partition(&prechecked);

            if result.has_invalid() {
                let invalid = result.invalid();
                for (id, disposition) in result.entries() {
                    debug!(id = %short_hex(id), ?disposition, "batch entry");
                }
                info!(
                    batch = transactions.len(),
                    invalid = invalid.len(),
                    "transaction batch rejected"
                );
                return Err(PeerSyncError::InvalidTransactions { invalid });
            }

            let admitted = result.admitted();
            if !admitted.is_empty() {
                let mut by_id: HashMap<Hash, Transaction> =
                    transactions.into_iter().map(|tx| (tx.id, tx)).collect();
                let ordered: Vec<Transaction> =
                    admitted.iter().filter_map(|id| by_id.remove(id)).collect();
                self.pool.admit(ordered)?;
            }
            result
        };

        info!(
            accepted = result.accepted().len(),
            broadcast = result.broadcast().len(),
            excess = result.excess().len(),
            "transaction batch admitted"
        );

        let relay = result.broadcast();
        if !relay.is_empty() {
            if let Err(e) = self.broadcaster.broadcast_transactions(relay) {
                warn!(error = %e, "transaction relay failed");
            }
        }
        Ok(result)
    }

    fn check_batch_size(&self, size: usize) -> Result<(), PeerSyncError> {
        if size > self.max_batch {
            info!(batch = size, max = self.max_batch, "oversized transaction batch refused");
            return Err(PeerSyncError::BatchTooLarge {
                size,
                max: self.max_batch,
            });
        }
        Ok(())
    }

    fn partition(&self, prechecked: &[PrecheckedTransaction]) -> ValidationResult {
        partition_batch(
            prechecked,
            self.rules,
            |id| self.pool.contains(id),
            |sender| self.pool.pending_count(sender),
        )
    }

    /// Gather everything that needs a collaborator round-trip, one balance
    /// read per distinct sender.
    async fn precheck(&self, transactions: &[Transaction]) -> Result<Vec<PrecheckedTransaction>, PeerSyncError> {
        let mut structural: Vec<Result<(), TxRejection>> = Vec::with_capacity(transactions.len());
        for tx in transactions {
            let mut outcome = check_structure(tx, self.max_vendor_data_bytes);
            if outcome.is_ok() && !self.verifier.verify_signature(tx).await? {
                outcome = Err(TxRejection::BadSignature);
            }
            structural.push(outcome);
        }

        let mut balances: HashMap<PublicKey, u64> = HashMap::new();
        for (tx, outcome) in transactions.iter().zip(&structural) {
            if outcome.is_ok() && !balances.contains_key(&tx.sender_public_key) {
                let balance = self.accounts.balance_of(&tx.sender_public_key).await?;
                balances.insert(tx.sender_public_key, balance);
            }
        }

        Ok(transactions
            .iter()
            .zip(structural)
            .map(|(tx, structural)| PrecheckedTransaction {
                id: tx.id,
                sender: tx.sender_public_key,
                fee: tx.fee,
                spend: if structural.is_ok() { tx.total_spend().unwrap_or(0) } else { 0 },
                balance: balances.get(&tx.sender_public_key).copied().unwrap_or(0),
                structural,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Disposition, PortError};
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct SignatureTable {
        bad: HashSet<Hash>,
    }

    #[async_trait]
    impl TransactionVerifier for SignatureTable {
        async fn verify_signature(&self, tx: &Transaction) -> Result<bool, PortError> {
            Ok(!self.bad.contains(&tx.id))
        }
    }

    struct FlatBalances(u64);

    #[async_trait]
    impl AccountStateProvider for FlatBalances {
        async fn balance_of(&self, _sender: &PublicKey) -> Result<u64, PortError> {
            Ok(self.0)
        }
    }

    struct BrokenAccounts;

    #[async_trait]
    impl AccountStateProvider for BrokenAccounts {
        async fn balance_of(&self, _sender: &PublicKey) -> Result<u64, PortError> {
            Err(PortError::Unavailable("accounts".into()))
        }
    }

    #[derive(Default)]
    struct VecPool {
        txs: Mutex<Vec<Transaction>>,
    }

    impl TransactionPool for VecPool {
        fn contains(&self, id: &Hash) -> bool {
            self.txs.lock().iter().any(|t| t.id == *id)
        }

        fn pending_count(&self, sender: &PublicKey) -> usize {
            self.txs.lock().iter().filter(|t| t.sender_public_key == *sender).count()
        }

        fn admit(&self, transactions: Vec<Transaction>) -> Result<(), PortError> {
            self.txs.lock().extend(transactions);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingRelay {
        relayed: Mutex<Vec<Hash>>,
    }

    impl TransactionBroadcaster for RecordingRelay {
        fn broadcast_transactions(&self, ids: Vec<Hash>) -> Result<(), PortError> {
            self.relayed.lock().extend(ids);
            Ok(())
        }
    }

    fn tx(id: u8, sender: u8, fee: u64) -> Transaction {
        Transaction {
            id: [id; 32],
            sender_public_key: [sender; 32],
            tx_type: 0,
            fee,
            amount: 10,
            timestamp: 0,
            signature: [0u8; 64],
            vendor_data: None,
        }
    }

    struct Fixture {
        guard: TransactionPoolGuard,
        pool: Arc<VecPool>,
        relay: Arc<RecordingRelay>,
    }

    fn fixture(bad: &[u8], accounts: Arc<dyn AccountStateProvider>) -> Fixture {
        let pool = Arc::new(VecPool::default());
        let relay = Arc::new(RecordingRelay::default());
        let verifier = Arc::new(SignatureTable {
            bad: bad.iter().map(|b| [*b; 32]).collect(),
        });
        let guard = TransactionPoolGuard::new(
            &PeerSyncConfig::for_testing(),
            verifier,
            accounts,
            pool.clone(),
            relay.clone(),
        );
        Fixture { guard, pool, relay }
    }

    #[tokio::test]
    async fn test_valid_batch_admitted_and_relayed() {
        let f = fixture(&[], Arc::new(FlatBalances(1_000)));
        let result = f.guard.process_batch(vec![tx(1, 9, 100), tx(2, 9, 5)]).await.unwrap();
        assert_eq!(result.admitted(), vec![[1u8; 32], [2u8; 32]]);
        assert_eq!(f.pool.txs.lock().len(), 2);
        assert_eq!(*f.relay.relayed.lock(), vec![[1u8; 32]]);
    }

    #[tokio::test]
    async fn test_one_bad_signature_rejects_batch() {
        let f = fixture(&[2], Arc::new(FlatBalances(1_000)));
        let err = f
            .guard
            .process_batch(vec![tx(1, 9, 100), tx(2, 9, 100), tx(3, 8, 100)])
            .await
            .unwrap_err();
        match err {
            PeerSyncError::InvalidTransactions { invalid } => assert_eq!(invalid, vec![[2u8; 32]]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(f.pool.txs.lock().is_empty());
        assert!(f.relay.relayed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_excess_dropped_silently() {
        let f = fixture(&[], Arc::new(FlatBalances(1_000)));
        let batch: Vec<Transaction> = (1..=5).map(|i| tx(i, 9, 100)).collect();
        let result = f.guard.process_batch(batch).await.unwrap();
        assert_eq!(result.admitted().len(), 3);
        assert_eq!(result.excess(), vec![[4u8; 32], [5u8; 32]]);
        assert_eq!(f.guard.validate_batch(&[tx(6, 9, 100)]).await.unwrap().excess(), vec![[6u8; 32]]);
    }

    #[tokio::test]
    async fn test_resubmission_is_invalid() {
        let f = fixture(&[], Arc::new(FlatBalances(1_000)));
        f.guard.process_batch(vec![tx(1, 9, 100)]).await.unwrap();
        let err = f.guard.process_batch(vec![tx(1, 9, 100)]).await.unwrap_err();
        assert!(matches!(err, PeerSyncError::InvalidTransactions { .. }));
        assert_eq!(f.pool.txs.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_balance() {
        let f = fixture(&[], Arc::new(FlatBalances(50)));
        let result = f.guard.validate_batch(&[tx(1, 9, 100)]).await.unwrap();
        assert_eq!(
            result.disposition(&[1u8; 32]),
            Some(&Disposition::Invalid(TxRejection::InsufficientBalance {
                required: 110,
                available: 50
            }))
        );
        assert!(f.pool.txs.lock().is_empty());
    }

    #[tokio::test]
    async fn test_collaborator_failure_is_io() {
        let f = fixture(&[], Arc::new(BrokenAccounts));
        assert!(matches!(
            f.guard.process_batch(vec![tx(1, 9, 100)]).await,
            Err(PeerSyncError::Io(PortError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_oversized_batch_refused_before_checks() {
        // Broken accounts would surface as Io if any check ran.
        let f = fixture(&[], Arc::new(BrokenAccounts));
        let batch: Vec<Transaction> = (1..=11).map(|i| tx(i, i, 100)).collect();
        assert!(matches!(
            f.guard.validate_batch(&batch).await,
            Err(PeerSyncError::BatchTooLarge { size: 11, max: 10 })
        ));
        assert!(matches!(
            f.guard.process_batch(batch).await,
            Err(PeerSyncError::BatchTooLarge { size: 11, max: 10 })
        ));
        assert!(f.pool.txs.lock().is_empty());
        assert!(f.relay.relayed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_batch_at_limit_admitted() {
        let f = fixture(&[], Arc::new(FlatBalances(1_000)));
        let batch: Vec<Transaction> = (1..=10).map(|i| tx(i, i, 100)).collect();
        let result = f.guard.process_batch(batch).await.unwrap();
        assert_eq!(result.admitted().len(), 10);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let f = fixture(&[], Arc::new(FlatBalances(0)));
        assert!(f.guard.process_batch(Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_batches_respect_cap() {
        let f = fixture(&[], Arc::new(FlatBalances(1_000)));
        let guard = Arc::new(f.guard);
        let tasks: Vec<_> = (0..6u8)
            .map(|i| {
                let guard = guard.clone();
                tokio::spawn(async move { guard.process_batch(vec![tx(10 + i, 9, 100)]).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(f.pool.txs.lock().len(), 3);
    }
}
