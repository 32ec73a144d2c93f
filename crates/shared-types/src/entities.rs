//! # Core Domain Entities
//!
//! Wire-level entities exchanged with peers and handed to the ledger.
//!
//! ## Clusters
//!
//! - **Chain**: `Block`, `BlockHeader`, `CommonBlock`
//! - **Transactions**: `Transaction`, `TransactionType`
//!
//! Ids are 32-byte hashes. Computing them is the job of the crypto
//! collaborator; these types only carry them.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte hash used as block and transaction id.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// A block as received from a peer or read back from storage.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block id.
    pub id: Hash,
    /// Height in the chain; genesis is 1.
    pub height: u64,
    /// Id of the parent block. `None` only for genesis.
    pub previous_block: Option<Hash>,
    /// Unix timestamp (seconds) claimed by the generator.
    pub timestamp: u64,
    /// Public key of the forger that produced the block.
    pub generator_public_key: PublicKey,
    /// Generator signature over the header.
    #[serde_as(as = "Bytes")]
    pub block_signature: Signature,
    /// Ordered transactions carried by the block.
    pub transactions: Vec<Transaction>,
}

fn saturating_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl Block {
    /// Header view of this block.
    pub fn header(&self) -> BlockHeader {
        let (total_amount, total_fee) = self.transactions.iter().fold((0u64, 0u64), |acc, tx| {
            (acc.0.saturating_add(tx.amount), acc.1.saturating_add(tx.fee))
        });
        BlockHeader {
            id: self.id,
            height: self.height,
            previous_block: self.previous_block,
            timestamp: self.timestamp,
            generator_public_key: self.generator_public_key,
            block_signature: self.block_signature,
            number_of_transactions: saturating_count(self.transactions.len()),
            total_amount,
            total_fee,
        }
    }

    /// The `(id, height, previous)` triple used in ancestry answers.
    pub fn common(&self) -> CommonBlock {
        CommonBlock {
            id: self.id,
            height: self.height,
            previous_block: self.previous_block,
        }
    }
}

/// Header of a block, without its transactions.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub id: Hash,
    pub height: u64,
    pub previous_block: Option<Hash>,
    pub timestamp: u64,
    pub generator_public_key: PublicKey,
    #[serde_as(as = "Bytes")]
    pub block_signature: Signature,
    pub number_of_transactions: u32,
    pub total_amount: u64,
    pub total_fee: u64,
}

/// Minimal block identity returned for common-ancestor queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonBlock {
    pub id: Hash,
    pub height: u64,
    pub previous_block: Option<Hash>,
}

// =============================================================================
// CLUSTER B: TRANSACTIONS
// =============================================================================

/// Known transaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Transfer,
    SecondSignature,
    Delegate,
    Vote,
    Multisignature,
}

impl TryFrom<u8> for TransactionType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Transfer),
            1 => Ok(Self::SecondSignature),
            2 => Ok(Self::Delegate),
            3 => Ok(Self::Vote),
            4 => Ok(Self::Multisignature),
            other => Err(other),
        }
    }
}

/// A signed transaction as submitted by a peer, before pool admission.
///
/// The type travels as a raw byte so that unknown types survive decoding and
/// are rejected by validation instead of by the transport.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id.
    pub id: Hash,
    /// Public key of the sender account.
    pub sender_public_key: PublicKey,
    /// Raw type tag, see [`TransactionType`].
    #[serde(rename = "type")]
    pub tx_type: u8,
    /// Fee paid to the forger, in base units.
    pub fee: u64,
    /// Amount transferred, in base units.
    pub amount: u64,
    /// Unix timestamp (seconds) set by the sender.
    pub timestamp: u64,
    /// Sender signature over the transaction body.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
    /// Optional free-form data attached by wallets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_data: Option<String>,
}

impl Transaction {
    /// Decoded type tag, or the raw value if unknown.
    pub fn kind(&self) -> Result<TransactionType, u8> {
        TransactionType::try_from(self.tx_type)
    }

    /// `amount + fee`, or `None` on overflow.
    pub fn total_spend(&self) -> Option<u64> {
        self.amount.checked_add(self.fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(amount: u64, fee: u64) -> Transaction {
        Transaction {
            id: [1u8; 32],
            sender_public_key: [2u8; 32],
            tx_type: 0,
            fee,
            amount,
            timestamp: 0,
            signature: [0u8; 64],
            vendor_data: None,
        }
    }

    #[test]
    fn test_transaction_count_saturates() {
        assert_eq!(saturating_count(3), 3);
        assert_eq!(saturating_count(usize::MAX), u32::MAX);
    }

    #[test]
    fn test_header_totals() {
        let block = Block {
            id: [9u8; 32],
            height: 7,
            previous_block: Some([8u8; 32]),
            timestamp: 100,
            generator_public_key: [3u8; 32],
            block_signature: [4u8; 64],
            transactions: vec![tx(10, 1), tx(20, 2)],
        };
        let header = block.header();
        assert_eq!(header.number_of_transactions, 2);
        assert_eq!(header.total_amount, 30);
        assert_eq!(header.total_fee, 3);
        assert_eq!(block.common().previous_block, Some([8u8; 32]));
    }

    #[test]
    fn test_transaction_kind() {
        let mut t = tx(1, 1);
        assert_eq!(t.kind(), Ok(TransactionType::Transfer));
        t.tx_type = 42;
        assert_eq!(t.kind(), Err(42));
    }

    #[test]
    fn test_total_spend_overflow() {
        assert_eq!(tx(u64::MAX, 1).total_spend(), None);
        assert_eq!(tx(5, 1).total_spend(), Some(6));
    }

    #[test]
    fn test_transaction_json_uses_type_key() {
        let json = serde_json::to_value(tx(1, 1)).unwrap();
        assert_eq!(json["type"], 0);
        assert!(json.get("vendor_data").is_none());
    }
}
