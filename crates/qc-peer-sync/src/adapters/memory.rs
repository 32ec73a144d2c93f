//! In-memory block store and transaction pool.
//!
//! Used by tests and by single-process setups that keep recent history in
//! memory.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Block, CommonBlock, Hash, PublicKey, Transaction};

use crate::domain::PortError;
use crate::ports::{BlockStore, TransactionPool};

#[derive(Debug, Default)]
struct StoredChain {
    by_height: BTreeMap<u64, Block>,
    height_of: HashMap<Hash, u64>,
}

/// Block history keyed by height.
#[derive(Debug, Default)]
pub struct InMemoryBlockStore {
    chain: RwLock<StoredChain>,
}

impl InMemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        let store = Self::new();
        for block in blocks {
            store.insert(block);
        }
        store
    }

    /// Store `block`, replacing any block at the same height.
    pub fn insert(&self, block: Block) {
        let mut chain = self.chain.write();
        if let Some(old) = chain.by_height.remove(&block.height) {
            chain.height_of.remove(&old.id);
        }
        chain.height_of.insert(block.id, block.height);
        chain.by_height.insert(block.height, block);
    }

    pub fn tip(&self) -> Option<Block> {
        self.chain.read().by_height.values().next_back().cloned()
    }

    pub fn len(&self) -> usize {
        self.chain.read().by_height.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlockStore for InMemoryBlockStore {
    async fn read_blocks_from(&self, height: u64, limit: u32) -> Result<Vec<Block>, PortError> {
        let chain = self.chain.read();
        let mut blocks = Vec::new();
        let mut expected = height;
        for (h, block) in chain.by_height.range(height..).take(usize::try_from(limit).unwrap_or(usize::MAX)) {
            // A gap ends the page; pages are always consecutive.
            if *h != expected {
                break;
            }
            blocks.push(block.clone());
            expected += 1;
        }
        Ok(blocks)
    }

    async fn read_common_blocks(&self, ids: &[Hash]) -> Result<Vec<CommonBlock>, PortError> {
        let chain = self.chain.read();
        Ok(ids
            .iter()
            .filter_map(|id| chain.height_of.get(id))
            .filter_map(|h| chain.by_height.get(h))
            .map(Block::common)
            .collect())
    }
}

#[derive(Debug, Default)]
struct PoolState {
    by_id: HashMap<Hash, Transaction>,
    order: Vec<Hash>,
    per_sender: HashMap<PublicKey, usize>,
}

/// Pending transactions in admission order.
#[derive(Debug, Default)]
pub struct InMemoryTransactionPool {
    state: RwLock<PoolState>,
}

impl InMemoryTransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop transactions that were included in a block.
    pub fn remove(&self, ids: &[Hash]) {
        let mut state = self.state.write();
        for id in ids {
            if let Some(tx) = state.by_id.remove(id) {
                if let Some(count) = state.per_sender.get_mut(&tx.sender_public_key) {
                    *count = count.saturating_sub(1);
                }
            }
        }
        let PoolState { by_id, order, .. } = &mut *state;
        order.retain(|id| by_id.contains_key(id));
    }

    /// Pending ids in admission order.
    pub fn ids(&self) -> Vec<Hash> {
        self.state.read().order.clone()
    }

    pub fn get(&self, id: &Hash) -> Option<Transaction> {
        self.state.read().by_id.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransactionPool for InMemoryTransactionPool {
    fn contains(&self, id: &Hash) -> bool {
        self.state.read().by_id.contains_key(id)
    }

    fn pending_count(&self, sender: &PublicKey) -> usize {
        self.state.read().per_sender.get(sender).copied().unwrap_or(0)
    }

    fn admit(&self, transactions: Vec<Transaction>) -> Result<(), PortError> {
        let mut state = self.state.write();
        for tx in transactions {
            if state.by_id.contains_key(&tx.id) {
                continue;
            }
            *state.per_sender.entry(tx.sender_public_key).or_default() += 1;
            state.order.push(tx.id);
            state.by_id.insert(tx.id, tx);
        }
        Ok(())
    }
}
