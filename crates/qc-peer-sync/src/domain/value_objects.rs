//! Value objects and protocol constants.

use std::collections::{HashSet, VecDeque};

use shared_types::Hash;

/// Blocks returned per `getBlocks` page. Fixed by the protocol.
pub const BLOCKS_PAGE_SIZE: u32 = 400;

/// Bounded FIFO of block ids recently handed to the ledger.
///
/// Not synchronized on its own; the ingestion pipeline keeps it inside its
/// critical section.
#[derive(Debug)]
pub struct RecentBlockCache {
    ids: HashSet<Hash>,
    order: VecDeque<Hash>,
    max_size: usize,
}

impl RecentBlockCache {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            ids: HashSet::with_capacity(max_size),
            order: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    pub fn contains(&self, id: &Hash) -> bool {
        self.ids.contains(id)
    }

    /// Remember an id, evicting the oldest when full.
    pub fn insert(&mut self, id: Hash) {
        if !self.ids.insert(id) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut cache = RecentBlockCache::new(4);
        cache.insert([1u8; 32]);
        assert!(cache.contains(&[1u8; 32]));
        assert!(!cache.contains(&[2u8; 32]));
    }

    #[test]
    fn test_evicts_oldest() {
        let mut cache = RecentBlockCache::new(2);
        cache.insert([1u8; 32]);
        cache.insert([2u8; 32]);
        cache.insert([3u8; 32]);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&[1u8; 32]));
        assert!(cache.contains(&[3u8; 32]));
    }

    #[test]
    fn test_reinsert_does_not_duplicate() {
        let mut cache = RecentBlockCache::new(2);
        cache.insert([1u8; 32]);
        cache.insert([1u8; 32]);
        cache.insert([2u8; 32]);
        assert!(cache.contains(&[1u8; 32]));
        assert_eq!(cache.len(), 2);
    }
}
