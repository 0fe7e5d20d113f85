//! The two read accelerators of the ATX-DB.
//!
//! Both are owned by the database instance so that several nodes can live in
//! one process without sharing state.

use crate::fifo_cache::FifoCache;
use lru::LruCache;
use parking_lot::Mutex;
use protocol::{ActivationTx, AtxId, Hash32};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Decoded-ATX LRU capacity, matching the read fan-out of the consensus
/// paths.
pub const ATX_CACHE_CAPACITY: usize = 350;

/// Default capacity of the active-set cache.
pub const ACTIVE_SET_CACHE_CAPACITY: usize = 1024;

/// Active-set sizes keyed by view hash. An entry is a pure function of the
/// view and the DAG below it, so eviction can never surface a stale value.
pub struct ActiveSetCache {
    inner: Mutex<FifoCache<Hash32, u32>>,
}

impl ActiveSetCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(FifoCache::new(capacity)),
        }
    }

    pub fn get(&self, view_hash: &Hash32) -> Option<u32> {
        self.inner.lock().get(view_hash).copied()
    }

    pub fn insert(&self, view_hash: Hash32, size: u32) {
        self.inner.lock().insert(view_hash, size);
    }
}

/// Bounded LRU of decoded ATX bodies. Hits hand out `Arc` snapshots of
/// immutable records without touching the store locks.
pub struct AtxCache {
    inner: Mutex<LruCache<AtxId, Arc<ActivationTx>>>,
}

impl AtxCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, id: &AtxId) -> Option<Arc<ActivationTx>> {
        self.inner.lock().get(id).cloned()
    }

    pub fn insert(&self, id: AtxId, atx: Arc<ActivationTx>) {
        self.inner.lock().put(id, atx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{EMPTY_ATX_ID, LayerId, NodeIdentity};

    fn atx(layer: u64) -> Arc<ActivationTx> {
        Arc::new(ActivationTx {
            node_id: NodeIdentity::new("ab", Vec::new()),
            sequence: 0,
            prev_atx_id: EMPTY_ATX_ID,
            positioning_atx_id: EMPTY_ATX_ID,
            publication_layer: LayerId(layer),
            start_tick: 0,
            active_set_size: 0,
            view: Vec::new(),
            nipst: None,
        })
    }

    #[test]
    fn active_set_cache_keeps_first_value() {
        let cache = ActiveSetCache::new(4);
        cache.insert([1u8; 32], 10);
        cache.insert([1u8; 32], 99);
        assert_eq!(cache.get(&[1u8; 32]), Some(10));
        assert_eq!(cache.get(&[2u8; 32]), None);
    }

    #[test]
    fn atx_cache_evicts_least_recently_used() {
        let cache = AtxCache::new(2);
        let (a, b, c) = (atx(1), atx(2), atx(3));
        let (ida, idb, idc) = (a.id(), b.id(), c.id());
        cache.insert(ida, a);
        cache.insert(idb, b);
        // Touch `a` so `b` is the eviction candidate.
        assert!(cache.get(&ida).is_some());
        cache.insert(idc, c);
        assert!(cache.get(&ida).is_some());
        assert!(cache.get(&idb).is_none());
        assert!(cache.get(&idc).is_some());
    }

    #[test]
    fn atx_cache_hits_share_one_record() {
        let cache = AtxCache::new(2);
        let a = atx(1);
        cache.insert(a.id(), a.clone());
        let hit = cache.get(&a.id()).unwrap();
        assert!(Arc::ptr_eq(&a, &hit));
    }
}
