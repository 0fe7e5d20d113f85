use ringmap::RingMap;

/// Fixed-capacity map with first-in-first-out eviction. Inserting a key that
/// is already present is a no-op, so concurrent recomputations of the same
/// entry cannot reorder the eviction queue.
pub struct FifoCache<K, V> {
    map: RingMap<K, V>,
}

impl<K: std::hash::Hash + Eq, V> FifoCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: RingMap::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, key: K, value: V) -> bool {
        if self.map.contains_key(&key) {
            return false;
        }

        if self.map.len() == self.map.capacity() {
            self.map.pop_front();
        }

        self.map.insert(key, value);
        true
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut cache = FifoCache::new(2);
        assert!(cache.insert("a", 1));
        assert!(cache.insert("b", 2));
        assert!(cache.insert("c", 3));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(&2));
        assert_eq!(cache.get(&"c"), Some(&3));
    }

    #[test]
    fn reinsert_is_a_no_op() {
        let mut cache = FifoCache::new(2);
        cache.insert("a", 1);
        assert!(!cache.insert("a", 9));
        assert_eq!(cache.get(&"a"), Some(&1));
    }
}
