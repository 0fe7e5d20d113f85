//! Byte-keyed stores behind the [`KvStore`] seam.
//!
//! The core only ever needs point lookups and puts, so the trait stays at
//! get/put/has. `FjallStore` wraps one fjall partition per logical store;
//! `MemStore` backs unit tests.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Failure inside a backing store. Key absence is not an error; lookups
/// return `None`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("keyspace i/o: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<fjall::Error> for StoreError {
    fn from(err: fjall::Error) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Minimal byte-keyed store consumed by every index in the crate.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
    fn has(&self, key: &[u8]) -> Result<bool, StoreError>;
}

/// One fjall partition as a [`KvStore`].
#[derive(Clone)]
pub struct FjallStore(fjall::PartitionHandle);

impl FjallStore {
    pub fn new(keyspace: &fjall::Keyspace, name: &str) -> Result<Self, StoreError> {
        Ok(Self(keyspace.open_partition(
            name,
            fjall::PartitionCreateOptions::default(),
        )?))
    }
}

impl KvStore for FjallStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.0.get(key)?.map(|slice| slice.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        Ok(self.0.insert(key, value)?)
    }

    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.0.contains_key(key)?)
    }
}

/// Heap-backed store for tests and tools.
#[derive(Default)]
pub struct MemStore(RwLock<BTreeMap<Vec<u8>, Vec<u8>>>);

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.0.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.0.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.0.read().contains_key(key))
    }
}

/// The persistent stores of one node, all under one keyspace.
pub struct Stores {
    pub keyspace: fjall::Keyspace,
    pub atxs: FjallStore,
    pub nipsts: FjallStore,
    pub identities: FjallStore,
}

/// Opens (or creates) the keyspace at `root` with one partition per logical
/// store.
pub fn open_stores(root: &Path) -> Result<Stores, StoreError> {
    let keyspace = fjall::Config::new(root).open()?;
    let atxs = FjallStore::new(&keyspace, "atxs")?;
    let nipsts = FjallStore::new(&keyspace, "nipsts")?;
    let identities = FjallStore::new(&keyspace, "identities")?;
    Ok(Stores {
        keyspace,
        atxs,
        nipsts,
        identities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(store: &dyn KvStore) {
        assert_eq!(store.get(b"missing").unwrap(), None);
        assert!(!store.has(b"missing").unwrap());

        store.put(b"k", b"v1").unwrap();
        assert!(store.has(b"k").unwrap());
        assert_eq!(store.get(b"k").unwrap().as_deref(), Some(&b"v1"[..]));

        store.put(b"k", b"v2").unwrap();
        assert_eq!(store.get(b"k").unwrap().as_deref(), Some(&b"v2"[..]));
    }

    #[test]
    fn mem_store_basics() {
        exercise(&MemStore::new());
    }

    #[test]
    fn fjall_store_basics() {
        let dir = TempDir::new().unwrap();
        let stores = open_stores(dir.path()).unwrap();
        exercise(&stores.atxs);
    }

    #[test]
    fn partitions_are_disjoint() {
        let dir = TempDir::new().unwrap();
        let stores = open_stores(dir.path()).unwrap();
        stores.atxs.put(b"k", b"atx").unwrap();
        stores.nipsts.put(b"k", b"nipst").unwrap();
        assert_eq!(stores.atxs.get(b"k").unwrap().as_deref(), Some(&b"atx"[..]));
        assert_eq!(
            stores.nipsts.get(b"k").unwrap().as_deref(),
            Some(&b"nipst"[..])
        );
        assert!(!stores.identities.has(b"k").unwrap());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let stores = open_stores(dir.path()).unwrap();
            stores.atxs.put(b"durable", b"yes").unwrap();
            stores.keyspace.persist(fjall::PersistMode::SyncAll).unwrap();
        }
        let stores = open_stores(dir.path()).unwrap();
        assert_eq!(
            stores.atxs.get(b"durable").unwrap().as_deref(),
            Some(&b"yes"[..])
        );
    }
}
