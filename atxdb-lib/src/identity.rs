use crate::error::AtxDbError;
use crate::store::KvStore;
use protocol::{NodeIdentity, decode, encode};

/// First-seen registry of node identities.
pub trait IdentityStore: Send + Sync {
    /// Idempotent on `identity.key`; durable once it returns.
    fn store_identity(&self, identity: &NodeIdentity) -> Result<(), AtxDbError>;
    /// `NotFound` when the key has never been seen.
    fn get_identity(&self, key: &str) -> Result<NodeIdentity, AtxDbError>;
}

/// Identity registry over a byte-keyed store, keyed by the utf-8 signing key.
pub struct KvIdentityStore<S> {
    store: S,
}

impl<S: KvStore> KvIdentityStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: KvStore> IdentityStore for KvIdentityStore<S> {
    fn store_identity(&self, identity: &NodeIdentity) -> Result<(), AtxDbError> {
        let key = identity.key.as_bytes();
        if self.store.has(key)? {
            return Ok(());
        }
        self.store.put(key, &encode(identity))?;
        Ok(())
    }

    fn get_identity(&self, key: &str) -> Result<NodeIdentity, AtxDbError> {
        match self.store.get(key.as_bytes())? {
            Some(bytes) => Ok(decode(&bytes)?),
            None => Err(AtxDbError::NotFound),
        }
    }
}
