//! The activation-transaction database: one instance per node.
//!
//! Writers serialize behind a process mutex and an exclusive index lock;
//! readers take the index lock shared, or skip it entirely on ATX cache hits.

use crate::cache::{ActiveSetCache, AtxCache};
use crate::config::AtxDbConfig;
use crate::error::{AtxDbError, AtxError};
use crate::identity::IdentityStore;
use crate::mesh::MeshView;
use crate::metrics::{Metrics, SharedMetrics};
use crate::nipst::NipstValidator;
use crate::schema::{self, AtxBodyKey, EpochCounterKey, POS_ATX_KEY, PosAtxRecord};
use crate::store::KvStore;
use parking_lot::{Mutex, RwLock};
use protocol::{ActivationTx, AtxId, EpochId, LayerId, decode, encode};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct AtxDb {
    /// ATX bodies plus every index (last-atx pointers, epoch counters, the
    /// positioning-ATX record).
    pub(crate) atxs: RwLock<Box<dyn KvStore>>,
    /// NIPST blobs, keyed by ATX id. Locked narrowly around blob access.
    pub(crate) nipsts: RwLock<Box<dyn KvStore>>,
    pub(crate) atx_cache: AtxCache,
    pub(crate) active_set_cache: ActiveSetCache,
    pub(crate) identities: Arc<dyn IdentityStore>,
    pub(crate) mesh: Arc<dyn MeshView>,
    pub(crate) nipst_validator: Box<dyn NipstValidator>,
    pub(crate) layers_per_epoch: u64,
    pub(crate) metrics: SharedMetrics,
    /// Serializes whole validate-and-commit sequences, coarser than the
    /// index lock, so two ATXs from one identity cannot race on the
    /// last-ATX pointer.
    process_lock: Mutex<()>,
}

impl AtxDb {
    pub fn new(
        atxs: Box<dyn KvStore>,
        nipsts: Box<dyn KvStore>,
        identities: Arc<dyn IdentityStore>,
        mesh: Arc<dyn MeshView>,
        nipst_validator: Box<dyn NipstValidator>,
        config: &AtxDbConfig,
    ) -> Self {
        Self {
            atxs: RwLock::new(atxs),
            nipsts: RwLock::new(nipsts),
            atx_cache: AtxCache::new(config.atx_cache_capacity),
            active_set_cache: ActiveSetCache::new(config.active_set_cache_capacity),
            identities,
            mesh,
            nipst_validator,
            layers_per_epoch: config.layers_per_epoch,
            metrics: Arc::new(Metrics::default()),
            process_lock: Mutex::new(()),
        }
    }

    pub fn layers_per_epoch(&self) -> u64 {
        self.layers_per_epoch
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Contextually validates `atx` against the accumulated history, then
    /// commits it and records its identity. Replaying an already stored ATX
    /// is a no-op. The ATX must already be syntactically valid.
    pub fn process_atx(&self, atx: ActivationTx) -> Result<AtxId, AtxError> {
        let _serialized = self.process_lock.lock();

        let id = atx.id();
        self.metrics.inc_processed();
        if self.has_atx(&id)? {
            debug!(atx = %id.short(), "atx already in the store");
            return Ok(id);
        }

        let epoch = atx.target_epoch(self.layers_per_epoch);
        info!(
            atx = %id.short(),
            epoch = %epoch,
            node = atx.node_id.short(),
            layer = %atx.publication_layer,
            "processing atx"
        );
        if let Err(err) = self.contextually_validate_atx(&atx) {
            warn!(atx = %id.short(), %err, "atx failed contextual validation");
            return Err(err);
        }
        debug!(atx = %id.short(), "atx is contextually valid");

        let mut atx = atx;
        self.store_atx(epoch, &mut atx)?;

        if let Err(err) = self.identities.store_identity(&atx.node_id) {
            error!(
                node = atx.node_id.short(),
                atx = %id.short(),
                %err,
                "cannot store node identity"
            );
        }
        Ok(id)
    }

    /// Commits `atx` under `epoch` and updates every index. Idempotent for an
    /// id that is already stored. All steps after the NIPST blob run under
    /// the exclusive index lock, so shared-lock readers can never observe the
    /// last-ATX pointer ahead of the body. A failed step leaves the earlier
    /// writes in place and surfaces the error.
    pub fn store_atx(&self, epoch: EpochId, atx: &mut ActivationTx) -> Result<(), AtxDbError> {
        let id = atx.id();
        let atxs = self.atxs.write();

        if atxs.has(bytemuck::bytes_of(&AtxBodyKey::new(id)))? {
            return Ok(());
        }

        if let Some(nipst) = atx.nipst.take() {
            let nipsts = self.nipsts.write();
            nipsts.put(id.as_bytes(), &encode(&nipst))?;
        }
        atxs.put(bytemuck::bytes_of(&AtxBodyKey::new(id)), &encode(&*atx))?;

        self.update_pos_atx_if_needed(&**atxs, &id, atx.publication_layer)?;
        self.inc_valid_atx_counter(&**atxs, epoch)?;
        self.add_atx_to_node(&**atxs, atx, &id)?;

        self.metrics.inc_stored();
        debug!(atx = %id.short(), epoch = %epoch, "finished storing atx");
        Ok(())
    }

    fn update_pos_atx_if_needed(
        &self,
        store: &dyn KvStore,
        id: &AtxId,
        layer: LayerId,
    ) -> Result<(), AtxDbError> {
        if let Some(bytes) = store.get(POS_ATX_KEY)? {
            let current = PosAtxRecord::decode(&bytes)?;
            if current.layer() >= layer {
                return Ok(());
            }
        }
        let record = PosAtxRecord::new(*id, layer);
        store.put(POS_ATX_KEY, bytemuck::bytes_of(&record))?;
        Ok(())
    }

    fn inc_valid_atx_counter(
        &self,
        store: &dyn KvStore,
        epoch: EpochId,
    ) -> Result<(), AtxDbError> {
        let key = EpochCounterKey::new(epoch);
        let next = match store.get(bytemuck::bytes_of(&key))? {
            Some(bytes) => schema::decode_counter(&bytes)? + 1,
            None => 1,
        };
        debug!(epoch = %epoch, counter = next, "incrementing epoch atx counter");
        store.put(bytemuck::bytes_of(&key), &next.to_le_bytes())?;
        Ok(())
    }

    /// Repoints the node's last-ATX pointer. An incoming ATX older than the
    /// recorded one keeps the pointer where it is; equal layers stay
    /// last-writer-wins.
    fn add_atx_to_node(
        &self,
        store: &dyn KvStore,
        atx: &ActivationTx,
        id: &AtxId,
    ) -> Result<(), AtxDbError> {
        let key = atx.node_id.key.as_bytes();
        if let Some(bytes) = store.get(key)? {
            let last = schema::decode_atx_id(&bytes)?;
            if let Some(body) = store.get(bytemuck::bytes_of(&AtxBodyKey::new(last)))? {
                let last_atx: ActivationTx = decode(&body)?;
                if last_atx.publication_layer > atx.publication_layer {
                    debug!(
                        node = atx.node_id.short(),
                        atx = %id.short(),
                        "incoming atx is older than the recorded last atx"
                    );
                    return Ok(());
                }
            }
        }
        store.put(key, id.as_bytes())?;
        Ok(())
    }
}
