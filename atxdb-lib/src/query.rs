//! Thread-safe read paths. Everything here takes the index lock shared;
//! ATX cache hits skip it entirely.

use crate::db::AtxDb;
use crate::error::AtxDbError;
use crate::schema::{self, AtxBodyKey, EpochCounterKey, POS_ATX_KEY, PosAtxRecord};
use protocol::{ActivationTx, AtxId, EMPTY_ATX_ID, EpochId, LayerId, Nipst, NodeIdentity, decode};
use std::sync::Arc;
use tracing::{debug, warn};

impl AtxDb {
    pub fn has_atx(&self, id: &AtxId) -> Result<bool, AtxDbError> {
        let atxs = self.atxs.read();
        Ok(atxs.has(bytemuck::bytes_of(&AtxBodyKey::new(*id)))?)
    }

    /// Fetches the ATX body by id, through the LRU. The returned record is
    /// immutable and shared; its NIPST is always detached.
    pub fn get_atx(&self, id: &AtxId) -> Result<Arc<ActivationTx>, AtxDbError> {
        if id.is_empty() {
            return Err(AtxDbError::EmptyIdRequested);
        }
        if let Some(atx) = self.atx_cache.get(id) {
            self.metrics.inc_atx_cache_hits();
            return Ok(atx);
        }
        let bytes = {
            let atxs = self.atxs.read();
            atxs.get(bytemuck::bytes_of(&AtxBodyKey::new(*id)))?
        };
        let Some(bytes) = bytes else {
            return Err(AtxDbError::NotFound);
        };
        let atx: ActivationTx = decode(&bytes)?;
        let atx = Arc::new(atx);
        self.atx_cache.insert(*id, Arc::clone(&atx));
        Ok(atx)
    }

    /// Fetches the proof blob written for `id`.
    pub fn get_nipst(&self, id: &AtxId) -> Result<Nipst, AtxDbError> {
        let bytes = {
            let nipsts = self.nipsts.read();
            nipsts.get(id.as_bytes())?
        };
        match bytes {
            Some(bytes) => Ok(decode(&bytes)?),
            None => Err(AtxDbError::NotFound),
        }
    }

    /// The id of the most recent ATX accepted for `node`.
    pub fn get_node_last_atx_id(&self, node: &NodeIdentity) -> Result<AtxId, AtxDbError> {
        self.last_atx_id_for_key(&node.key)
    }

    pub(crate) fn last_atx_id_for_key(&self, key: &str) -> Result<AtxId, AtxDbError> {
        let bytes = {
            let atxs = self.atxs.read();
            atxs.get(key.as_bytes())?
        };
        match bytes {
            Some(bytes) => Ok(schema::decode_atx_id(&bytes)?),
            None => Err(AtxDbError::NotFound),
        }
    }

    /// The number of ATXs accepted whose target epoch is `epoch`.
    pub fn active_set_size(&self, epoch: EpochId) -> Result<u32, AtxDbError> {
        let key = EpochCounterKey::new(epoch);
        let bytes = {
            let atxs = self.atxs.read();
            atxs.get(bytemuck::bytes_of(&key))?
        };
        match bytes {
            Some(bytes) => Ok(schema::decode_counter(&bytes)?),
            None => Err(AtxDbError::NotFound),
        }
    }

    /// The best known positioning ATX, provided it was published during
    /// `epoch`.
    pub fn get_pos_atx_id(&self, epoch: EpochId) -> Result<AtxId, AtxDbError> {
        let bytes = {
            let atxs = self.atxs.read();
            atxs.get(POS_ATX_KEY)?
        };
        let Some(bytes) = bytes else {
            return Err(AtxDbError::NotFound);
        };
        let record = PosAtxRecord::decode(&bytes)?;
        let actual = record.layer().epoch(self.layers_per_epoch);
        if actual != epoch {
            return Err(AtxDbError::WrongEpoch {
                requested: epoch,
                actual,
            });
        }
        Ok(record.atx_id())
    }

    /// Whether the identity behind `ed_key` holds eligibility for the epoch
    /// of `layer`, and through which ATX. An unknown identity or a missing
    /// ATX means "inactive", not an error; only the last-ATX index failing
    /// is surfaced.
    pub fn is_identity_active(
        &self,
        ed_key: &str,
        layer: LayerId,
    ) -> Result<(bool, AtxId), AtxDbError> {
        let epoch = layer.epoch(self.layers_per_epoch);
        // Everyone is eligible during genesis.
        if epoch.is_genesis() {
            return Ok((true, EMPTY_ATX_ID));
        }

        let identity = match self.identities.get_identity(ed_key) {
            Ok(identity) => identity,
            Err(err) => {
                debug!(key = ed_key, %err, "no identity on record, treating as inactive");
                return Ok((false, EMPTY_ATX_ID));
            }
        };
        let atx_id = self.get_node_last_atx_id(&identity)?;
        let mut atx = match self.get_atx(&atx_id) {
            Ok(atx) => atx,
            Err(err) => {
                warn!(atx = %atx_id.short(), %err, "last atx id points at an unreadable atx");
                return Ok((false, EMPTY_ATX_ID));
            }
        };

        let target = atx.target_epoch(self.layers_per_epoch);
        if target < epoch {
            debug!(
                node = identity.short(),
                expected = %epoch,
                actual = %target,
                "latest atx is too old"
            );
            return Ok((false, EMPTY_ATX_ID));
        }
        if target > epoch {
            // The next epoch's ATX is already out; judge by its predecessor.
            if atx.prev_atx_id.is_empty() {
                debug!(
                    node = identity.short(),
                    "latest atx is too new and has no predecessor"
                );
                return Ok((false, EMPTY_ATX_ID));
            }
            let prev_id = atx.prev_atx_id;
            atx = match self.get_atx(&prev_id) {
                Ok(prev) => prev,
                Err(err) => {
                    warn!(atx = %prev_id.short(), %err, "could not fetch second-newest atx");
                    return Ok((false, EMPTY_ATX_ID));
                }
            };
        }

        Ok((atx.target_epoch(self.layers_per_epoch) == epoch, atx.id()))
    }
}
