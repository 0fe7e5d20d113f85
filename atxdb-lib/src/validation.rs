//! Syntactic and contextual validation, and the active-set recount that
//! backs both.

use crate::db::AtxDb;
use crate::error::{AtxDbError, AtxError, ValidationError};
use crate::nipst::InvalidProof;
use protocol::{ActivationTx, EpochId};
use std::collections::HashSet;
use tracing::{debug, error};

impl AtxDb {
    /// Checks that `atx` is self-consistent: its previous-ATX chain, its
    /// positioning reference, its active-set claim against the view, and its
    /// NIPST proof, in that order. The first failure wins. Read-only; takes
    /// no lock beyond individual store reads.
    pub fn syntactically_validate_atx(&self, atx: &ActivationTx) -> Result<(), AtxError> {
        let id = atx.id();

        if !atx.prev_atx_id.is_empty() {
            let prev = match self.get_atx(&atx.prev_atx_id) {
                Ok(prev) => prev,
                Err(AtxDbError::NotFound) => {
                    return Err(ValidationError::PrevAtxNotFound(atx.prev_atx_id).into());
                }
                Err(err) => return Err(err.into()),
            };
            if prev.node_id != atx.node_id {
                return Err(ValidationError::PrevAtxIdentityMismatch {
                    prev: atx.prev_atx_id,
                    prev_node: prev.node_id.key.clone(),
                    node: atx.node_id.key.clone(),
                }
                .into());
            }
            if prev.sequence + 1 != atx.sequence {
                return Err(ValidationError::SequenceNotMonotonic {
                    prev_sequence: prev.sequence,
                    sequence: atx.sequence,
                }
                .into());
            }
        } else if atx.sequence != 0 {
            return Err(ValidationError::NonZeroSequenceWithoutPrev(atx.sequence).into());
        }

        if !atx.positioning_atx_id.is_empty() {
            let pos = match self.get_atx(&atx.positioning_atx_id) {
                Ok(pos) => pos,
                Err(AtxDbError::NotFound) => {
                    return Err(ValidationError::PosAtxNotFound(atx.positioning_atx_id).into());
                }
                Err(err) => return Err(err.into()),
            };
            if pos.publication_layer >= atx.publication_layer {
                return Err(ValidationError::PosAtxNotBefore {
                    layer: atx.publication_layer,
                    pos_layer: pos.publication_layer,
                }
                .into());
            }
            let distance = atx.publication_layer.0 - pos.publication_layer.0;
            if distance > self.layers_per_epoch {
                return Err(ValidationError::PosAtxTooOld {
                    distance,
                    max: self.layers_per_epoch,
                }
                .into());
            }
        } else if !atx.publication_epoch(self.layers_per_epoch).is_genesis() {
            return Err(ValidationError::MissingPosAtx.into());
        }

        let counted = match self.calc_active_set_from_view(atx) {
            Ok(counted) => counted,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                if atx.publication_epoch(self.layers_per_epoch).is_genesis() {
                    debug!(atx = %id.short(), %err, "no active set in a genesis epoch");
                    0
                } else {
                    return Err(match err {
                        AtxError::Db(db) => {
                            ValidationError::ActiveSetCalcFailed(Box::new(db)).into()
                        }
                        invalid @ AtxError::Invalid(_) => invalid,
                    });
                }
            }
        };
        if atx.active_set_size != counted {
            return Err(ValidationError::ActiveSetMismatch {
                declared: atx.active_set_size,
                counted,
            }
            .into());
        }

        let challenge_hash = atx.nipst_challenge().hash();
        let Some(nipst) = &atx.nipst else {
            return Err(
                ValidationError::NipstInvalid(InvalidProof("atx carries no nipst".into())).into(),
            );
        };
        if let Err(proof_err) = self.nipst_validator.validate(nipst, &challenge_hash) {
            return Err(ValidationError::NipstInvalid(proof_err).into());
        }

        debug!(atx = %id.short(), "atx is syntactically valid");
        Ok(())
    }

    /// Checks `atx` against the live store: its previous-ATX reference must
    /// be the identity's current last ATX, and a first ATX must really be
    /// the first.
    pub fn contextually_validate_atx(&self, atx: &ActivationTx) -> Result<(), AtxError> {
        if !atx.prev_atx_id.is_empty() {
            match self.get_node_last_atx_id(&atx.node_id) {
                Ok(last) if last == atx.prev_atx_id => Ok(()),
                Ok(last) => Err(ValidationError::ContextualPrevStale {
                    prev: atx.prev_atx_id,
                    last,
                }
                .into()),
                Err(AtxDbError::NotFound) => Err(ValidationError::ContextualPrevMissing {
                    prev: atx.prev_atx_id,
                }
                .into()),
                Err(err) => Err(err.into()),
            }
        } else {
            match self.get_node_last_atx_id(&atx.node_id) {
                Ok(last) => Err(ValidationError::ContextualDoubleFirst { last }.into()),
                Err(AtxDbError::NotFound) => Ok(()),
                Err(err) => Err(err.into()),
            }
        }
    }

    /// Recounts the preceding epoch's active set over the ATX's view: every
    /// distinct ATX referenced by a counting-epoch block and targeting the
    /// publication epoch counts once. Results are memoized by view hash.
    pub fn calc_active_set_from_view(&self, atx: &ActivationTx) -> Result<u32, AtxError> {
        let pub_epoch = atx.publication_epoch(self.layers_per_epoch);
        if pub_epoch.is_genesis() {
            return Err(ValidationError::GenesisActiveSetUndefined(pub_epoch).into());
        }
        let counting_epoch = EpochId(pub_epoch.0 - 1);
        let first_layer = counting_epoch.first_layer(self.layers_per_epoch);

        let view_hash = atx.view_hash();
        if let Some(count) = self.active_set_cache.get(&view_hash) {
            self.metrics.inc_active_set_cache_hits();
            debug!(atx = %atx.short_id(), "cache hit on active set size");
            return Ok(count);
        }
        self.metrics.inc_active_set_cache_misses();
        debug!(atx = %atx.short_id(), "cache miss on active set size");

        let mut seen = HashSet::new();
        let mut count: u32 = 0;
        self.mesh
            .for_blocks_in_view(&atx.view, first_layer, &mut |block| {
                // Skip blocks outside the counting epoch.
                if block.layer.epoch(self.layers_per_epoch) != counting_epoch {
                    return Ok(());
                }
                for atx_id in &block.atx_ids {
                    if !seen.insert(*atx_id) {
                        continue;
                    }
                    let stored = match self.get_atx(atx_id) {
                        Ok(stored) => stored,
                        Err(AtxDbError::NotFound) => {
                            error!(
                                atx = %atx_id.short(),
                                block = %block.id,
                                "block references an atx missing from the store"
                            );
                            return Err(AtxDbError::InconsistentState(*atx_id));
                        }
                        Err(err) => return Err(err),
                    };
                    let target = stored.target_epoch(self.layers_per_epoch);
                    if target != pub_epoch {
                        debug!(
                            atx = %atx_id.short(),
                            target = %target,
                            publication = %pub_epoch,
                            "atx found but targets a different epoch"
                        );
                        continue;
                    }
                    count += 1;
                }
                Ok(())
            })?;

        self.active_set_cache.insert(view_hash, count);
        Ok(count)
    }
}
