//! Shared fixtures for the unit tests: an in-memory node, a growable mesh,
//! and ATX builders that produce honestly proven transactions.

use crate::config::AtxDbConfig;
use crate::db::AtxDb;
use crate::error::AtxDbError;
use crate::identity::KvIdentityStore;
use crate::mesh::{MemMesh, MeshBlock, MeshView};
use crate::nipst::{ChallengeBoundValidator, InvalidProof, NipstValidator};
use crate::store::MemStore;
use parking_lot::RwLock;
use protocol::{ActivationTx, AtxId, BlockId, LayerId, Nipst, NodeIdentity};
use std::sync::Arc;

pub fn block_id(tag: u8) -> BlockId {
    BlockId([tag; 32])
}

/// Mesh handle the tests keep extending after the db has taken its copy.
#[derive(Clone, Default)]
pub struct SharedMesh(Arc<RwLock<MemMesh>>);

impl SharedMesh {
    pub fn add_block(&self, tag: u8, layer: u64, atx_ids: Vec<AtxId>, parents: Vec<BlockId>) {
        self.0.write().add_block(
            MeshBlock {
                id: block_id(tag),
                layer: LayerId(layer),
                atx_ids,
            },
            parents,
        );
    }
}

impl MeshView for SharedMesh {
    fn for_blocks_in_view(
        &self,
        view: &[BlockId],
        start_layer: LayerId,
        visit: &mut dyn FnMut(&MeshBlock) -> Result<(), AtxDbError>,
    ) -> Result<(), AtxDbError> {
        self.0.read().for_blocks_in_view(view, start_layer, visit)
    }
}

/// Fails every proof; for exercising the rejection path.
pub struct RejectingValidator;

impl NipstValidator for RejectingValidator {
    fn validate(&self, _nipst: &Nipst, _challenge_hash: &protocol::Hash32) -> Result<(), InvalidProof> {
        Err(InvalidProof("rejected by test validator".into()))
    }
}

pub fn test_db(layers_per_epoch: u64) -> (Arc<AtxDb>, SharedMesh) {
    test_db_with(layers_per_epoch, Box::new(ChallengeBoundValidator))
}

pub fn test_db_with(
    layers_per_epoch: u64,
    nipst_validator: Box<dyn NipstValidator>,
) -> (Arc<AtxDb>, SharedMesh) {
    let mesh = SharedMesh::default();
    let db = AtxDb::new(
        Box::new(MemStore::new()),
        Box::new(MemStore::new()),
        Arc::new(KvIdentityStore::new(MemStore::new())),
        Arc::new(mesh.clone()),
        nipst_validator,
        &AtxDbConfig::with_layers_per_epoch(layers_per_epoch),
    );
    (Arc::new(db), mesh)
}

pub fn identity(tag: &str) -> NodeIdentity {
    NodeIdentity::new(tag.to_string(), tag.as_bytes().to_vec())
}

/// An ATX whose NIPST honestly binds its challenge, so it passes the
/// challenge-bound validator unless a test tampers with it.
pub fn build_atx(
    node: &NodeIdentity,
    sequence: u64,
    prev_atx_id: AtxId,
    positioning_atx_id: AtxId,
    publication_layer: u64,
    active_set_size: u32,
    view: Vec<BlockId>,
) -> ActivationTx {
    let mut atx = ActivationTx {
        node_id: node.clone(),
        sequence,
        prev_atx_id,
        positioning_atx_id,
        publication_layer: LayerId(publication_layer),
        start_tick: 0,
        active_set_size,
        view,
        nipst: None,
    };
    let challenge = atx.nipst_challenge().hash();
    atx.nipst = Some(Nipst {
        space: 1 << 20,
        challenge,
        proof: vec![7u8; 32],
    });
    atx
}
