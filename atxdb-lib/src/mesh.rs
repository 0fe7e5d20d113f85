use crate::error::AtxDbError;
use protocol::{AtxId, BlockId, LayerId};
use std::collections::{HashMap, HashSet, VecDeque};

/// A block as the traversal sees it: identity, position, and the ATXs it
/// references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshBlock {
    pub id: BlockId,
    pub layer: LayerId,
    pub atx_ids: Vec<AtxId>,
}

/// The single capability the core consumes from the block DAG: visit every
/// distinct block reachable from `view` via the parent relation whose layer
/// is at or above `start_layer`, exactly once, in unspecified order. An error
/// from `visit` aborts the traversal and is surfaced unchanged.
pub trait MeshView: Send + Sync {
    fn for_blocks_in_view(
        &self,
        view: &[BlockId],
        start_layer: LayerId,
        visit: &mut dyn FnMut(&MeshBlock) -> Result<(), AtxDbError>,
    ) -> Result<(), AtxDbError>;
}

/// In-memory block DAG. Backs the unit tests and small tools; a real node
/// adapts its mesh store to [`MeshView`] instead.
#[derive(Default)]
pub struct MemMesh {
    blocks: HashMap<BlockId, (MeshBlock, Vec<BlockId>)>,
}

impl MemMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, block: MeshBlock, parents: Vec<BlockId>) {
        self.blocks.insert(block.id, (block, parents));
    }
}

impl MeshView for MemMesh {
    fn for_blocks_in_view(
        &self,
        view: &[BlockId],
        start_layer: LayerId,
        visit: &mut dyn FnMut(&MeshBlock) -> Result<(), AtxDbError>,
    ) -> Result<(), AtxDbError> {
        let mut queue: VecDeque<BlockId> = view.iter().copied().collect();
        let mut seen: HashSet<BlockId> = HashSet::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let (block, parents) = self.blocks.get(&id).ok_or(AtxDbError::NotFound)?;
            if block.layer < start_layer {
                continue;
            }
            visit(block)?;
            queue.extend(parents.iter().copied());
        }
        Ok(())
    }
}
