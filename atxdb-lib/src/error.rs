use crate::nipst::InvalidProof;
use crate::store::StoreError;
use protocol::{AtxId, CodecError, EpochId, LayerId};
use thiserror::Error;

/// Lookup, i/o, codec, and consistency failures of the store itself.
#[derive(Debug, Error)]
pub enum AtxDbError {
    /// The requested record does not exist.
    #[error("not found")]
    NotFound,
    #[error("the empty atx id cannot be looked up")]
    EmptyIdRequested,
    #[error("pos atx belongs to epoch {actual}, epoch {requested} was requested")]
    WrongEpoch {
        requested: EpochId,
        actual: EpochId,
    },
    #[error(transparent)]
    Io(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The block DAG references an ATX this node never stored. Unrecoverable:
    /// ingestion must halt rather than keep counting over a broken store.
    #[error("view references atx {0} that is missing from the store")]
    InconsistentState(AtxId),
}

/// Why a candidate ATX was rejected. Every variant is recoverable: the ATX is
/// logged and dropped, never stored.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("previous atx {0} not found")]
    PrevAtxNotFound(AtxId),
    #[error("previous atx {prev} belongs to node {prev_node}, not {node}")]
    PrevAtxIdentityMismatch {
        prev: AtxId,
        prev_node: String,
        node: String,
    },
    #[error("sequence {sequence} does not follow previous sequence {prev_sequence}")]
    SequenceNotMonotonic {
        prev_sequence: u64,
        sequence: u64,
    },
    #[error("no previous atx reported but sequence is {0}, not zero")]
    NonZeroSequenceWithoutPrev(u64),
    #[error("positioning atx {0} not found")]
    PosAtxNotFound(AtxId),
    #[error("publication layer {layer} is not after positioning atx layer {pos_layer}")]
    PosAtxNotBefore {
        layer: LayerId,
        pos_layer: LayerId,
    },
    #[error("positioning atx is {distance} layers back, at most {max} allowed")]
    PosAtxTooOld {
        distance: u64,
        max: u64,
    },
    #[error("no positioning atx outside a genesis epoch")]
    MissingPosAtx,
    #[error("declared active set size {declared} but the view counts {counted}")]
    ActiveSetMismatch {
        declared: u32,
        counted: u32,
    },
    #[error("could not calculate active set from the view")]
    ActiveSetCalcFailed(#[source] Box<AtxDbError>),
    #[error("nipst proof rejected")]
    NipstInvalid(#[source] InvalidProof),
    #[error("active set is undefined for genesis publication epoch {0}")]
    GenesisActiveSetUndefined(EpochId),
    #[error("previous atx {prev} reported but the node has no stored atx")]
    ContextualPrevMissing {
        prev: AtxId,
    },
    #[error("previous atx {prev} is not the node's last atx {last}")]
    ContextualPrevStale {
        prev: AtxId,
        last: AtxId,
    },
    #[error("first atx for a node that already has atx {last} stored")]
    ContextualDoubleFirst {
        last: AtxId,
    },
}

/// Outcome surface of validating or processing one ATX.
#[derive(Debug, Error)]
pub enum AtxError {
    #[error("atx rejected: {0}")]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Db(#[from] AtxDbError),
}

impl AtxError {
    /// True when ingestion must stop instead of skipping to the next ATX.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AtxError::Db(AtxDbError::InconsistentState(_)))
    }
}
