use crate::codec::{
    Codec, CodecError, Reader, encode, put_array32, put_bytes, put_str, put_u8, put_u32, put_u64,
};
use crate::types::{AtxId, BlockId, EpochId, Hash32, LayerId, NodeIdentity, hash_bytes};

const NIPST_ABSENT: u8 = 0;
const NIPST_PRESENT: u8 = 1;

/// Non-interactive proof of space-time. Large, so the store keeps it in a
/// separate blob store and the ATX id never covers it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nipst {
    /// Committed space in bytes.
    pub space: u64,
    /// The challenge hash this proof was generated against.
    pub challenge: Hash32,
    pub proof: Vec<u8>,
}

impl Codec for Nipst {
    fn encode_into(&self, out: &mut Vec<u8>) {
        put_u64(out, self.space);
        put_array32(out, &self.challenge);
        put_bytes(out, &self.proof);
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            space: reader.u64()?,
            challenge: reader.array32()?,
            proof: reader.bytes()?,
        })
    }
}

/// The fields whose hash seeds the NIPST proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NipstChallenge {
    pub node_id: NodeIdentity,
    pub sequence: u64,
    pub prev_atx_id: AtxId,
    pub publication_layer: LayerId,
    pub start_tick: u64,
    pub positioning_atx_id: AtxId,
}

impl NipstChallenge {
    pub fn hash(&self) -> Hash32 {
        hash_bytes(&encode(self))
    }
}

impl Codec for NipstChallenge {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.node_id.encode_into(out);
        put_u64(out, self.sequence);
        put_array32(out, self.prev_atx_id.as_bytes());
        put_u64(out, self.publication_layer.0);
        put_u64(out, self.start_tick);
        put_array32(out, self.positioning_atx_id.as_bytes());
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            node_id: NodeIdentity::decode_from(reader)?,
            sequence: reader.u64()?,
            prev_atx_id: AtxId(reader.array32()?),
            publication_layer: LayerId(reader.u64()?),
            start_tick: reader.u64()?,
            positioning_atx_id: AtxId(reader.array32()?),
        })
    }
}

impl Codec for NodeIdentity {
    fn encode_into(&self, out: &mut Vec<u8>) {
        put_str(out, &self.key);
        put_bytes(out, &self.vrf_public_key);
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            key: reader.string()?,
            vrf_public_key: reader.bytes()?,
        })
    }
}

/// A periodic declaration that an identity still holds its committed storage.
/// Immutable once accepted; the NIPST is detached before the body is stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivationTx {
    pub node_id: NodeIdentity,
    /// Per-identity counter. Zero exactly when `prev_atx_id` is empty.
    pub sequence: u64,
    pub prev_atx_id: AtxId,
    pub positioning_atx_id: AtxId,
    pub publication_layer: LayerId,
    pub start_tick: u64,
    /// The issuer's claim of the preceding epoch's active-set size over `view`.
    pub active_set_size: u32,
    /// Block ids claimed as a reference frontier.
    pub view: Vec<BlockId>,
    pub nipst: Option<Nipst>,
}

impl ActivationTx {
    /// Content id: the hash of the canonical encoding with the NIPST field at
    /// its empty marker, so the id is stable whether or not the proof has
    /// been offloaded to the blob store.
    pub fn id(&self) -> AtxId {
        let mut out = Vec::new();
        self.encode_body(&mut out);
        put_u8(&mut out, NIPST_ABSENT);
        AtxId(hash_bytes(&out))
    }

    /// Hex prefix of the id, for log lines.
    pub fn short_id(&self) -> String {
        self.id().short()
    }

    pub fn publication_epoch(&self, layers_per_epoch: u64) -> EpochId {
        self.publication_layer.epoch(layers_per_epoch)
    }

    /// The epoch this ATX grants eligibility for: publication epoch plus one.
    pub fn target_epoch(&self, layers_per_epoch: u64) -> EpochId {
        self.publication_epoch(layers_per_epoch).next()
    }

    pub fn nipst_challenge(&self) -> NipstChallenge {
        NipstChallenge {
            node_id: self.node_id.clone(),
            sequence: self.sequence,
            prev_atx_id: self.prev_atx_id,
            publication_layer: self.publication_layer,
            start_tick: self.start_tick,
            positioning_atx_id: self.positioning_atx_id,
        }
    }

    /// Hash of the view as a set: ids are deduplicated and ordered bytewise
    /// before hashing, so permutations of one frontier collapse to one key.
    pub fn view_hash(&self) -> Hash32 {
        let mut ids: Vec<&BlockId> = self.view.iter().collect();
        ids.sort_unstable();
        ids.dedup();
        let mut out = Vec::with_capacity(4 + ids.len() * 32);
        put_u32(&mut out, ids.len() as u32);
        for id in ids {
            put_array32(&mut out, id.as_bytes());
        }
        hash_bytes(&out)
    }

    fn encode_body(&self, out: &mut Vec<u8>) {
        self.node_id.encode_into(out);
        put_u64(out, self.sequence);
        put_array32(out, self.prev_atx_id.as_bytes());
        put_array32(out, self.positioning_atx_id.as_bytes());
        put_u64(out, self.publication_layer.0);
        put_u64(out, self.start_tick);
        put_u32(out, self.active_set_size);
        put_u32(out, self.view.len() as u32);
        for block in &self.view {
            put_array32(out, block.as_bytes());
        }
    }
}

impl Codec for ActivationTx {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.encode_body(out);
        match &self.nipst {
            None => put_u8(out, NIPST_ABSENT),
            Some(nipst) => {
                put_u8(out, NIPST_PRESENT);
                nipst.encode_into(out);
            }
        }
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let node_id = NodeIdentity::decode_from(reader)?;
        let sequence = reader.u64()?;
        let prev_atx_id = AtxId(reader.array32()?);
        let positioning_atx_id = AtxId(reader.array32()?);
        let publication_layer = LayerId(reader.u64()?);
        let start_tick = reader.u64()?;
        let active_set_size = reader.u32()?;
        let view_len = reader.u32()?;
        let mut view = Vec::with_capacity(view_len.min(1 << 16) as usize);
        for _ in 0..view_len {
            view.push(BlockId(reader.array32()?));
        }
        let nipst = match reader.u8()? {
            NIPST_ABSENT => None,
            NIPST_PRESENT => Some(Nipst::decode_from(reader)?),
            marker => return Err(CodecError::BadMarker(marker)),
        };
        Ok(Self {
            node_id,
            sequence,
            prev_atx_id,
            positioning_atx_id,
            publication_layer,
            start_tick,
            active_set_size,
            view,
            nipst,
        })
    }
}
