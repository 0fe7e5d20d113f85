//! Reserved key and fixed-layout value schema of the ATX store.
//!
//! Keys and small index values are `#[repr(C)]` byte records with
//! little-endian integer fields, written and read through bytemuck. The NIPST
//! store keys blobs by the raw 32-byte ATX id and has no schema of its own.

use bytemuck::{AnyBitPattern, NoUninit};
use protocol::{AtxId, CodecError, EpochId, LayerId};

/// Trailing tag of an ATX body key.
pub const ATX_BODY_TAG: u8 = 0x00;

/// Tag of a per-epoch counter key.
pub const COUNTER_TAG: u64 = 0xAAAA;

/// Literal key of the positioning-ATX record.
pub const POS_ATX_KEY: &[u8] = b"posAtxKey";

/// `atx_id || 0x00` → encoded ATX body (NIPST detached).
#[repr(C)]
#[derive(Clone, Copy, Debug, AnyBitPattern, NoUninit, PartialEq, Eq)]
pub struct AtxBodyKey {
    pub id: [u8; 32],
    pub tag: u8,
}

impl AtxBodyKey {
    pub fn new(id: AtxId) -> Self {
        Self {
            id: *id.as_bytes(),
            tag: ATX_BODY_TAG,
        }
    }
}

/// `epoch (u64 le) || COUNTER_TAG (u64 le)` → u32 le counter.
#[repr(C)]
#[derive(Clone, Copy, Debug, AnyBitPattern, NoUninit, PartialEq, Eq)]
pub struct EpochCounterKey {
    pub epoch: [u8; 8],
    pub tag: [u8; 8],
}

impl EpochCounterKey {
    pub fn new(epoch: EpochId) -> Self {
        Self {
            epoch: epoch.0.to_le_bytes(),
            tag: COUNTER_TAG.to_le_bytes(),
        }
    }
}

/// Value at [`POS_ATX_KEY`]: the highest-layer ATX seen so far.
#[repr(C)]
#[derive(Clone, Copy, Debug, AnyBitPattern, NoUninit, PartialEq, Eq)]
pub struct PosAtxRecord {
    pub atx_id: [u8; 32],
    pub layer: [u8; 8],
}

impl PosAtxRecord {
    pub fn new(atx_id: AtxId, layer: LayerId) -> Self {
        Self {
            atx_id: *atx_id.as_bytes(),
            layer: layer.0.to_le_bytes(),
        }
    }

    pub fn atx_id(&self) -> AtxId {
        AtxId(self.atx_id)
    }

    pub fn layer(&self) -> LayerId {
        LayerId(u64::from_le_bytes(self.layer))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != size_of::<Self>() {
            return Err(CodecError::WrongSize {
                want: size_of::<Self>(),
                got: bytes.len(),
            });
        }
        Ok(*bytemuck::from_bytes(bytes))
    }
}

/// Decodes the raw 32-byte value of a per-node last-ATX pointer.
pub fn decode_atx_id(bytes: &[u8]) -> Result<AtxId, CodecError> {
    let id: [u8; 32] = bytes.try_into().map_err(|_| CodecError::WrongSize {
        want: 32,
        got: bytes.len(),
    })?;
    Ok(AtxId(id))
}

/// Decodes a u32 le counter value.
pub fn decode_counter(bytes: &[u8]) -> Result<u32, CodecError> {
    let raw: [u8; 4] = bytes.try_into().map_err(|_| CodecError::WrongSize {
        want: 4,
        got: bytes.len(),
    })?;
    Ok(u32::from_le_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atx_body_key_layout() {
        let key = AtxBodyKey::new(AtxId([7u8; 32]));
        let bytes = bytemuck::bytes_of(&key);
        assert_eq!(bytes.len(), 33);
        assert_eq!(&bytes[..32], &[7u8; 32]);
        assert_eq!(bytes[32], ATX_BODY_TAG);
    }

    #[test]
    fn counter_key_embeds_epoch_and_tag() {
        let key = EpochCounterKey::new(EpochId(3));
        let bytes = bytemuck::bytes_of(&key);
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], &3u64.to_le_bytes());
        assert_eq!(&bytes[8..], &COUNTER_TAG.to_le_bytes());
        // Distinct epochs never collide with each other or the body keys.
        assert_ne!(bytes, bytemuck::bytes_of(&EpochCounterKey::new(EpochId(4))));
    }

    #[test]
    fn pos_atx_record_round_trip() {
        let record = PosAtxRecord::new(AtxId([5u8; 32]), LayerId(77));
        let decoded = PosAtxRecord::decode(bytemuck::bytes_of(&record)).unwrap();
        assert_eq!(decoded.atx_id(), AtxId([5u8; 32]));
        assert_eq!(decoded.layer(), LayerId(77));

        assert_eq!(
            PosAtxRecord::decode(&[0u8; 3]),
            Err(CodecError::WrongSize { want: 40, got: 3 })
        );
    }

    #[test]
    fn pointer_and_counter_values() {
        assert_eq!(decode_atx_id(&[9u8; 32]).unwrap(), AtxId([9u8; 32]));
        assert!(decode_atx_id(&[9u8; 31]).is_err());
        assert_eq!(decode_counter(&7u32.to_le_bytes()).unwrap(), 7);
        assert!(decode_counter(&[1u8; 5]).is_err());
    }
}
