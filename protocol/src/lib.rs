pub mod atx;
pub mod codec;
pub mod types;

pub use atx::{ActivationTx, Nipst, NipstChallenge};
pub use codec::{Codec, CodecError, Reader, decode, encode};
pub use types::{AtxId, BlockId, EMPTY_ATX_ID, EpochId, Hash32, LayerId, NodeIdentity, hash_bytes};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_body_keeps_its_id() {
        // The store strips the NIPST before encoding; decoding that body must
        // yield the id the full ATX was announced under.
        let mut atx = ActivationTx {
            node_id: NodeIdentity::new("cafe00", vec![1]),
            sequence: 0,
            prev_atx_id: EMPTY_ATX_ID,
            positioning_atx_id: EMPTY_ATX_ID,
            publication_layer: LayerId(3),
            start_tick: 0,
            active_set_size: 0,
            view: Vec::new(),
            nipst: Some(Nipst {
                space: 1024,
                challenge: [0u8; 32],
                proof: vec![9; 16],
            }),
        };
        let announced = atx.id();
        atx.nipst = None;
        let body = encode(&atx);
        let decoded: ActivationTx = decode(&body).unwrap();
        assert_eq!(decoded.id(), announced);
    }

    #[test]
    fn empty_id_is_all_zeroes() {
        assert_eq!(EMPTY_ATX_ID.as_bytes(), &[0u8; 32]);
        assert!(EMPTY_ATX_ID.is_empty());
        assert!(!AtxId([1u8; 32]).is_empty());
    }
}
