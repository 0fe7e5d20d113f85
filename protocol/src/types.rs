use std::fmt::{self, Debug, Display, Formatter};

/// Raw 32-byte content hash.
pub type Hash32 = [u8; 32];

/// Hashes canonical bytes into a [`Hash32`].
pub fn hash_bytes(bytes: &[u8]) -> Hash32 {
    *blake3::hash(bytes).as_bytes()
}

fn write_hex(f: &mut Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

/// Content hash of an ATX's canonical encoding, NIPST excluded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtxId(pub Hash32);

/// The "no reference" marker for `prev_atx_id` and `positioning_atx_id`.
pub const EMPTY_ATX_ID: AtxId = AtxId([0u8; 32]);

impl AtxId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        *self == EMPTY_ATX_ID
    }

    /// Hex prefix for log lines.
    pub fn short(&self) -> String {
        self.0[..5].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Display for AtxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl Debug for AtxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AtxId(")?;
        write_hex(f, &self.0)?;
        write!(f, ")")
    }
}

/// Identifies a block in the mesh.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub Hash32);

impl BlockId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl Debug for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId(")?;
        write_hex(f, &self.0)?;
        write!(f, ")")
    }
}

/// One block-production round. Layers group into fixed-length epochs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

impl LayerId {
    pub fn epoch(&self, layers_per_epoch: u64) -> EpochId {
        EpochId(self.0 / layers_per_epoch)
    }
}

impl Display for LayerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A window of `layers_per_epoch` consecutive layers. Epoch 0 is genesis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpochId(pub u64);

impl EpochId {
    pub fn is_genesis(&self) -> bool {
        self.0 == 0
    }

    pub fn first_layer(&self, layers_per_epoch: u64) -> LayerId {
        LayerId(self.0 * layers_per_epoch)
    }

    pub fn next(&self) -> EpochId {
        EpochId(self.0 + 1)
    }
}

impl Display for EpochId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A participant's signing identity. Two identities with the same `key` are
/// the same identity; the VRF key rides along.
#[derive(Clone, Debug)]
pub struct NodeIdentity {
    /// Hex form of the public signing key.
    pub key: String,
    pub vrf_public_key: Vec<u8>,
}

impl NodeIdentity {
    pub fn new(key: impl Into<String>, vrf_public_key: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            vrf_public_key,
        }
    }

    /// Key prefix for log lines.
    pub fn short(&self) -> &str {
        &self.key[..self.key.len().min(10)]
    }
}

impl PartialEq for NodeIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for NodeIdentity {}

impl std::hash::Hash for NodeIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
