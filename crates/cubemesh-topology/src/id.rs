//! Node identity.

/// Identity of one cube, derived once at boot from a hardware-unique value.
///
/// Identities are totally ordered; the highest reachable identity becomes
/// host. Zero is never produced by real hardware and is treated as "nobody"
/// on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    /// The placeholder identity asserted by nodes without a host.
    pub const NONE: Self = Self(0);

    /// Create from a raw value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Fold a six-byte hardware address into an identity.
    ///
    /// Byte `i` is XORed in at bit offset `(i % 4) * 8`, so the two trailing
    /// bytes fold over the two leading ones.
    pub fn from_hardware(mac: [u8; 6]) -> Self {
        let folded = mac
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &b)| acc ^ (u32::from(b) << ((i % 4) * 8)));
        Self(folded)
    }

    /// Raw value.
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Big-endian wire bytes.
    pub const fn to_be_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Decode from big-endian wire bytes.
    pub const fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}
