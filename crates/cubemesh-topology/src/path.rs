//! Host-relative paths and their two-bit wire packing.
//!
//! A path lists the sides stepped through, starting at the host, to reach a
//! cube. On the wire each step is a two-bit direction code packed four per
//! byte, least-significant bits first, with no end marker:
//!
//! ```text
//! codes [1, 2, 3]  ->  byte 0b00_11_10_01 = 0x39
//! ```
//!
//! Unpacking therefore always yields a multiple of four codes and must be
//! truncated to the step count transmitted alongside the bytes.

use crate::error::{Result, TopologyError};

/// Longest path representable on the wire (length is a single byte).
pub const MAX_PATH_LEN: usize = u8::MAX as usize;

/// Direction codes packed into one byte.
pub const CODES_PER_BYTE: usize = 4;

const CODE_MASK: u8 = 0x03;

/// Pack two-bit direction codes, four per byte, LSB first.
///
/// Codes above 3 are masked to their low two bits.
pub fn pack_directions(directions: &[u8]) -> Vec<u8> {
    directions
        .chunks(CODES_PER_BYTE)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &code)| byte | ((code & CODE_MASK) << (i * 2)))
        })
        .collect()
}

/// Unpack every two-bit code from `packed`, four per byte.
///
/// The result length is always `packed.len() * 4`; callers truncate it to the
/// transmitted step count.
pub fn unpack_directions(packed: &[u8]) -> Vec<u8> {
    packed
        .iter()
        .flat_map(|&byte| (0..CODES_PER_BYTE).map(move |i| (byte >> (i * 2)) & CODE_MASK))
        .collect()
}

/// Number of bytes needed to pack `steps` direction codes.
pub const fn packed_len(steps: usize) -> usize {
    steps.div_ceil(CODES_PER_BYTE)
}

/// An ordered list of direction codes from the host to a cube.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path(Vec<u8>);

impl Path {
    /// The empty path.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from direction codes, rejecting paths too long for the wire.
    pub fn from_steps(steps: Vec<u8>) -> Result<Self> {
        if steps.len() > MAX_PATH_LEN {
            return Err(TopologyError::PathTooLong {
                len: steps.len(),
                max: MAX_PATH_LEN,
            });
        }
        Ok(Self(steps))
    }

    /// Decode packed bytes, keeping exactly `steps` codes.
    pub fn unpack(packed: &[u8], steps: usize) -> Result<Self> {
        let capacity = packed.len() * CODES_PER_BYTE;
        if steps > capacity {
            return Err(TopologyError::PathOverflow {
                asserted: steps,
                capacity,
            });
        }
        let mut codes = unpack_directions(packed);
        codes.truncate(steps);
        Self::from_steps(codes)
    }

    /// Pack into wire bytes.
    pub fn pack(&self) -> Vec<u8> {
        pack_directions(&self.0)
    }

    /// This path extended by one more step.
    pub fn extended(&self, side: u8) -> Result<Self> {
        let mut steps = self.0.clone();
        steps.push(side);
        Self::from_steps(steps)
    }

    /// Whether `other` is this path plus exactly one trailing step.
    pub fn is_parent_of(&self, other: &Path) -> bool {
        other.0.len() == self.0.len() + 1 && other.0.starts_with(&self.0)
    }

    /// Direction codes in order.
    pub fn steps(&self) -> &[u8] {
        &self.0
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True only for the host's own path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", step)?;
        }
        write!(f, "]")
    }
}

/// What this node knows about a cube's path from the host.
///
/// Keeps "is the host" and "no path learned yet" apart instead of overloading
/// an empty path for both.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathKnowledge {
    /// No path has been asserted for this cube
    #[default]
    Unknown,
    /// The cube is the host; its path is empty
    IsHost,
    /// A non-empty path from the host
    Known(Path),
}

impl PathKnowledge {
    /// Classify a concrete path.
    pub fn from_path(path: Path) -> Self {
        if path.is_empty() {
            Self::IsHost
        } else {
            Self::Known(path)
        }
    }

    /// The concrete path, if one is known (empty for the host).
    pub fn path(&self) -> Option<Path> {
        match self {
            Self::Unknown => None,
            Self::IsHost => Some(Path::new()),
            Self::Known(path) => Some(path.clone()),
        }
    }

    /// Whether any path is known.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Whether this marks the host.
    pub fn is_host(&self) -> bool {
        matches!(self, Self::IsHost)
    }
}
