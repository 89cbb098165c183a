//! Error types for cubemesh-protocols.

use cubemesh_topology::{NodeId, TopologyError};
use thiserror::Error;

/// Result type for cubemesh-protocols operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors decoding or building a wire frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Fewer bytes than a frame header.
    #[error("frame of {len} bytes is shorter than the header")]
    Truncated { len: usize },

    /// Declared payload length disagrees with the bytes present.
    #[error("frame declares {declared} payload bytes but carries {available}")]
    LengthMismatch { declared: usize, available: usize },

    /// Payload length must fit in one byte.
    #[error("payload of {len} bytes exceeds the 255 byte limit")]
    PayloadTooLong { len: usize },

    /// Tag is neither heartbeat nor state.
    #[error("unknown frame tag {0:#04x}")]
    UnknownTag(u8),
}

/// Errors interpreting a heartbeat payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeartbeatError {
    /// The packed path could not be decoded.
    #[error("invalid path in heartbeat: {0}")]
    Path(#[from] TopologyError),

    /// An empty path asserted for someone other than the sender, or a
    /// non-empty one asserted by the host itself.
    #[error("node {sender} asserts inconsistent claim on host {host}")]
    InconsistentClaim { sender: NodeId, host: NodeId },
}

/// Errors that can occur during protocol operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A frame could not be built or decoded.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A heartbeat payload was malformed.
    #[error("heartbeat error: {0}")]
    Heartbeat(#[from] HeartbeatError),

    /// Topology configuration was rejected.
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Configuration value missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// One link must be supplied per configured side.
    #[error("{links} links supplied for {sides} configured sides")]
    SideCountMismatch { links: usize, sides: usize },
}
