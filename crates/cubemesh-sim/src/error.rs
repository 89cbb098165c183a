//! Error types for cubemesh-sim.

use cubemesh_topology::NodeId;
use thiserror::Error;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised while building or rewiring a simulated mesh.
#[derive(Debug, Error)]
pub enum SimError {
    /// No cube with that identity
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Identities must be unique
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    /// Side index outside the node's table
    #[error("node {node} has no side {side}")]
    InvalidSide { node: NodeId, side: u8 },

    /// A face can hold one wire
    #[error("side {side} of node {node} is already wired")]
    SideOccupied { node: NodeId, side: u8 },

    /// Nothing to cut
    #[error("side {side} of node {node} is not wired")]
    NotWired { node: NodeId, side: u8 },

    /// Grid dimensions must be 1..=256 to derive identities
    #[error("grid of {width}x{height} cannot be laid out")]
    LayoutTooLarge { width: usize, height: usize },

    /// A cube cannot be wired to itself
    #[error("node {0} cannot be wired to itself")]
    SelfLoop(NodeId),

    /// The node core rejected its configuration or a payload
    #[error("protocol error: {0}")]
    Protocol(#[from] cubemesh_protocols::Error),
}
