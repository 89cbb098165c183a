//! Mesh events and snapshots for the simulation timeline.

use cubemesh_election::Role;
use cubemesh_topology::{GridCoord, NodeId, PathKnowledge};
use serde::{Deserialize, Serialize};

/// Events that occur while a simulated mesh runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MeshEvent {
    /// A cube was powered on
    NodeAdded { node: NodeId, time_ms: u64 },

    /// A cube was powered off and unplugged
    NodeRemoved { node: NodeId, time_ms: u64 },

    /// Two faces were wired together
    LinkConnected {
        a: NodeId,
        side_a: u8,
        b: NodeId,
        side_b: u8,
        time_ms: u64,
    },

    /// A wire was pulled
    LinkCut {
        a: NodeId,
        side_a: u8,
        b: NodeId,
        side_b: u8,
        time_ms: u64,
    },

    /// A cube started hearing a neighbour on one of its faces
    NeighborJoined {
        node: NodeId,
        neighbor: NodeId,
        side: u8,
        time_ms: u64,
    },

    /// A neighbour timed out
    NeighborLeft {
        node: NodeId,
        neighbor: NodeId,
        side: u8,
        time_ms: u64,
    },

    /// A cube's role changed
    RoleChanged { node: NodeId, role: Role, time_ms: u64 },

    /// A state frame reached a cube's application
    StateDelivered {
        node: NodeId,
        sender: NodeId,
        payload: Vec<u8>,
        time_ms: u64,
    },
}

impl MeshEvent {
    /// Simulated time of this event in milliseconds.
    pub fn time_ms(&self) -> u64 {
        match self {
            MeshEvent::NodeAdded { time_ms, .. }
            | MeshEvent::NodeRemoved { time_ms, .. }
            | MeshEvent::LinkConnected { time_ms, .. }
            | MeshEvent::LinkCut { time_ms, .. }
            | MeshEvent::NeighborJoined { time_ms, .. }
            | MeshEvent::NeighborLeft { time_ms, .. }
            | MeshEvent::RoleChanged { time_ms, .. }
            | MeshEvent::StateDelivered { time_ms, .. } => *time_ms,
        }
    }
}

/// A live neighbour as seen from one face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborState {
    pub side: u8,
    pub node: NodeId,
}

/// State of one cube.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    pub id: NodeId,
    pub role: Role,
    pub host: Option<NodeId>,
    pub path: PathKnowledge,
    /// Where the cube believes it is, relative to its host
    pub position: Option<GridCoord>,
    /// Physical grid cell, for cubes placed by a layout
    pub cell: Option<GridCoord>,
    pub neighbors: Vec<NeighborState>,
    pub known_cubes: usize,
}

/// State of one wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireState {
    pub a: NodeId,
    pub side_a: u8,
    pub b: NodeId,
    pub side_b: u8,
}

/// A snapshot of the mesh at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub time_ms: u64,
    pub nodes: Vec<NodeState>,
    pub wires: Vec<WireState>,
    pub node_count: usize,
    pub hosts: Vec<NodeId>,
}

impl MeshSnapshot {
    /// State of one cube.
    pub fn node(&self, id: NodeId) -> Option<&NodeState> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
