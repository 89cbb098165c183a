//! Callbacks from the node core to the application.

use cubemesh_election::Role;
use cubemesh_topology::NodeId;

/// Receives mesh events as a node processes its links.
///
/// Every method has an empty default, so implementors pick only what they
/// need. `()` observes nothing.
pub trait MeshObserver {
    /// A state frame from `sender` was accepted (after deduplication and
    /// coalescing).
    fn on_application_frame(&mut self, sender: NodeId, payload: &[u8]) {
        let _ = (sender, payload);
    }

    /// A neighbour became live on `side`.
    fn on_neighbor_joined(&mut self, node: NodeId, side: u8) {
        let _ = (node, side);
    }

    /// The neighbour on `side` timed out.
    fn on_neighbor_left(&mut self, node: NodeId, side: u8) {
        let _ = (node, side);
    }

    /// This node's role changed.
    fn on_role_changed(&mut self, role: Role) {
        let _ = role;
    }
}

impl MeshObserver for () {}

/// Observer that records everything, for tests and the simulator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingObserver {
    /// Accepted application frames in arrival order
    pub frames: Vec<(NodeId, Vec<u8>)>,
    /// Joined neighbours with their side
    pub joined: Vec<(NodeId, u8)>,
    /// Departed neighbours with their side
    pub left: Vec<(NodeId, u8)>,
    /// Role after each change
    pub roles: Vec<Role>,
}

impl MeshObserver for RecordingObserver {
    fn on_application_frame(&mut self, sender: NodeId, payload: &[u8]) {
        self.frames.push((sender, payload.to_vec()));
    }

    fn on_neighbor_joined(&mut self, node: NodeId, side: u8) {
        self.joined.push((node, side));
    }

    fn on_neighbor_left(&mut self, node: NodeId, side: u8) {
        self.left.push((node, side));
    }

    fn on_role_changed(&mut self, role: Role) {
        self.roles.push(role);
    }
}
