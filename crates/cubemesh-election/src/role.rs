//! Node roles.

use cubemesh_topology::NodeId;

/// The role a node currently plays in its component.
///
/// There is no candidate state: the role is recomputed from scratch on every
/// connectivity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// No live links; neither host nor client
    #[default]
    Unassigned,
    /// This node is the coordinator
    Host,
    /// Following the given host
    Client(NodeId),
}

impl Role {
    /// The host this role answers to, resolving `Host` to `self_id`.
    pub fn host_id(&self, self_id: NodeId) -> Option<NodeId> {
        match self {
            Self::Unassigned => None,
            Self::Host => Some(self_id),
            Self::Client(host) => Some(*host),
        }
    }

    /// Whether this node is the host.
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }

    /// Whether this node follows some host.
    pub fn is_client(&self) -> bool {
        matches!(self, Self::Client(_))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unassigned => write!(f, "Unassigned"),
            Self::Host => write!(f, "Host"),
            Self::Client(host) => write!(f, "Client({})", host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_id_resolution() {
        let me = NodeId(5);
        assert_eq!(Role::Unassigned.host_id(me), None);
        assert_eq!(Role::Host.host_id(me), Some(me));
        assert_eq!(Role::Client(NodeId(9)).host_id(me), Some(NodeId(9)));
    }

    #[test]
    fn default_is_unassigned() {
        assert_eq!(Role::default(), Role::Unassigned);
        assert!(!Role::default().is_host());
        assert!(!Role::default().is_client());
    }

    #[test]
    fn display_names_host() {
        assert_eq!(Role::Client(NodeId(0x2a)).to_string(), "Client(0000002a)");
        assert_eq!(Role::Host.to_string(), "Host");
    }
}
