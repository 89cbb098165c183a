//! Host claims carried in heartbeats.
//!
//! A claim is a neighbour's assertion "my host is `host` and I sit at `path`
//! from it". The host asserts itself with an empty path; clients assert the
//! path they derived. Claims are the only way knowledge of a host travels
//! beyond one hop.

use cubemesh_topology::{NodeId, Path};

/// A neighbour's assertion of its host and path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostClaim {
    /// Host the sender follows (or is)
    pub host: NodeId,
    /// Sender's path from that host
    pub path: Path,
}

impl HostClaim {
    /// Create a claim.
    pub fn new(host: NodeId, path: Path) -> Self {
        Self { host, path }
    }

    /// The claim a host makes about itself.
    pub fn host(id: NodeId) -> Self {
        Self {
            host: id,
            path: Path::new(),
        }
    }

    /// An empty path is asserted exactly when the sender is the host.
    pub fn is_consistent_for(&self, sender: NodeId) -> bool {
        self.path.is_empty() == (self.host == sender)
    }
}

/// The last route this node itself asserted as a client.
///
/// Retained after the route is lost so that echoes of it coming back from
/// downstream neighbours can be recognised and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    /// Host the route led to
    pub host: NodeId,
    /// This node's path from that host
    pub path: Path,
}

impl Route {
    /// Whether `claim` was derived from this route by a direct downstream
    /// neighbour (same host, path one step longer with ours as prefix).
    pub fn is_source_of(&self, claim: &HostClaim) -> bool {
        claim.host == self.host && self.path.is_parent_of(&claim.path)
    }
}
