//! Host election as a pure function of live neighbour state.
//!
//! # Rule
//!
//! ```text
//! candidates = {self} ∪ {neighbour ids} ∪ {hosts asserted by usable claims}
//! host       = max(candidates)
//! ```
//!
//! With no live neighbour the node is `Unassigned`. If the maximum is this
//! node it becomes `Host`; otherwise it is `Client(max)`.
//!
//! # Usable Claims
//!
//! A neighbour's claim only extends the candidate set when:
//!
//! 1. its path is shorter than the configured maximum, and
//! 2. it was not derived from this node's own route (split horizon).
//!
//! The first bounds how long a vanished host can keep circulating around a
//! loop: every lap lengthens the path by one step until the claim is dropped.
//! The second stops the immediate two-node echo.
//!
//! # Upstream
//!
//! A client also picks the neighbour it hangs off: among neighbours offering
//! the winning host, the shortest claimed path wins, ties to the lowest side.
//! The node's own path is that path plus the local side it arrived on.

use cubemesh_topology::{NodeId, Path, PathKnowledge};

use crate::claim::{HostClaim, Route};
use crate::role::Role;

/// Live state of one connected neighbour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborView {
    /// Local side the neighbour is attached to
    pub side: u8,
    /// Neighbour identity
    pub id: NodeId,
    /// Latest claim from the neighbour's heartbeat, if it carried one
    pub claim: Option<HostClaim>,
}

impl NeighborView {
    /// A neighbour that has not asserted a host.
    pub fn bare(side: u8, id: NodeId) -> Self {
        Self { side, id, claim: None }
    }

    /// A neighbour asserting a claim.
    pub fn claiming(side: u8, id: NodeId, claim: HostClaim) -> Self {
        Self {
            side,
            id,
            claim: Some(claim),
        }
    }
}

/// What the local node contributes to its own election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalView {
    /// This node's identity
    pub id: NodeId,
    /// Last route this node asserted as a client
    pub route: Option<Route>,
}

impl LocalView {
    /// A node that has never followed a host.
    pub fn fresh(id: NodeId) -> Self {
        Self { id, route: None }
    }
}

/// The neighbour a client derives its path through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    /// Local side the upstream neighbour is on
    pub side: u8,
    /// Upstream neighbour identity
    pub via: NodeId,
    /// This node's derived path from the host
    pub path: Path,
}

/// Result of one election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Role to adopt
    pub role: Role,
    /// Upstream choice, for clients whose path can be derived
    pub upstream: Option<Upstream>,
}

impl Outcome {
    /// Path knowledge this outcome gives the local node.
    pub fn path(&self) -> PathKnowledge {
        match (&self.role, &self.upstream) {
            (Role::Host, _) => PathKnowledge::IsHost,
            (Role::Client(_), Some(up)) => PathKnowledge::Known(up.path.clone()),
            _ => PathKnowledge::Unknown,
        }
    }

    /// Host identity for this outcome.
    pub fn host_id(&self, self_id: NodeId) -> Option<NodeId> {
        self.role.host_id(self_id)
    }
}

/// Election parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectionRules {
    /// Claims with paths at least this long are ignored
    pub max_path_len: usize,
}

impl ElectionRules {
    /// Default bound on accepted path length.
    pub const DEFAULT_MAX_PATH_LEN: usize = 32;
}

impl Default for ElectionRules {
    fn default() -> Self {
        Self {
            max_path_len: Self::DEFAULT_MAX_PATH_LEN,
        }
    }
}

/// Decide this node's role from its live neighbours.
///
/// Idempotent and free of side effects; safe to call redundantly.
pub fn elect(local: &LocalView, neighbors: &[NeighborView], rules: ElectionRules) -> Outcome {
    if neighbors.is_empty() {
        return Outcome {
            role: Role::Unassigned,
            upstream: None,
        };
    }

    let usable = |claim: &HostClaim| -> bool {
        claim.path.len() < rules.max_path_len
            && !local.route.as_ref().is_some_and(|route| route.is_source_of(claim))
    };

    let winner = neighbors
        .iter()
        .flat_map(|n| {
            let asserted = n.claim.as_ref().filter(|&c| usable(c)).map(|c| c.host);
            std::iter::once(n.id).chain(asserted)
        })
        .fold(local.id, NodeId::max);

    if winner == local.id {
        return Outcome {
            role: Role::Host,
            upstream: None,
        };
    }

    let upstream = neighbors
        .iter()
        .filter_map(|n| {
            let claim = n.claim.as_ref()?;
            let offers_winner = claim.host == winner && usable(claim) && claim.is_consistent_for(n.id);
            offers_winner.then_some((n, &claim.path))
        })
        .min_by_key(|(n, path)| (path.len(), n.side))
        .and_then(|(n, path)| {
            path.extended(n.side).ok().map(|derived| Upstream {
                side: n.side,
                via: n.id,
                path: derived,
            })
        });

    Outcome {
        role: Role::Client(winner),
        upstream,
    }
}
