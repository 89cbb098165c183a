//! Coordinator-Free Host Election
//!
//! Exactly one cube in a connected component acts as *host*: the one with the
//! highest identity. There is no central authority and no voting round.
//! Every node recomputes its role from what its live neighbours tell it.
//!
//! # Core Insight
//!
//! Identities are totally ordered and unique, so "highest reachable identity"
//! is a fixpoint every node reaches independently. Neighbours relay the host
//! they follow inside their heartbeats, so a node learns of a distant host one
//! hop per heartbeat period.
//!
//! # Pure Function
//!
//! [`elect`] takes the local view and the connected neighbours and returns an
//! [`Outcome`]. It has no side effects; applying the outcome (seeding the map,
//! recording the derived path) is the caller's job.

mod claim;
mod election;
mod role;

pub use claim::{HostClaim, Route};
pub use election::{elect, ElectionRules, LocalView, NeighborView, Outcome, Upstream};
pub use role::Role;

#[cfg(test)]
mod tests {
    use super::*;
    use cubemesh_topology::NodeId;

    #[test]
    fn host_uniqueness_on_pair() {
        let (a, b) = (NodeId(3), NodeId(4));
        let rules = ElectionRules::default();

        let ra = elect(&LocalView::fresh(a), &[NeighborView::bare(0, b)], rules).role;
        let rb = elect(&LocalView::fresh(b), &[NeighborView::bare(2, a)], rules).role;

        assert_eq!(ra, Role::Client(b));
        assert_eq!(rb, Role::Host);
    }
}
