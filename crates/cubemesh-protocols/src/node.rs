//! The per-cube protocol context.
//!
//! [`CubeNode`] owns everything one cube knows: its side slots, duplicate
//! filter, flooder, role and topology map. It is driven by calling
//! [`CubeNode::tick`] from the host loop; nothing happens between ticks.
//!
//! # Tick Order
//!
//! 1. For each side in index order: drain the link, frame the bytes, handle
//!    every non-state frame at once and hold back the newest state frame,
//!    then check that side's neighbour timeout.
//! 2. For each side in index order: handle the held state frame, if any.
//! 3. Announce if the interval has elapsed: a hello on every face, then a
//!    flooded heartbeat.
//!
//! A neighbour joining also triggers an immediate announcement, which
//! restarts the interval.
//!
//! # Frame Handling
//!
//! Every framed message goes through the same gate: frames from this node
//! are dropped, then the duplicate filter is consulted exactly once. Hellos
//! drive the side slots and the election and stop here. Heartbeats only
//! place cubes on the map; they and state frames are forwarded unchanged.

use bytes::Bytes;
use cubemesh_election::{elect, HostClaim, LocalView, NeighborView, Outcome, Role, Route};
use cubemesh_topology::{CubeEntry, NodeId, PathKnowledge, TopologyMap};
use tracing::{debug, info, trace, warn};

use crate::config::MeshConfig;
use crate::dedup::DuplicateFilter;
use crate::error::{Error, Result};
use crate::flood::Flooder;
use crate::frame::{Frame, FrameKind};
use crate::heartbeat;
use crate::link::SideSlot;
use crate::observer::MeshObserver;
use crate::transport::{Clock, SideLink, Timestamp};

/// One cube in the mesh.
pub struct CubeNode<L, C, O = ()> {
    id: NodeId,
    config: MeshConfig,
    links: Vec<L>,
    slots: Vec<SideSlot>,
    clock: C,
    observer: O,
    dedup: DuplicateFilter,
    flooder: Flooder,
    topology: TopologyMap,
    role: Role,
    route: Option<Route>,
    last_heartbeat_sent: Timestamp,
}

impl<L: SideLink, C: Clock> CubeNode<L, C, ()> {
    /// Create a node without an observer.
    pub fn new(id: NodeId, links: Vec<L>, clock: C, config: MeshConfig) -> Result<Self> {
        Self::with_observer(id, links, clock, (), config)
    }
}

impl<L: SideLink, C: Clock, O: MeshObserver> CubeNode<L, C, O> {
    /// Create a node reporting to `observer`.
    ///
    /// `links[i]` is side `i`; there must be exactly one link per side in the
    /// configured table.
    pub fn with_observer(id: NodeId, links: Vec<L>, clock: C, observer: O, config: MeshConfig) -> Result<Self> {
        config.validate()?;
        if id == NodeId::NONE {
            return Err(Error::Config("node id 0 is reserved".into()));
        }
        if links.len() != config.sides.len() {
            return Err(Error::SideCountMismatch {
                links: links.len(),
                sides: config.sides.len(),
            });
        }

        let slots = (0..config.sides.len()).map(|side| SideSlot::new(side as u8)).collect();
        let mut topology = TopologyMap::new(config.sides.clone(), config.cube_size);
        topology.record_adjacency(id, id, None);
        let last_heartbeat_sent = clock.now();

        info!(node = %id, sides = links.len(), "Cube node started");

        Ok(Self {
            id,
            dedup: DuplicateFilter::new(config.dedup_capacity),
            config,
            links,
            slots,
            clock,
            observer,
            flooder: Flooder::new(),
            topology,
            role: Role::Unassigned,
            route: None,
            last_heartbeat_sent,
        })
    }

    /// Run one protocol step.
    pub fn tick(&mut self) {
        let now = self.clock.now();

        for side in 0..self.slots.len() {
            self.receive(side, now);
            self.expire(side, now);
        }

        for side in 0..self.slots.len() {
            if let Some(raw) = self.slots[side].take_pending() {
                self.handle_frame(side, raw, now);
            }
        }

        if now.saturating_since(self.last_heartbeat_sent) >= self.config.heartbeat_interval {
            self.announce(now);
        }
    }

    /// Flood an application state frame. Returns its sequence number.
    pub fn broadcast_state(&mut self, payload: &[u8]) -> Result<u16> {
        self.broadcast(FrameKind::State.tag(), payload)
    }

    /// Flood a frame with an arbitrary tag. Returns its sequence number.
    pub fn broadcast(&mut self, tag: u8, payload: &[u8]) -> Result<u16> {
        let frame = self
            .flooder
            .originate(tag, self.id, Bytes::copy_from_slice(payload), &mut self.links)?;
        debug!(node = %self.id, tag, sequence = frame.sequence, len = payload.len(), "Broadcast frame");
        Ok(frame.sequence)
    }

    /// This node's identity.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Current role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether this node is the host.
    pub fn is_host(&self) -> bool {
        self.role.is_host()
    }

    /// Host this node answers to, itself when hosting.
    pub fn host_id(&self) -> Option<NodeId> {
        self.role.host_id(self.id)
    }

    /// This node's path from the host.
    pub fn path_from_host(&self) -> PathKnowledge {
        self.topology.path_of(self.id)
    }

    /// The known entry for a cube.
    pub fn topology_query(&self, node: NodeId) -> Option<&CubeEntry> {
        self.topology.get(node)
    }

    /// Whether a world point lies inside a specific cube.
    pub fn bounds_check(&self, node: NodeId, x: i32, y: i32) -> bool {
        self.topology.node_contains_point(node, x, y)
    }

    /// Whether a world point lies inside any known cube.
    pub fn world_bounds_check(&self, x: i32, y: i32) -> bool {
        self.topology.contains_point(x, y)
    }

    /// The full topology map.
    pub fn topology(&self) -> &TopologyMap {
        &self.topology
    }

    /// Side slots in index order.
    pub fn slots(&self) -> &[SideSlot] {
        &self.slots
    }

    /// Live neighbours as `(side, identity)`.
    pub fn neighbors(&self) -> impl Iterator<Item = (u8, NodeId)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.view().map(|view| (view.side, view.id)))
    }

    /// Active configuration.
    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// The observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// The observer, mutably.
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    fn receive(&mut self, side: usize, now: Timestamp) {
        let read = self.slots[side].ingest(&mut self.links[side]);
        if read > 0 {
            trace!(node = %self.id, side, read, "Received bytes");
        }

        while let Some(raw) = self.slots[side].next_frame() {
            if raw[0] == FrameKind::State.tag() {
                if self.slots[side].stash_state(raw) {
                    trace!(node = %self.id, side, "Superseded pending state frame");
                }
            } else {
                self.handle_frame(side, raw, now);
            }
        }
    }

    fn expire(&mut self, side: usize, now: Timestamp) {
        if !self.slots[side].is_timed_out(now, self.config.neighbor_timeout) {
            return;
        }
        let Some(neighbor) = self.slots[side].reset() else {
            return;
        };
        info!(node = %self.id, side, %neighbor, "Neighbor timed out");

        self.neighbor_left(neighbor, side);
        self.reevaluate();
    }

    fn neighbor_left(&mut self, neighbor: NodeId, side: usize) {
        if self.role.is_host() {
            self.topology.remove(neighbor);
        }
        self.observer.on_neighbor_left(neighbor, side as u8);
    }

    fn handle_frame(&mut self, side: usize, raw: Bytes, now: Timestamp) {
        let frame = match Frame::decode(&raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(node = %self.id, side, error = %e, "Dropping malformed frame");
                return;
            }
        };
        if frame.sender == self.id {
            trace!(node = %self.id, side, sequence = frame.sequence, "Dropping own frame");
            return;
        }
        if self.dedup.seen(frame.sender, frame.sequence) {
            trace!(node = %self.id, side, sender = %frame.sender, sequence = frame.sequence, "Dropping duplicate");
            return;
        }

        match frame.kind() {
            Ok(FrameKind::Hello) => {
                self.handle_hello(side, &frame, now);
                return;
            }
            Ok(FrameKind::Heartbeat) => {
                if let Some(claim) = self.claim_of(side, &frame) {
                    self.learn(frame.sender, &claim);
                }
            }
            Ok(FrameKind::State) => {
                debug!(node = %self.id, side, sender = %frame.sender, len = frame.payload.len(), "State frame");
                self.observer.on_application_frame(frame.sender, &frame.payload);
            }
            Err(e) => {
                warn!(node = %self.id, side, sender = %frame.sender, error = %e, "Ignoring frame");
                return;
            }
        }

        Flooder::forward(side, &raw, &self.slots, &mut self.links);
    }

    fn claim_of(&self, side: usize, frame: &Frame) -> Option<HostClaim> {
        match heartbeat::decode_claim(frame.sender, &frame.payload) {
            Ok(claim) => claim,
            Err(e) => {
                warn!(node = %self.id, side, sender = %frame.sender, error = %e, "Ignoring heartbeat claim");
                None
            }
        }
    }

    fn handle_hello(&mut self, side: usize, frame: &Frame, now: Timestamp) {
        let sender = frame.sender;
        let claim = self.claim_of(side, frame);

        let refresh = self.slots[side].refresh(sender, now, claim.clone());
        if let Some(previous) = refresh.replaced {
            info!(node = %self.id, side, %previous, neighbor = %sender, "Side re-plugged");
            self.neighbor_left(previous, side);
        }
        if refresh.joined {
            info!(node = %self.id, side, neighbor = %sender, "Neighbor connected");
            self.observer.on_neighbor_joined(sender, side as u8);
        }
        if refresh.joined || refresh.claim_changed {
            self.reevaluate();
        }
        if refresh.joined {
            if claim.is_none() {
                self.topology.record_adjacency(sender, self.id, Some(side as u8));
            }
            self.announce(now);
        }

        if let Some(claim) = claim {
            self.learn(sender, &claim);
        }
    }

    /// Place a cube from a claim on our own host.
    fn learn(&mut self, sender: NodeId, claim: &HostClaim) {
        if self.host_id() == Some(claim.host) {
            self.topology.record_path(sender, &claim.path);
        }
    }

    fn reevaluate(&mut self) {
        let neighbors: Vec<NeighborView> = self.slots.iter().filter_map(SideSlot::view).collect();
        let local = LocalView {
            id: self.id,
            route: self.route.clone(),
        };
        let outcome = elect(&local, &neighbors, self.config.election_rules());
        self.apply(outcome);
    }

    fn apply(&mut self, outcome: Outcome) {
        let previous = self.role;
        let old_host = previous.host_id(self.id);
        let new_host = outcome.host_id(self.id);

        if old_host != new_host {
            debug!(node = %self.id, old = ?old_host, new = ?new_host, "Host changed, resetting topology");
            self.topology.clear();
            self.topology.record_adjacency(self.id, self.id, None);
        }

        self.role = outcome.role;
        match (outcome.role, outcome.upstream) {
            (Role::Host, _) => {
                if !previous.is_host() {
                    self.topology.record_host(self.id);
                }
            }
            (Role::Client(host), Some(upstream)) => {
                if self.topology.path_of(self.id).path().as_ref() != Some(&upstream.path) {
                    debug!(node = %self.id, via = %upstream.via, side = upstream.side, path = %upstream.path, "Derived path");
                    self.topology.record_path(self.id, &upstream.path);
                }
                self.route = Some(Route {
                    host,
                    path: upstream.path,
                });
            }
            _ => {}
        }

        if previous != self.role {
            info!(node = %self.id, from = %previous, to = %self.role, "Role changed");
            self.observer.on_role_changed(self.role);
        }
    }

    fn own_claim(&self) -> Option<HostClaim> {
        match self.role {
            Role::Host => Some(HostClaim::host(self.id)),
            Role::Client(host) => match self.path_from_host() {
                PathKnowledge::Known(path) => Some(HostClaim::new(host, path)),
                _ => None,
            },
            Role::Unassigned => None,
        }
    }

    /// Say hello on every face, then flood a heartbeat. Both carry our claim.
    fn announce(&mut self, now: Timestamp) {
        self.last_heartbeat_sent = now;
        let claim = self.own_claim();
        let payload = heartbeat::encode_claim(claim.as_ref());

        for kind in [FrameKind::Hello, FrameKind::Heartbeat] {
            match self
                .flooder
                .originate(kind.tag(), self.id, payload.clone(), &mut self.links)
            {
                Ok(frame) => trace!(node = %self.id, ?kind, sequence = frame.sequence, claim = ?claim, "Announced"),
                Err(e) => warn!(node = %self.id, ?kind, error = %e, "Failed to announce"),
            }
        }
    }
}
