//! Deterministic mesh simulation over in-memory wires.
//!
//! Every cube runs the real [`CubeNode`] core. Faces are [`Port`]s that a
//! wire can be plugged into and pulled out of while the mesh runs, and all
//! cubes share one [`ManualClock`] advanced in fixed ticks. Cubes tick in
//! identity order, so a run is reproducible.

use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use bytes::BytesMut;
use cubemesh_election::Role;
use cubemesh_protocols::{Clock, CubeNode, ManualClock, MemoryLink, MeshConfig, MeshObserver, PathKnowledge, SideLink, Timestamp};
use cubemesh_topology::{GridCoord, NodeId};
use tracing::{debug, info};

use crate::error::{Result, SimError};
use crate::events::{MeshEvent, MeshSnapshot, NeighborState, NodeState, WireState};

type EventLog = Rc<RefCell<Vec<MeshEvent>>>;

/// A cube as driven by the simulation.
pub type SimNode = CubeNode<Port, ManualClock, SimObserver>;

/// A face socket. Reads and writes go to whatever wire is plugged in; with
/// nothing plugged, reads are empty and writes are lost.
#[derive(Debug, Clone, Default)]
pub struct Port {
    plug: Rc<RefCell<Option<MemoryLink>>>,
}

impl Port {
    fn plug(&self, link: MemoryLink) {
        *self.plug.borrow_mut() = Some(link);
    }

    fn unplug(&self) -> Option<MemoryLink> {
        self.plug.borrow_mut().take()
    }

    /// Whether a wire is plugged in.
    pub fn is_plugged(&self) -> bool {
        self.plug.borrow().is_some()
    }
}

impl SideLink for Port {
    fn read_available(&mut self, buf: &mut BytesMut) -> usize {
        match self.plug.borrow_mut().as_mut() {
            Some(link) => link.read_available(buf),
            None => 0,
        }
    }

    fn write(&mut self, data: &[u8]) {
        if let Some(link) = self.plug.borrow_mut().as_mut() {
            link.write(data);
        }
    }
}

/// Observer that appends a cube's events to the shared timeline.
#[derive(Debug)]
pub struct SimObserver {
    node: NodeId,
    clock: ManualClock,
    log: EventLog,
}

impl SimObserver {
    fn push(&self, event: MeshEvent) {
        self.log.borrow_mut().push(event);
    }

    fn time_ms(&self) -> u64 {
        self.clock.now().as_millis()
    }
}

impl MeshObserver for SimObserver {
    fn on_application_frame(&mut self, sender: NodeId, payload: &[u8]) {
        self.push(MeshEvent::StateDelivered {
            node: self.node,
            sender,
            payload: payload.to_vec(),
            time_ms: self.time_ms(),
        });
    }

    fn on_neighbor_joined(&mut self, neighbor: NodeId, side: u8) {
        self.push(MeshEvent::NeighborJoined {
            node: self.node,
            neighbor,
            side,
            time_ms: self.time_ms(),
        });
    }

    fn on_neighbor_left(&mut self, neighbor: NodeId, side: u8) {
        self.push(MeshEvent::NeighborLeft {
            node: self.node,
            neighbor,
            side,
            time_ms: self.time_ms(),
        });
    }

    fn on_role_changed(&mut self, role: Role) {
        self.push(MeshEvent::RoleChanged {
            node: self.node,
            role,
            time_ms: self.time_ms(),
        });
    }
}

/// Configuration for the simulation.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Configuration given to every cube
    pub mesh: MeshConfig,
    /// Simulated time between cube ticks
    pub tick: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mesh: MeshConfig::default(),
            tick: Duration::from_millis(50),
        }
    }
}

impl SimulationConfig {
    /// Set the per-cube configuration.
    #[must_use]
    pub fn with_mesh(mut self, mesh: MeshConfig) -> Self {
        self.mesh = mesh;
        self
    }

    /// Set the tick length.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

struct SimCube {
    node: SimNode,
    ports: Vec<Port>,
    cell: Option<GridCoord>,
}

struct Wire {
    a: NodeId,
    side_a: u8,
    b: NodeId,
    side_b: u8,
    link: MemoryLink,
}

impl Wire {
    fn touches(&self, node: NodeId, side: u8) -> bool {
        (self.a == node && self.side_a == side) || (self.b == node && self.side_b == side)
    }
}

/// A simulated mesh.
pub struct Simulation {
    config: SimulationConfig,
    clock: ManualClock,
    log: EventLog,
    cubes: BTreeMap<NodeId, SimCube>,
    wires: Vec<Wire>,
}

impl Simulation {
    /// Create an empty simulation.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            clock: ManualClock::new(),
            log: Rc::default(),
            cubes: BTreeMap::new(),
            wires: Vec::new(),
        }
    }

    /// Build a `width` x `height` grid of cubes with every adjacent pair
    /// wired together.
    ///
    /// Cell `(x, y)` is wired to `(x + 1, y)` through its side 2 and the
    /// neighbour's side 0, and to `(x, y + 1)` through its side 1 and the
    /// neighbour's side 3. With the standard side table this makes each
    /// cube's map position equal its cell offset from the host.
    pub fn grid(width: usize, height: usize, config: SimulationConfig) -> Result<Self> {
        if width == 0 || height == 0 || width > 256 || height > 256 {
            return Err(SimError::LayoutTooLarge { width, height });
        }
        let mut sim = Self::new(config);

        for y in 0..height {
            for x in 0..width {
                let cell = GridCoord::new(x as i32, y as i32);
                sim.add_node_at(Self::grid_id(x, y), Some(cell))?;
            }
        }
        for y in 0..height {
            for x in 0..width {
                let here = Self::grid_id(x, y);
                if x + 1 < width {
                    sim.connect(here, 2, Self::grid_id(x + 1, y), 0)?;
                }
                if y + 1 < height {
                    sim.connect(here, 1, Self::grid_id(x, y + 1), 3)?;
                }
            }
        }

        info!(width, height, cubes = sim.node_count(), wires = sim.wires.len(), "Built grid");
        Ok(sim)
    }

    /// Identity of the cube at a grid cell, derived from a synthetic
    /// hardware address.
    pub fn grid_id(x: usize, y: usize) -> NodeId {
        NodeId::from_hardware([0x24, 0x0A, 0xC4, 0x00, x as u8, y as u8])
    }

    /// Power on a cube with nothing attached.
    pub fn add_node(&mut self, id: NodeId) -> Result<()> {
        self.add_node_at(id, None)
    }

    /// Power on a cube, recording its physical cell.
    pub fn add_node_at(&mut self, id: NodeId, cell: Option<GridCoord>) -> Result<()> {
        if self.cubes.contains_key(&id) {
            return Err(SimError::DuplicateNode(id));
        }
        let ports: Vec<Port> = (0..self.config.mesh.sides.len()).map(|_| Port::default()).collect();
        let observer = SimObserver {
            node: id,
            clock: self.clock.clone(),
            log: Rc::clone(&self.log),
        };
        let node = CubeNode::with_observer(id, ports.clone(), self.clock.clone(), observer, self.config.mesh.clone())?;

        self.cubes.insert(id, SimCube { node, ports, cell });
        self.record(MeshEvent::NodeAdded {
            node: id,
            time_ms: self.now().as_millis(),
        });
        Ok(())
    }

    /// Wire side `side_a` of `a` to side `side_b` of `b`.
    pub fn connect(&mut self, a: NodeId, side_a: u8, b: NodeId, side_b: u8) -> Result<()> {
        if a == b {
            return Err(SimError::SelfLoop(a));
        }
        let port_a = self.free_port(a, side_a)?;
        let port_b = self.free_port(b, side_b)?;

        let (end_a, end_b) = MemoryLink::pair();
        port_a.plug(end_a.clone());
        port_b.plug(end_b);
        self.wires.push(Wire {
            a,
            side_a,
            b,
            side_b,
            link: end_a,
        });

        debug!(%a, side_a, %b, side_b, "Wired faces");
        self.record(MeshEvent::LinkConnected {
            a,
            side_a,
            b,
            side_b,
            time_ms: self.now().as_millis(),
        });
        Ok(())
    }

    /// Pull the wire on one face of a cube.
    pub fn cut(&mut self, node: NodeId, side: u8) -> Result<()> {
        self.port(node, side)?;
        let index = self
            .wires
            .iter()
            .position(|w| w.touches(node, side))
            .ok_or(SimError::NotWired { node, side })?;
        let wire = self.wires.remove(index);

        wire.link.cut();
        for (end, end_side) in [(wire.a, wire.side_a), (wire.b, wire.side_b)] {
            if let Ok(port) = self.port(end, end_side) {
                port.unplug();
            }
        }

        debug!(a = %wire.a, side_a = wire.side_a, b = %wire.b, side_b = wire.side_b, "Cut wire");
        self.record(MeshEvent::LinkCut {
            a: wire.a,
            side_a: wire.side_a,
            b: wire.b,
            side_b: wire.side_b,
            time_ms: self.now().as_millis(),
        });
        Ok(())
    }

    /// Unplug every wire on a cube and power it off.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        if !self.cubes.contains_key(&id) {
            return Err(SimError::UnknownNode(id));
        }
        let sides: Vec<u8> = self
            .wires
            .iter()
            .filter_map(|w| match (w.a == id, w.b == id) {
                (true, _) => Some(w.side_a),
                (_, true) => Some(w.side_b),
                _ => None,
            })
            .collect();
        for side in sides {
            self.cut(id, side)?;
        }

        self.cubes.remove(&id);
        info!(node = %id, "Removed cube");
        self.record(MeshEvent::NodeRemoved {
            node: id,
            time_ms: self.now().as_millis(),
        });
        Ok(())
    }

    /// Advance the clock one tick and tick every cube.
    pub fn step(&mut self) {
        self.clock.advance(self.config.tick);
        for cube in self.cubes.values_mut() {
            cube.node.tick();
        }
    }

    /// Step until at least `duration` of simulated time has passed.
    pub fn run_for(&mut self, duration: Duration) {
        let until = self.now().saturating_add(duration);
        while self.now() < until {
            self.step();
        }
    }

    /// Step until `done` holds, giving up after `limit`. Returns whether
    /// the condition was reached.
    pub fn run_until(&mut self, limit: Duration, mut done: impl FnMut(&Self) -> bool) -> bool {
        let until = self.now().saturating_add(limit);
        while !done(self) {
            if self.now() >= until {
                return false;
            }
            self.step();
        }
        true
    }

    /// Current simulated time.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// A cube's protocol core.
    pub fn node(&self, id: NodeId) -> Option<&SimNode> {
        self.cubes.get(&id).map(|cube| &cube.node)
    }

    /// Identities of every cube, ascending.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.cubes.keys().copied()
    }

    /// Number of cubes.
    pub fn node_count(&self) -> usize {
        self.cubes.len()
    }

    /// The cube occupying a grid cell.
    pub fn node_at(&self, cell: GridCoord) -> Option<NodeId> {
        self.cubes
            .iter()
            .find(|(_, cube)| cube.cell == Some(cell))
            .map(|(&id, _)| id)
    }

    /// Physical cell of a cube placed by a layout.
    pub fn cell_of(&self, id: NodeId) -> Option<GridCoord> {
        self.cubes.get(&id).and_then(|cube| cube.cell)
    }

    /// Flood a state frame from one cube.
    pub fn broadcast_state(&mut self, id: NodeId, payload: &[u8]) -> Result<u16> {
        let cube = self.cubes.get_mut(&id).ok_or(SimError::UnknownNode(id))?;
        Ok(cube.node.broadcast_state(payload)?)
    }

    /// Cubes currently claiming to be host.
    pub fn hosts(&self) -> Vec<NodeId> {
        self.cubes
            .values()
            .filter(|cube| cube.node.is_host())
            .map(|cube| cube.node.id())
            .collect()
    }

    /// Sets of cubes joined by wires.
    pub fn components(&self) -> Vec<BTreeSet<NodeId>> {
        let mut adjacency: BTreeMap<NodeId, Vec<NodeId>> = self.cubes.keys().map(|&id| (id, Vec::new())).collect();
        for wire in &self.wires {
            adjacency.entry(wire.a).or_default().push(wire.b);
            adjacency.entry(wire.b).or_default().push(wire.a);
        }

        let mut seen = BTreeSet::new();
        let mut components = Vec::new();
        for &start in adjacency.keys() {
            if !seen.insert(start) {
                continue;
            }
            let mut component = BTreeSet::from([start]);
            let mut queue = VecDeque::from([start]);
            while let Some(id) = queue.pop_front() {
                for &next in adjacency.get(&id).into_iter().flatten() {
                    if seen.insert(next) {
                        component.insert(next);
                        queue.push_back(next);
                    }
                }
            }
            components.push(component);
        }
        components
    }

    /// Whether every component has settled: one host that every member
    /// follows with a known path, or a lone unassigned cube.
    pub fn is_converged(&self) -> bool {
        self.components().iter().all(|component| {
            let nodes: Vec<&SimNode> = component.iter().filter_map(|&id| self.node(id)).collect();
            if let [lone] = nodes.as_slice() {
                return lone.role() == Role::Unassigned;
            }
            let hosts: Vec<NodeId> = nodes.iter().filter(|n| n.is_host()).map(|n| n.id()).collect();
            let [host] = hosts.as_slice() else {
                return false;
            };
            nodes.iter().all(|n| {
                n.host_id() == Some(*host) && (n.is_host() || matches!(n.path_from_host(), PathKnowledge::Known(_)))
            })
        })
    }

    /// The recorded timeline.
    pub fn events(&self) -> Ref<'_, Vec<MeshEvent>> {
        self.log.borrow()
    }

    /// Number of recorded events.
    pub fn event_count(&self) -> usize {
        self.log.borrow().len()
    }

    /// Capture the current state of every cube and wire.
    pub fn snapshot(&self) -> MeshSnapshot {
        let nodes: Vec<NodeState> = self
            .cubes
            .values()
            .map(|cube| {
                let node = &cube.node;
                NodeState {
                    id: node.id(),
                    role: node.role(),
                    host: node.host_id(),
                    path: node.path_from_host(),
                    position: node.topology_query(node.id()).map(|entry| entry.position),
                    cell: cube.cell,
                    neighbors: node
                        .neighbors()
                        .map(|(side, neighbor)| NeighborState { side, node: neighbor })
                        .collect(),
                    known_cubes: node.topology().len(),
                }
            })
            .collect();
        let wires = self
            .wires
            .iter()
            .map(|w| WireState {
                a: w.a,
                side_a: w.side_a,
                b: w.b,
                side_b: w.side_b,
            })
            .collect();

        MeshSnapshot {
            time_ms: self.now().as_millis(),
            node_count: nodes.len(),
            hosts: self.hosts(),
            nodes,
            wires,
        }
    }

    fn record(&self, event: MeshEvent) {
        self.log.borrow_mut().push(event);
    }

    fn port(&self, node: NodeId, side: u8) -> Result<&Port> {
        let cube = self.cubes.get(&node).ok_or(SimError::UnknownNode(node))?;
        cube.ports
            .get(usize::from(side))
            .ok_or(SimError::InvalidSide { node, side })
    }

    fn free_port(&self, node: NodeId, side: u8) -> Result<Port> {
        let port = self.port(node, side)?;
        if port.is_plugged() {
            return Err(SimError::SideOccupied { node, side });
        }
        Ok(port.clone())
    }
}
