//! The shared cube map: node identity to grid placement.
//!
//! Entries are keyed by [`NodeId`] and always replaced wholesale, never merged.
//! Two ways place a cube:
//!
//! - **Adjacency**: first contact, before any path is known. The cube lands one
//!   side-offset away from a reference cube, or at the origin when there is no
//!   usable reference.
//! - **Path**: the position is the sum of side offsets along the host-relative
//!   path. Most recently received wins; there is no staleness check.
//!
//! Positions are in world units: each step moves one cube footprint.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::path::MAX_PATH_LEN;
use crate::{GridCoord, NodeId, Path, PathKnowledge, SideTable};

/// Footprint of the reference cube in world units.
pub const DEFAULT_CUBE_SIZE: i32 = 128;

/// Largest footprint for which every position a map can hold, plus one
/// footprint, stays inside `i32`.
pub const MAX_CUBE_SIZE: i32 = i32::MAX / (MAX_PATH_LEN as i32 + 2);

/// One known cube.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CubeEntry {
    /// Identity of the cube
    pub node: NodeId,
    /// Lower-left corner in world units
    pub position: GridCoord,
    /// Whether this cube is the host
    pub is_host: bool,
    /// Path from the host, as far as it is known
    pub path: PathKnowledge,
}

/// Map of every known cube, including this node.
#[derive(Debug, Clone)]
pub struct TopologyMap {
    cubes: BTreeMap<NodeId, CubeEntry>,
    sides: SideTable,
    cube_size: i32,
}

impl TopologyMap {
    /// Create an empty map for a side table and cube footprint.
    pub fn new(sides: SideTable, cube_size: i32) -> Self {
        Self {
            cubes: BTreeMap::new(),
            sides,
            cube_size,
        }
    }

    /// Side table used to turn steps into offsets.
    pub fn sides(&self) -> &SideTable {
        &self.sides
    }

    /// Cube footprint in world units.
    pub fn cube_size(&self) -> i32 {
        self.cube_size
    }

    /// Place a cube relative to a reference cube on first contact.
    ///
    /// Does nothing if `node` is already known. Otherwise the cube is placed
    /// one offset through `side` from `reference`; when `side` is `None` or
    /// invalid, or the reference is unknown, it lands on the origin.
    pub fn record_adjacency(&mut self, node: NodeId, reference: NodeId, side: Option<u8>) -> &CubeEntry {
        if self.cubes.contains_key(&node) {
            return &self.cubes[&node];
        }

        let anchor = match side {
            Some(side) => match (self.sides.offset(side), self.cubes.get(&reference)) {
                (Some(offset), Some(base)) => {
                    Some(base.position.saturating_add(offset.saturating_scaled(self.cube_size)))
                }
                (None, _) => {
                    warn!(%node, side, sides = self.sides.len(), "Adjacency through invalid side");
                    None
                }
                (Some(_), None) => None,
            },
            None => None,
        };
        let position = anchor.unwrap_or(GridCoord::ORIGIN);

        self.cubes.entry(node).or_insert_with(|| {
            info!(%node, %position, "Added cube by adjacency");
            CubeEntry {
                node,
                position,
                is_host: false,
                path: PathKnowledge::Unknown,
            }
        })
    }

    /// Place a cube from its host-relative path, replacing any prior entry.
    ///
    /// Steps naming a side outside the table are skipped with a warning; the
    /// resulting position is then only partially correct.
    pub fn record_path(&mut self, node: NodeId, path: &Path) -> &CubeEntry {
        let position = self.position_of_path(node, path);
        let knowledge = PathKnowledge::from_path(path.clone());
        let is_host = knowledge.is_host();

        let entry = CubeEntry {
            node,
            position,
            is_host,
            path: knowledge,
        };

        match self.cubes.insert(node, entry) {
            Some(previous) if previous.position != position => {
                info!(%node, from = %previous.position, to = %position, %path, "Moved cube");
            }
            Some(_) => debug!(%node, %position, %path, "Refreshed cube"),
            None => info!(%node, %position, %path, is_host, "Added cube with path"),
        }

        &self.cubes[&node]
    }

    /// Mark a cube as the host at the origin.
    pub fn record_host(&mut self, node: NodeId) -> &CubeEntry {
        self.record_path(node, &Path::new())
    }

    /// Forget a cube.
    pub fn remove(&mut self, node: NodeId) -> Option<CubeEntry> {
        let removed = self.cubes.remove(&node);
        if let Some(entry) = &removed {
            info!(%node, position = %entry.position, "Removed cube");
        }
        removed
    }

    /// Forget every cube.
    pub fn clear(&mut self) {
        self.cubes.clear();
    }

    /// Entry for a cube.
    pub fn get(&self, node: NodeId) -> Option<&CubeEntry> {
        self.cubes.get(&node)
    }

    /// Whether the cube is known.
    pub fn contains(&self, node: NodeId) -> bool {
        self.cubes.contains_key(&node)
    }

    /// Stored path knowledge; `Unknown` for cubes not in the map.
    pub fn path_of(&self, node: NodeId) -> PathKnowledge {
        self.cubes
            .get(&node)
            .map(|entry| entry.path.clone())
            .unwrap_or_default()
    }

    /// Whether a world point falls inside any known cube.
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        let point = GridCoord::new(x, y);
        self.cubes
            .values()
            .any(|cube| cube.position.square_contains(self.cube_size, point))
    }

    /// Whether a world point falls inside one specific cube.
    pub fn node_contains_point(&self, node: NodeId, x: i32, y: i32) -> bool {
        self.cubes
            .get(&node)
            .is_some_and(|cube| cube.position.square_contains(self.cube_size, GridCoord::new(x, y)))
    }

    /// The cube whose square holds a world point, if any.
    pub fn cube_at(&self, x: i32, y: i32) -> Option<&CubeEntry> {
        let point = GridCoord::new(x, y);
        self.cubes
            .values()
            .find(|cube| cube.position.square_contains(self.cube_size, point))
    }

    /// The host entry, if known.
    pub fn host(&self) -> Option<&CubeEntry> {
        self.cubes.values().find(|cube| cube.is_host)
    }

    /// All entries, ordered by identity.
    pub fn iter(&self) -> impl Iterator<Item = &CubeEntry> {
        self.cubes.values()
    }

    /// Number of known cubes.
    pub fn len(&self) -> usize {
        self.cubes.len()
    }

    /// Whether no cube is known.
    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }

    fn position_of_path(&self, node: NodeId, path: &Path) -> GridCoord {
        path.steps()
            .iter()
            .enumerate()
            .fold(GridCoord::ORIGIN, |position, (index, &step)| match self.sides.offset(step) {
                Some(offset) => position.saturating_add(offset.saturating_scaled(self.cube_size)),
                None => {
                    warn!(%node, index, step, sides = self.sides.len(), "Invalid side in path, step skipped");
                    position
                }
            })
    }
}

impl Default for TopologyMap {
    fn default() -> Self {
        Self::new(SideTable::standard(), DEFAULT_CUBE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn path(steps: &[u8]) -> Path {
        Path::from_steps(steps.to_vec()).unwrap()
    }

    #[test]
    fn path_places_cube_in_world_units() {
        let mut map = TopologyMap::default();
        let entry = map.record_path(NodeId(9), &path(&[0, 0, 3]));

        assert_eq!(entry.position, GridCoord::new(256, 128));
        assert!(!entry.is_host);
    }

    #[test]
    fn empty_path_is_host_at_origin() {
        let mut map = TopologyMap::default();
        let entry = map.record_path(NodeId(1), &Path::new());

        assert_eq!(entry.position, GridCoord::ORIGIN);
        assert!(entry.is_host);
        assert_eq!(map.path_of(NodeId(1)), PathKnowledge::IsHost);
        assert_eq!(map.host().map(|h| h.node), Some(NodeId(1)));
    }

    #[test]
    fn path_overwrites_previous_entry() {
        let mut map = TopologyMap::default();
        map.record_path(NodeId(2), &path(&[0]));
        map.record_path(NodeId(2), &path(&[2, 2]));

        let entry = map.get(NodeId(2)).unwrap();
        assert_eq!(entry.position, GridCoord::new(-256, 0));
        assert_eq!(entry.path, PathKnowledge::Known(path(&[2, 2])));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn invalid_steps_are_skipped() {
        let mut map = TopologyMap::new(SideTable::standard_prefix(2).unwrap(), 128);
        // Step 3 is not wired on a two-sided installation.
        let entry = map.record_path(NodeId(4), &path(&[0, 3, 1]));

        assert_eq!(entry.position, GridCoord::new(128, -128));
        assert_eq!(entry.path, PathKnowledge::Known(path(&[0, 3, 1])));
    }

    #[test]
    fn adjacency_relative_to_known_reference() {
        let mut map = TopologyMap::default();
        map.record_host(NodeId(10));
        let entry = map.record_adjacency(NodeId(3), NodeId(10), Some(3));

        assert_eq!(entry.position, GridCoord::new(0, 128));
        assert_eq!(entry.path, PathKnowledge::Unknown);
    }

    #[test]
    fn adjacency_without_reference_lands_on_origin() {
        let mut map = TopologyMap::default();

        assert_eq!(map.record_adjacency(NodeId(3), NodeId(99), Some(0)).position, GridCoord::ORIGIN);
        assert_eq!(map.record_adjacency(NodeId(4), NodeId(3), None).position, GridCoord::ORIGIN);
        assert_eq!(map.record_adjacency(NodeId(5), NodeId(3), Some(7)).position, GridCoord::ORIGIN);
    }

    #[test]
    fn adjacency_never_overwrites() {
        let mut map = TopologyMap::default();
        map.record_path(NodeId(3), &path(&[1]));
        map.record_host(NodeId(10));

        let entry = map.record_adjacency(NodeId(3), NodeId(10), Some(0));
        assert_eq!(entry.position, GridCoord::new(0, -128));
        assert_eq!(entry.path, PathKnowledge::Known(path(&[1])));
    }

    #[test]
    fn known_cube_ignores_invalid_side() {
        let mut map = TopologyMap::default();
        map.record_path(NodeId(3), &path(&[2]));

        let entry = map.record_adjacency(NodeId(3), NodeId(3), Some(9)).clone();
        assert_eq!(entry.position, GridCoord::new(-128, 0));
        assert_eq!(entry.path, PathKnowledge::Known(path(&[2])));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn largest_footprint_fits_the_longest_path() {
        let mut map = TopologyMap::new(SideTable::standard(), MAX_CUBE_SIZE);
        let longest = path(&[0; MAX_PATH_LEN]);
        let entry = map.record_path(NodeId(2), &longest).clone();

        assert_eq!(entry.position, GridCoord::new(MAX_CUBE_SIZE * MAX_PATH_LEN as i32, 0));
        let neighbour = map.record_adjacency(NodeId(3), NodeId(2), Some(0)).position;
        assert!(map.node_contains_point(NodeId(3), neighbour.x + MAX_CUBE_SIZE - 1, 0));
    }

    #[test]
    fn oversized_footprint_saturates() {
        let mut map = TopologyMap::new(SideTable::standard(), 1 << 30);
        let entry = map.record_path(NodeId(2), &path(&[0, 0, 0])).clone();

        assert_eq!(entry.position, GridCoord::new(i32::MAX, 0));
        assert!(map.contains_point(i32::MAX, 0));
        assert_eq!(map.record_adjacency(NodeId(3), NodeId(2), Some(0)).position.x, i32::MAX);
    }

    #[test]
    fn unknown_nodes_have_unknown_path() {
        let map = TopologyMap::default();
        assert_eq!(map.path_of(NodeId(42)), PathKnowledge::Unknown);
    }

    #[test]
    fn remove_drops_entry() {
        let mut map = TopologyMap::default();
        map.record_path(NodeId(2), &path(&[0]));

        assert!(map.remove(NodeId(2)).is_some());
        assert!(map.remove(NodeId(2)).is_none());
        assert!(!map.contains(NodeId(2)));
    }

    #[test]
    fn world_bounds_cover_every_cube() {
        let mut map = TopologyMap::default();
        map.record_host(NodeId(10));
        map.record_path(NodeId(2), &path(&[0]));

        assert!(map.contains_point(0, 0));
        assert!(map.contains_point(200, 100));
        assert!(!map.contains_point(256, 0));
        assert!(!map.contains_point(-1, 0));
        assert_eq!(map.cube_at(200, 5).map(|c| c.node), Some(NodeId(2)));
    }

    #[test]
    fn node_bounds_are_specific() {
        let mut map = TopologyMap::default();
        map.record_host(NodeId(10));
        map.record_path(NodeId(2), &path(&[0]));

        assert!(map.node_contains_point(NodeId(2), 130, 0));
        assert!(!map.node_contains_point(NodeId(10), 130, 0));
        assert!(!map.node_contains_point(NodeId(77), 0, 0));
    }

    proptest! {
        #[test]
        fn position_is_sum_of_offsets(steps in prop::collection::vec(0u8..4, 0..40)) {
            let mut map = TopologyMap::default();
            let entry = map.record_path(NodeId(1), &path(&steps)).clone();

            let expected = steps.iter().fold(GridCoord::ORIGIN, |acc, &s| {
                acc + SideTable::STANDARD_OFFSETS[usize::from(s)] * DEFAULT_CUBE_SIZE
            });
            prop_assert_eq!(entry.position, expected);
            prop_assert!(map.node_contains_point(NodeId(1), expected.x, expected.y));
            prop_assert_eq!(entry.is_host, steps.is_empty());
        }
    }
}
