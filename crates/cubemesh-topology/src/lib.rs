//! Cubemesh Topology
//!
//! Grid placement for a mesh of identical cubes wired face to face.
//!
//! # Coordinate Model
//!
//! Cubes sit on a flat square grid. The elected host anchors the origin and
//! every other cube is located by its *path*: the sequence of sides stepped
//! through, starting at the host, to reach it. Summing the side offsets along
//! a path (scaled by the cube footprint) yields the cube's world position.
//!
//! # Path Encoding
//!
//! Paths travel inside heartbeats as two-bit direction codes packed four per
//! byte, LSB first. The step count is transmitted separately because packing
//! carries no end marker. See [`path`].
//!
//! # Shared Map
//!
//! [`TopologyMap`] holds one [`CubeEntry`] per known cube, self included,
//! and answers the bounds queries used by everything drawn on the cubes.

mod error;
mod grid;
mod id;
mod map;
pub mod path;
mod sides;

pub use error::{Result, TopologyError};
pub use grid::GridCoord;
pub use id::NodeId;
pub use map::{CubeEntry, TopologyMap, DEFAULT_CUBE_SIZE, MAX_CUBE_SIZE};
pub use path::{pack_directions, unpack_directions, Path, PathKnowledge, MAX_PATH_LEN};
pub use sides::{are_adjacent, SideTable, MAX_SIDES};
