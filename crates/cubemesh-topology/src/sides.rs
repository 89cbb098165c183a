//! Side offset table.
//!
//! Each physical face of a cube is a *side*, numbered `0..N`. The table maps a
//! side to the unit grid offset reached by stepping through it. Direction codes
//! inside encoded paths reuse the side numbers and are two bits wide, so a
//! table can hold at most [`MAX_SIDES`] entries.
//!
//! The table is deployment configuration, not a constant: a node shape with
//! fewer faces wired simply carries a shorter table.

use crate::error::{Result, TopologyError};
use crate::GridCoord;

/// Most sides addressable by a two-bit direction code.
pub const MAX_SIDES: usize = 4;

/// Per-installation mapping from side index to unit grid offset.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SideTable {
    offsets: Vec<GridCoord>,
}

impl SideTable {
    /// The four-faced layout used by the reference cube.
    pub const STANDARD_OFFSETS: [GridCoord; MAX_SIDES] = [
        GridCoord { x: 1, y: 0 },  // Side 0: +x
        GridCoord { x: 0, y: -1 }, // Side 1: -y
        GridCoord { x: -1, y: 0 }, // Side 2: -x
        GridCoord { x: 0, y: 1 },  // Side 3: +y
    ];

    /// Build a table from explicit offsets.
    pub fn new(offsets: Vec<GridCoord>) -> Result<Self> {
        if offsets.is_empty() {
            return Err(TopologyError::EmptySideTable);
        }
        if offsets.len() > MAX_SIDES {
            return Err(TopologyError::TooManySides {
                count: offsets.len(),
                max: MAX_SIDES,
            });
        }
        Ok(Self { offsets })
    }

    /// The standard four-sided table.
    pub fn standard() -> Self {
        Self {
            offsets: Self::STANDARD_OFFSETS.to_vec(),
        }
    }

    /// The first `count` sides of the standard table.
    pub fn standard_prefix(count: usize) -> Result<Self> {
        Self::new(Self::STANDARD_OFFSETS.iter().take(count).copied().collect())
    }

    /// Number of sides wired on this installation.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Always false for a constructed table; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Whether `side` names a wired face.
    pub fn is_valid(&self, side: u8) -> bool {
        usize::from(side) < self.offsets.len()
    }

    /// Unit offset for a side, if the side exists.
    pub fn offset(&self, side: u8) -> Option<GridCoord> {
        self.offsets.get(usize::from(side)).copied()
    }

    /// All offsets in side order.
    pub fn offsets(&self) -> &[GridCoord] {
        &self.offsets
    }

    /// Unit-offset neighbours of a cell, one per side.
    pub fn neighbors_of(&self, cell: GridCoord) -> impl Iterator<Item = GridCoord> + '_ {
        self.offsets.iter().map(move |&d| cell + d)
    }
}

impl Default for SideTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Check if two unit cells are adjacent through some side of `table`.
pub fn are_adjacent(table: &SideTable, a: GridCoord, b: GridCoord) -> bool {
    table.offsets().contains(&(b - a))
}
