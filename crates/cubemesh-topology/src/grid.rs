//! Grid coordinate system for the cube mesh.
//!
//! Every cube occupies one square cell of a flat grid. Offsets between
//! neighbouring cells are expressed in *cells* (unit steps), while placed
//! positions are expressed in *world units*, i.e. cells multiplied by the
//! physical cube footprint. The host always sits at the origin.

use std::ops::{Add, Mul, Neg, Sub};

/// A point or offset on the cube grid.
///
/// The same type is used for unit offsets from the side table and for
/// world-unit positions; [`GridCoord::scaled`] converts between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridCoord {
    /// Horizontal axis, positive to the right
    pub x: i32,
    /// Vertical axis, positive upwards
    pub y: i32,
}

impl GridCoord {
    /// Origin of the coordinate system (the host's corner).
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    /// Create a new coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Scale a unit offset into world units.
    pub const fn scaled(&self, unit: i32) -> Self {
        Self {
            x: self.x * unit,
            y: self.y * unit,
        }
    }

    /// Scale a unit offset into world units, clamping at the `i32` range.
    pub const fn saturating_scaled(&self, unit: i32) -> Self {
        Self {
            x: self.x.saturating_mul(unit),
            y: self.y.saturating_mul(unit),
        }
    }

    /// Component-wise addition clamped at the `i32` range.
    pub const fn saturating_add(&self, other: Self) -> Self {
        Self {
            x: self.x.saturating_add(other.x),
            y: self.y.saturating_add(other.y),
        }
    }

    /// Manhattan distance between two coordinates.
    pub fn manhattan(&self, other: &Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Whether `point` lies inside the `size`×`size` square anchored here.
    ///
    /// The square is half-open: the anchor edges are inside, the far edges
    /// belong to the next cell.
    pub fn square_contains(&self, size: i32, point: Self) -> bool {
        let within = |anchor: i32, p: i32| {
            let (anchor, p) = (i64::from(anchor), i64::from(p));
            p >= anchor && p < anchor + i64::from(size)
        };
        within(self.x, point.x) && within(self.y, point.y)
    }
}

impl Add for GridCoord {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for GridCoord {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl Neg for GridCoord {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl Mul<i32> for GridCoord {
    type Output = Self;

    #[inline]
    fn mul(self, unit: i32) -> Self {
        self.scaled(unit)
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
