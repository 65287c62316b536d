//! Grid coordinates and the movement metric.
//!
//! The service area is a square grid of `grid_size × grid_size` cells. Units
//! move one cell per step in any of the eight directions, so the number of
//! steps between two cells is their Chebyshev distance.

use serde::{Deserialize, Serialize};

/// A cell on the service grid.
///
/// Coordinates are plain values: they are copied into every message and
/// state entry, never shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    /// The grid origin, `(0, 0)`.
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns `true` if the coordinate lies inside a grid of the given size.
    #[must_use]
    pub const fn within(self, grid_size: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < grid_size && self.y < grid_size
    }

    /// The neighbouring cell one diagonal-capable step closer to `target`.
    ///
    /// Returns `self` unchanged when already at the target.
    #[must_use]
    pub fn step_toward(self, target: Coordinate) -> Self {
        Self {
            x: self.x + (target.x - self.x).signum(),
            y: self.y + (target.y - self.y).signum(),
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Number of unit steps between two cells: `max(|Δx|, |Δy|)`.
#[must_use]
pub fn grid_distance(a: Coordinate, b: Coordinate) -> u32 {
    a.x.abs_diff(b.x).max(a.y.abs_diff(b.y))
}
