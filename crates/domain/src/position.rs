//! Head coordinates in integer micrometers.

use serde::{Deserialize, Serialize};

/// Plotter head position in micrometers.
///
/// `z` is informational: the device reports it, this crate never commands it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Position {
    /// The machine origin.
    pub const ORIGIN: Self = Self { x: 0, y: 0, z: 0 };

    #[must_use]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Offset by a planar delta, keeping `z`.
    ///
    /// Returns `None` on overflow.
    #[must_use]
    pub fn checked_offset(self, dx: i64, dy: i64) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
            z: self.z,
        })
    }

    /// Planar delta that moves `self` onto `target`.
    ///
    /// Returns `None` on overflow.
    #[must_use]
    pub fn delta_to(self, target: Self) -> Option<(i64, i64)> {
        Some((target.x.checked_sub(self.x)?, target.y.checked_sub(self.y)?))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "X={} Y={} Z={}", self.x, self.y, self.z)
    }
}
