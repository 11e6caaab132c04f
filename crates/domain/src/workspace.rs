//! Workspace: the rectangle the head may travel in, and the guard that
//! enforces it before any motion is issued.
//!
//! Bounds are a closed interval: a coordinate equal to the maximum is inside.

use serde::{Deserialize, Serialize};

use crate::error::{OutOfBounds, ValidationError};
use crate::position::Position;

/// Default X travel: 200 mm.
pub const DEFAULT_MAX_X: i64 = 200_000;
/// Default Y travel: 150 mm.
pub const DEFAULT_MAX_Y: i64 = 150_000;

/// Travel limits in micrometers. Both axes start at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub max_x: i64,
    pub max_y: i64,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            max_x: DEFAULT_MAX_X,
            max_y: DEFAULT_MAX_Y,
        }
    }
}

impl Workspace {
    /// Create a workspace after checking its limits.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NegativeWorkspace`] when either limit is negative.
    pub fn new(max_x: i64, max_y: i64) -> Result<Self, ValidationError> {
        if max_x < 0 || max_y < 0 {
            return Err(ValidationError::NegativeWorkspace { max_x, max_y });
        }
        Ok(Self { max_x, max_y })
    }

    /// Whether `target` lies within `[0, max_x] x [0, max_y]`.
    #[must_use]
    pub fn contains(&self, target: Position) -> bool {
        (0..=self.max_x).contains(&target.x) && (0..=self.max_y).contains(&target.y)
    }
}

/// Validate an absolute target.
///
/// # Errors
///
/// Returns [`OutOfBounds`] when any planar axis is negative or above its limit.
pub fn check_absolute(target: Position, workspace: &Workspace) -> Result<(), OutOfBounds> {
    if workspace.contains(target) {
        Ok(())
    } else {
        Err(OutOfBounds {
            target,
            workspace: *workspace,
        })
    }
}

/// Validate a relative move from `current` and return the resulting target.
///
/// # Errors
///
/// Returns [`OutOfBounds`] when `current + delta` leaves the workspace,
/// including when the sum overflows.
pub fn check_relative(
    current: Position,
    dx: i64,
    dy: i64,
    workspace: &Workspace,
) -> Result<Position, OutOfBounds> {
    let target = current.checked_offset(dx, dy).ok_or(OutOfBounds {
        target: Position::new(
            current.x.saturating_add(dx),
            current.y.saturating_add(dy),
            current.z,
        ),
        workspace: *workspace,
    })?;
    check_absolute(target, workspace)?;
    Ok(target)
}
