//! Device state: the engine's view of the plotter head.

use serde::{Deserialize, Serialize};

use crate::position::Position;

/// Logical plotter state tracked by the session engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub position: Position,
    pub pen_down: bool,
    pub motor_enabled: bool,
}

/// Status shown by the position marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStatus {
    PenUp,
    PenDown,
    MotorEnabled,
}

impl DeviceState {
    /// Marker status; an enabled motor wins over pen state.
    #[must_use]
    pub fn marker(&self) -> MarkerStatus {
        if self.motor_enabled {
            MarkerStatus::MotorEnabled
        } else if self.pen_down {
            MarkerStatus::PenDown
        } else {
            MarkerStatus::PenUp
        }
    }
}
