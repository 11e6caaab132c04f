//! Simulated plotter head: applies statements the way the firmware would.

use plotter_domain::command::Command;
use plotter_domain::device_state::DeviceState;
use plotter_domain::position::Position;
use plotter_domain::report::encode_position;

/// Mechanical state of the simulated plotter.
///
/// Unlike the engine, the device itself enforces no workspace. A move that
/// would overflow the coordinate space is dropped.
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    state: DeviceState,
    silent: bool,
}

impl SimulatedDevice {
    #[must_use]
    pub fn at(position: Position) -> Self {
        Self {
            state: DeviceState {
                position,
                ..DeviceState::default()
            },
            silent: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn set_position(&mut self, position: Position) {
        self.state.position = position;
    }

    /// Stop answering position queries, as a device with a broken RX line would.
    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    /// Apply one statement and return the line the device answers with, if any.
    pub fn apply(&mut self, command: &Command) -> Option<String> {
        match command {
            Command::PenUp => self.state.pen_down = false,
            Command::PenDown => self.state.pen_down = true,
            Command::Motor(enabled) => self.state.motor_enabled = *enabled,
            Command::MoveRelative { dx, dy } => match self.state.position.checked_offset(*dx, *dy) {
                Some(target) => self.state.position = target,
                None => tracing::debug!(dx, dy, "simulated move overflows, dropped"),
            },
            Command::MoveAbsolute { x, y } => {
                self.state.position = Position::new(*x, *y, self.state.position.z);
            }
            Command::QueryPosition if !self.silent => {
                return Some(encode_position(self.state.position));
            }
            Command::Initialize | Command::QueryPosition | Command::Raw(_) => {}
        }
        None
    }
}
