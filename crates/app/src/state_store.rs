//! State store, the single source of truth for the tracked device state.
//!
//! Backed by a tokio [`watch`] channel: readers take cheap copies or wait for
//! changes, writers go through the typed transitions below. The command path
//! is the only writer of pen and motor; the receive loop writes position only.

use std::sync::Arc;

use tokio::sync::watch;

use plotter_domain::device_state::DeviceState;
use plotter_domain::position::Position;

/// Shared handle to the tracked [`DeviceState`]. Clones share the same state.
#[derive(Clone)]
pub struct StateStore {
    sender: Arc<watch::Sender<DeviceState>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(DeviceState::default())
    }
}

impl StateStore {
    #[must_use]
    pub fn new(initial: DeviceState) -> Self {
        Self {
            sender: Arc::new(watch::Sender::new(initial)),
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> DeviceState {
        *self.sender.borrow()
    }

    /// Receiver notified on every change, for redraws.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.sender.subscribe()
    }

    pub fn apply_pen(&self, down: bool) {
        self.sender.send_if_modified(|state| replace(&mut state.pen_down, down));
    }

    pub fn apply_motor(&self, enabled: bool) {
        self.sender
            .send_if_modified(|state| replace(&mut state.motor_enabled, enabled));
    }

    pub fn apply_position(&self, position: Position) {
        self.sender
            .send_if_modified(|state| replace(&mut state.position, position));
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
