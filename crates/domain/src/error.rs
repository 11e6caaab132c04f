//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`PlotterError`]
//! via `#[from]` at the engine boundary.

use crate::position::Position;
use crate::workspace::Workspace;

/// Top-level error returned by every session-engine operation.
#[derive(Debug, thiserror::Error)]
pub enum PlotterError {
    /// Opening the transport failed; the engine stays disconnected.
    #[error("connection failed")]
    Connect(#[from] ConnectError),

    /// A command was attempted with no active session and no emulation.
    #[error("not connected to a plotter and emulation is disabled")]
    NotConnected,

    /// A real connection was requested while emulation mode is active.
    #[error("emulation mode active, no serial connection needed")]
    EmulationActive,

    /// The requested move would leave the workspace. Nothing was sent.
    #[error(transparent)]
    OutOfBounds(#[from] OutOfBounds),

    /// Writing to the device failed. The connection is left open.
    #[error("transport error")]
    Transport(#[from] TransportError),

    /// A value crossing the UI boundary was rejected.
    #[error("validation error")]
    Validation(#[from] ValidationError),
}

/// Failure to establish a session with the device.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The session configuration cannot describe a usable link.
    #[error("invalid session configuration: {0}")]
    InvalidConfig(&'static str),

    /// The port could not be opened (missing, busy, permission denied, …).
    #[error("port {port} unavailable")]
    PortUnavailable {
        port: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// IO failure on an open link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("serial IO error")]
    Io(#[from] std::io::Error),

    /// The link was closed before the operation.
    #[error("transport closed")]
    Closed,
}

/// A move target outside `[0, max]` on either axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error(
    "target X={} Y={} outside workspace {}x{} µm",
    target.x,
    target.y,
    workspace.max_x,
    workspace.max_y
)]
pub struct OutOfBounds {
    pub target: Position,
    pub workspace: Workspace,
}

/// Domain validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("workspace limits must not be negative (got {max_x}x{max_y})")]
    NegativeWorkspace { max_x: i64, max_y: i64 },

    #[error("{0} mm does not fit in micrometers")]
    UnitOverflow(i64),
}

/// A device line that is not a position report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("line does not start with 'P'")]
    MissingPrefix,

    #[error("expected 3 coordinates, got {0}")]
    MissingField(usize),

    #[error("invalid coordinate {0:?}")]
    InvalidNumber(String),
}
