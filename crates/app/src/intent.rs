//! UI intents queued into the session engine.
//!
//! Lengths arrive in millimeters and are converted to micrometers here, once,
//! before anything reaches the engine.

use plotter_domain::command::Command;
use plotter_domain::error::PlotterError;
use plotter_domain::session_config::SessionConfig;
use plotter_domain::units::mm_to_um;
use plotter_domain::workspace::Workspace;

use crate::ports::Transport;
use crate::services::PlotterSession;

/// Something a user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Connect(SessionConfig),
    Disconnect,
    SetEmulation(bool),
    /// Text typed into the command box.
    SendRaw(String),
    /// A multi-statement flow, sent as one write.
    ExecuteFlow(String),
    /// One of the quick-command buttons.
    Command(Command),
    MoveRelative {
        dx_mm: i64,
        dy_mm: i64,
    },
    /// A missing axis keeps its current coordinate.
    MoveAbsolute {
        x_mm: Option<i64>,
        y_mm: Option<i64>,
    },
    Jog {
        direction: JogDirection,
        step_mm: i64,
    },
    SetWorkspace {
        max_x_mm: i64,
        max_y_mm: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogDirection {
    Up,
    Down,
    Left,
    Right,
}

impl JogDirection {
    /// Unit vector of the jog. Up is +Y.
    #[must_use]
    pub fn unit(self) -> (i64, i64) {
        match self {
            Self::Up => (0, 1),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

impl<T: Transport> PlotterSession<T> {
    /// Run one intent to completion.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying engine operation returns, or
    /// [`PlotterError::Validation`] when a length does not fit in micrometers
    /// or a workspace limit is negative.
    pub async fn handle(&self, intent: Intent) -> Result<(), PlotterError> {
        tracing::debug!(?intent, "handling intent");
        match intent {
            Intent::Connect(config) => self.connect(config).await,
            Intent::Disconnect => {
                self.disconnect().await;
                Ok(())
            }
            Intent::SetEmulation(enabled) => {
                self.set_emulation(enabled).await;
                Ok(())
            }
            Intent::SendRaw(text) | Intent::ExecuteFlow(text) => self.send_raw(&text).await,
            Intent::Command(command) => self.send_command(command).await,
            Intent::MoveRelative { dx_mm, dy_mm } => {
                self.move_relative(mm_to_um(dx_mm)?, mm_to_um(dy_mm)?)
                    .await
                    .map(drop)
            }
            Intent::MoveAbsolute { x_mm: None, y_mm: None } => Ok(()),
            Intent::MoveAbsolute { x_mm, y_mm } => {
                let x = x_mm.map(mm_to_um).transpose()?;
                let y = y_mm.map(mm_to_um).transpose()?;
                self.move_absolute_axes(x, y).await.map(drop)
            }
            Intent::Jog { direction, step_mm } => {
                let step = mm_to_um(step_mm)?;
                let (ux, uy) = direction.unit();
                self.move_relative(ux * step, uy * step).await.map(drop)
            }
            Intent::SetWorkspace { max_x_mm, max_y_mm } => {
                let workspace = Workspace::new(mm_to_um(max_x_mm)?, mm_to_um(max_y_mm)?)?;
                self.set_workspace(workspace);
                Ok(())
            }
        }
    }
}
