//! Session engine: connection lifecycle, command dispatch, workspace
//! enforcement and the position-refresh protocol.
//!
//! ```text
//!                 connect(ok)                  set_emulation(true)
//!  Disconnected ───────────────▶ Connected ───────────────────────▶ Emulated
//!       ▲  ▲        (Connecting)     │                                 │
//!       │  └──────── disconnect ─────┘                                 │
//!       └────────────────────── set_emulation(false) ──────────────────┘
//! ```
//!
//! All commands, connects and disconnects are serialized through one async
//! lock, which also makes a position query and its reply one atomic step.
//! After a move on a real link, a deferred refresh takes the same lock to
//! resynchronize the cached position with the device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::Stream;

use plotter_domain::command::{Command, normalize};
use plotter_domain::command_record::CommandRecord;
use plotter_domain::device_state::DeviceState;
use plotter_domain::error::{ConnectError, OutOfBounds, PlotterError, TransportError};
use plotter_domain::mode::Mode;
use plotter_domain::position::Position;
use plotter_domain::session_config::SessionConfig;
use plotter_domain::workspace::{Workspace, check_absolute, check_relative};

use crate::log_bus::LogBus;
use crate::ports::{LineWriter, Transport};
use crate::services::receive_loop::ReceiveLoop;
use crate::state_store::StateStore;

const BOUNDS_NOTICE: &str = "Movement would go outside workspace! Command not executed.";

/// Tunables for a [`PlotterSession`].
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Upper bound on a single blocking read in the receive loop.
    pub read_poll: Duration,
    /// How long a position refresh waits for the device to answer.
    pub query_timeout: Duration,
    /// Terminal log records buffered per subscriber.
    pub log_capacity: usize,
    /// Delay before re-reading the position after a move on a real link.
    /// `None` disables the follow-up query.
    pub resync_delay: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            read_poll: Duration::from_millis(100),
            query_timeout: Duration::from_millis(250),
            log_capacity: 256,
            resync_delay: Some(Duration::from_millis(200)),
        }
    }
}

enum Link<W> {
    Disconnected,
    Connected(Connection<W>),
    Emulated,
}

struct Connection<W> {
    port: String,
    writer: Arc<Mutex<W>>,
    cancel: Arc<AtomicBool>,
    receiver: JoinHandle<()>,
}

impl<W> Drop for Connection<W> {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Release);
    }
}

impl<W: LineWriter> Connection<W> {
    async fn write(&self, text: &str) -> Result<(), TransportError> {
        let writer = Arc::clone(&self.writer);
        let bytes = text.as_bytes().to_vec();
        tokio::task::spawn_blocking(move || {
            writer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write(&bytes)
        })
        .await
        .map_err(|err| TransportError::Io(std::io::Error::other(err)))?
    }
}

/// The `!ON0;` round trip, shared with deferred refreshes.
#[derive(Clone)]
struct PositionQuery {
    reports: broadcast::Sender<Position>,
    state: StateStore,
    log: LogBus,
    timeout: Duration,
}

impl PositionQuery {
    /// Query, then wait for the receive loop to hand over the next report.
    /// A missing reply keeps the cached position.
    async fn run<W: LineWriter>(&self, conn: &Connection<W>) -> Position {
        let mut reports = self.reports.subscribe();
        let query = Command::QueryPosition.encode();
        if let Err(err) = conn.write(&query).await {
            tracing::warn!(%err, "position query failed, keeping cached position");
            return self.state.snapshot().position;
        }
        self.log.publish(CommandRecord::sent(&query));

        match tokio::time::timeout(self.timeout, reports.recv()).await {
            Ok(Ok(position)) => position,
            Ok(Err(err)) => {
                tracing::debug!(%err, "position report channel interrupted");
                self.state.snapshot().position
            }
            Err(_) => {
                tracing::debug!("no position report before timeout, keeping cached position");
                self.state.snapshot().position
            }
        }
    }
}

/// One plotter session: owns the tracked state and, when connected, the link.
pub struct PlotterSession<T: Transport> {
    transport: Arc<T>,
    options: SessionOptions,
    link: Arc<tokio::sync::Mutex<Link<T::Writer>>>,
    state: StateStore,
    workspace: watch::Sender<Workspace>,
    mode: watch::Sender<Mode>,
    log: LogBus,
    query: PositionQuery,
}

impl<T: Transport> PlotterSession<T> {
    /// Create a disconnected session on the default workspace.
    pub fn new(transport: T, options: SessionOptions) -> Self {
        let (reports, _) = broadcast::channel(16);
        let state = StateStore::default();
        let log = LogBus::new(options.log_capacity);
        Self {
            transport: Arc::new(transport),
            options,
            link: Arc::new(tokio::sync::Mutex::new(Link::Disconnected)),
            query: PositionQuery {
                reports,
                state: state.clone(),
                log: log.clone(),
                timeout: options.query_timeout,
            },
            state,
            workspace: watch::Sender::new(Workspace::default()),
            mode: watch::Sender::new(Mode::Disconnected),
            log,
        }
    }

    /// Copy of the tracked device state.
    #[must_use]
    pub fn snapshot(&self) -> DeviceState {
        self.state.snapshot()
    }

    /// Receiver notified whenever the tracked state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<DeviceState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        *self.mode.borrow()
    }

    #[must_use]
    pub fn subscribe_mode(&self) -> watch::Receiver<Mode> {
        self.mode.subscribe()
    }

    #[must_use]
    pub fn workspace(&self) -> Workspace {
        *self.workspace.borrow()
    }

    /// Replace the workspace. The current position is not re-validated.
    pub fn set_workspace(&self, workspace: Workspace) {
        tracing::info!(max_x = workspace.max_x, max_y = workspace.max_y, "workspace updated");
        self.workspace.send_replace(workspace);
    }

    /// Terminal log from now on, as a stream.
    pub fn subscribe_log(&self) -> impl Stream<Item = CommandRecord> + Send + use<T> {
        self.log.stream()
    }

    /// The terminal log bus itself.
    #[must_use]
    pub fn log(&self) -> &LogBus {
        &self.log
    }

    /// Open a real link and start its receive loop.
    ///
    /// An existing connection is closed first.
    ///
    /// # Errors
    ///
    /// Returns [`PlotterError::EmulationActive`] in emulation mode and
    /// [`PlotterError::Connect`] when the config is invalid or the port cannot
    /// be opened; the session is then left disconnected.
    #[tracing::instrument(skip(self, config), fields(port = %config.port))]
    pub async fn connect(&self, config: SessionConfig) -> Result<(), PlotterError> {
        let mut link = self.link.lock().await;
        if matches!(*link, Link::Emulated) {
            self.log.publish(CommandRecord::notice(
                "Emulation mode active. No serial connection needed.",
            ));
            return Err(PlotterError::EmulationActive);
        }
        self.close(&mut link).await;

        if let Err(err) = config.validate() {
            self.log
                .publish(CommandRecord::notice(format!("Connection error: {err}")));
            return Err(err.into());
        }

        self.mode.send_replace(Mode::Connecting);
        let (reader, writer) = match self.open(&config).await {
            Ok(halves) => halves,
            Err(err) => {
                tracing::error!(%err, "failed to open transport");
                self.mode.send_replace(Mode::Disconnected);
                self.log
                    .publish(CommandRecord::notice(format!("Connection error: {err}")));
                return Err(err.into());
            }
        };

        let cancel = Arc::new(AtomicBool::new(false));
        let receiver = ReceiveLoop {
            reader,
            cancel: Arc::clone(&cancel),
            state: self.state.clone(),
            log: self.log.clone(),
            reports: self.query.reports.clone(),
            poll: self.options.read_poll,
        }
        .spawn();

        *link = Link::Connected(Connection {
            port: config.port.clone(),
            writer: Arc::new(Mutex::new(writer)),
            cancel,
            receiver,
        });
        self.mode.send_replace(Mode::Connected);
        tracing::info!("connected");
        self.log
            .publish(CommandRecord::notice(format!("Connected to {}", config.port)));
        Ok(())
    }

    /// Close the real link, if any. Safe to call in any mode, any number of times.
    pub async fn disconnect(&self) {
        let mut link = self.link.lock().await;
        self.close(&mut link).await;
    }

    /// Switch emulation on or off. Turning it on drops a live connection first.
    pub async fn set_emulation(&self, enabled: bool) {
        let mut link = self.link.lock().await;
        let emulated = matches!(*link, Link::Emulated);
        if enabled == emulated {
            return;
        }

        if enabled {
            self.close(&mut link).await;
            *link = Link::Emulated;
            self.mode.send_replace(Mode::Emulated);
            tracing::info!("emulation enabled");
            self.log
                .publish(CommandRecord::notice("Emulation mode enabled."));
        } else {
            *link = Link::Disconnected;
            self.mode.send_replace(Mode::Disconnected);
            tracing::info!("emulation disabled");
            self.log
                .publish(CommandRecord::notice("Emulation mode disabled."));
        }
    }

    /// Issue one command.
    ///
    /// # Errors
    ///
    /// Returns [`PlotterError::NotConnected`] without a session,
    /// [`PlotterError::OutOfBounds`] when an emulated move is rejected, and
    /// [`PlotterError::Transport`] when the write fails.
    pub async fn send_command(&self, command: Command) -> Result<(), PlotterError> {
        let wire = command.encode();
        let mut link = self.link.lock().await;
        self.dispatch(&mut link, &wire, std::slice::from_ref(&command))
            .await
    }

    /// Send user text as typed, appending `;` if missing. Blank text is ignored.
    ///
    /// Each statement is classified so state transitions follow wire order.
    ///
    /// # Errors
    ///
    /// Same as [`send_command`](Self::send_command).
    #[tracing::instrument(skip(self))]
    pub async fn send_raw(&self, text: &str) -> Result<(), PlotterError> {
        let wire = normalize(text);
        if wire.is_empty() {
            return Ok(());
        }
        let commands = Command::parse_program(&wire);
        let mut link = self.link.lock().await;
        self.dispatch(&mut link, &wire, &commands).await
    }

    /// Move by a delta in micrometers after checking the workspace.
    ///
    /// On a real link the position is refreshed from the device first.
    ///
    /// # Errors
    ///
    /// Returns [`PlotterError::NotConnected`] without a session,
    /// [`PlotterError::OutOfBounds`] when the target leaves the workspace
    /// (nothing is sent), or [`PlotterError::Transport`] when the write fails.
    #[tracing::instrument(skip(self))]
    pub async fn move_relative(&self, dx: i64, dy: i64) -> Result<Position, PlotterError> {
        let mut link = self.link.lock().await;
        let current = self.current_position(&link).await?;
        let target = check_relative(current, dx, dy, &self.workspace())
            .map_err(|err| self.reject(err))?;
        self.travel(&mut link, current, target).await
    }

    /// Move to an absolute planar target in micrometers.
    ///
    /// The target is checked before any IO, then converted to a relative
    /// move from the (refreshed) current position.
    ///
    /// # Errors
    ///
    /// Same as [`move_relative`](Self::move_relative).
    pub async fn move_absolute(&self, x: i64, y: i64) -> Result<Position, PlotterError> {
        self.move_absolute_axes(Some(x), Some(y)).await
    }

    /// Absolute move where a `None` axis keeps its current coordinate.
    ///
    /// Given axes are checked before any IO. Missing axes are taken from the
    /// refreshed position, so the kept axis does not move even when the cached
    /// position has drifted from the device.
    ///
    /// # Errors
    ///
    /// Same as [`move_relative`](Self::move_relative).
    #[tracing::instrument(skip(self))]
    pub async fn move_absolute_axes(
        &self,
        x: Option<i64>,
        y: Option<i64>,
    ) -> Result<Position, PlotterError> {
        let workspace = self.workspace();
        // a missing axis is checked once the current position is known
        let early = Position::new(x.unwrap_or(0), y.unwrap_or(0), 0);
        check_absolute(early, &workspace).map_err(|err| self.reject(err))?;

        let mut link = self.link.lock().await;
        let current = self.current_position(&link).await?;
        let target = Position::new(x.unwrap_or(current.x), y.unwrap_or(current.y), current.z);
        check_absolute(target, &workspace).map_err(|err| self.reject(err))?;
        self.travel(&mut link, current, target).await
    }

    /// Resynchronize the cached position with the device.
    ///
    /// In emulation the cached position is authoritative and returned as is.
    ///
    /// # Errors
    ///
    /// Returns [`PlotterError::NotConnected`] without a session.
    pub async fn refresh_position(&self) -> Result<Position, PlotterError> {
        let link = self.link.lock().await;
        self.current_position(&link).await
    }

    async fn current_position(&self, link: &Link<T::Writer>) -> Result<Position, PlotterError> {
        match link {
            Link::Disconnected => Err(PlotterError::NotConnected),
            Link::Emulated => Ok(self.state.snapshot().position),
            Link::Connected(conn) => Ok(self.query.run(conn).await),
        }
    }

    async fn travel(
        &self,
        link: &mut Link<T::Writer>,
        current: Position,
        target: Position,
    ) -> Result<Position, PlotterError> {
        let (dx, dy) = current.delta_to(target).ok_or_else(|| {
            self.reject(OutOfBounds {
                target,
                workspace: self.workspace(),
            })
        })?;

        let command = Command::MoveRelative { dx, dy };
        self.dispatch(link, &command.encode(), std::slice::from_ref(&command))
            .await?;

        if matches!(link, Link::Connected(_)) {
            // no per-command acknowledgment: assume the device moved
            self.state.apply_position(target);
            self.schedule_resync();
        }
        Ok(target)
    }

    /// Query the device once more after the move has had time to settle.
    fn schedule_resync(&self) {
        let Some(delay) = self.options.resync_delay else {
            return;
        };
        let link = Arc::clone(&self.link);
        let query = self.query.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let link = link.lock().await;
            if let Link::Connected(conn) = &*link {
                let position = query.run(conn).await;
                tracing::debug!(%position, "position resynchronized after move");
            }
        });
    }

    async fn dispatch(
        &self,
        link: &mut Link<T::Writer>,
        wire: &str,
        commands: &[Command],
    ) -> Result<(), PlotterError> {
        match link {
            Link::Disconnected => {
                tracing::warn!(command = wire, "command rejected, not connected");
                Err(PlotterError::NotConnected)
            }
            Link::Emulated => {
                self.log.publish(CommandRecord::sent(wire));
                let mut rejected = None;
                for command in commands {
                    if let Err(err) = self.apply_emulated(command) {
                        rejected.get_or_insert(err);
                    }
                }
                self.log
                    .publish(CommandRecord::notice("Emulation, no communication"));
                rejected.map_or(Ok(()), |err| Err(err.into()))
            }
            Link::Connected(conn) => {
                if let Err(err) = conn.write(wire).await {
                    tracing::error!(%err, port = %conn.port, command = wire, "write failed");
                    self.log
                        .publish(CommandRecord::notice(format!("Send error: {err}")));
                    return Err(err.into());
                }
                self.log.publish(CommandRecord::sent(wire));
                for command in commands {
                    self.apply_sent(command);
                }
                Ok(())
            }
        }
    }

    /// Pen and motor transitions for a command the device accepted.
    fn apply_sent(&self, command: &Command) {
        match command {
            Command::PenUp => self.state.apply_pen(false),
            Command::PenDown => self.state.apply_pen(true),
            Command::Motor(enabled) => self.state.apply_motor(*enabled),
            _ => {}
        }
    }

    /// Full state transition for an emulated command, moves included.
    fn apply_emulated(&self, command: &Command) -> Result<(), OutOfBounds> {
        let current = self.state.snapshot().position;
        let target = match command {
            Command::MoveRelative { dx, dy } => {
                check_relative(current, *dx, *dy, &self.workspace())
                    .map_err(|err| self.reject(err))?
            }
            Command::MoveAbsolute { x, y } => {
                let target = Position::new(*x, *y, current.z);
                check_absolute(target, &self.workspace()).map_err(|err| self.reject(err))?;
                target
            }
            other => {
                self.apply_sent(other);
                return Ok(());
            }
        };

        self.state.apply_position(target);
        self.log.publish(CommandRecord::notice(format!(
            "Emulation: New position X={} Y={}",
            target.x, target.y
        )));
        Ok(())
    }

    fn reject(&self, err: OutOfBounds) -> OutOfBounds {
        tracing::warn!(
            x = err.target.x,
            y = err.target.y,
            max_x = err.workspace.max_x,
            max_y = err.workspace.max_y,
            "move rejected, outside workspace"
        );
        self.log.publish(CommandRecord::notice(BOUNDS_NOTICE));
        err
    }

    /// Open the transport on the blocking pool: a serial open can stall.
    async fn open(
        &self,
        config: &SessionConfig,
    ) -> Result<(T::Reader, T::Writer), ConnectError> {
        let transport = Arc::clone(&self.transport);
        let blocking_config = config.clone();
        tokio::task::spawn_blocking(move || transport.open(&blocking_config))
            .await
            .map_err(|err| ConnectError::PortUnavailable {
                port: config.port.clone(),
                source: Box::new(err),
            })?
    }

    /// Stop the receive loop, wait for it, then close the writer.
    async fn close(&self, link: &mut Link<T::Writer>) {
        if !matches!(link, Link::Connected(_)) {
            return;
        }
        let Link::Connected(mut conn) = std::mem::replace(link, Link::Disconnected) else {
            return;
        };

        conn.cancel.store(true, Ordering::Release);
        if let Err(err) = (&mut conn.receiver).await {
            tracing::warn!(%err, "receive loop ended abnormally");
        }
        conn.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .close();

        self.mode.send_replace(Mode::Disconnected);
        tracing::info!(port = %conn.port, "disconnected");
        self.log.publish(CommandRecord::notice("Disconnected"));
    }
}
