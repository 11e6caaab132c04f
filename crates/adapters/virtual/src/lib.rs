//! # plotter-adapter-virtual
//!
//! In-process simulated plotter behind the `Transport` port.
//!
//! The session engine treats it exactly like a serial link: it is opened,
//! written to and read from, and it answers `!ON0;` with a position report.
//! Useful for running the console without hardware and for integration tests.
//!
//! Test hooks let a caller inspect the wire traffic, push unsolicited lines,
//! silence replies, or make opening and writing fail.
//!
//! ## Dependency rule
//!
//! Depends on `plotter-app` (port traits) and `plotter-domain` only.

mod device;

use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use plotter_app::ports::{LineReader, LineWriter, Transport};
use plotter_domain::command::Command;
use plotter_domain::device_state::DeviceState;
use plotter_domain::error::{ConnectError, TransportError};
use plotter_domain::position::Position;
use plotter_domain::session_config::SessionConfig;

pub use device::SimulatedDevice;

/// Port name that selects the simulated plotter.
pub const VIRTUAL_PORT: &str = "virtual";

#[derive(Default)]
struct Shared {
    device: SimulatedDevice,
    written: Vec<String>,
    outbox: Option<mpsc::Sender<String>>,
    fail_open: bool,
    fail_writes: bool,
}

/// Handle to a simulated plotter. Clones share the same device.
#[derive(Clone, Default)]
pub struct VirtualPlotter {
    shared: Arc<Mutex<Shared>>,
}

impl VirtualPlotter {
    /// A simulated plotter whose head starts at `position`.
    #[must_use]
    pub fn at(position: Position) -> Self {
        let plotter = Self::default();
        plotter.lock().device = SimulatedDevice::at(position);
        plotter
    }

    /// Mechanical state as the device sees it.
    #[must_use]
    pub fn device_state(&self) -> DeviceState {
        self.lock().device.state()
    }

    /// Every write received so far, one entry per write.
    #[must_use]
    pub fn written(&self) -> Vec<String> {
        self.lock().written.clone()
    }

    /// Move the head behind the engine's back (a manual nudge).
    pub fn set_position(&self, position: Position) {
        self.lock().device.set_position(position);
    }

    /// Stop or resume answering position queries.
    pub fn set_silent(&self, silent: bool) {
        self.lock().device.set_silent(silent);
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Emit a line on the read side, as if the device had sent it.
    ///
    /// Returns `false` when no link is open.
    pub fn inject_line(&self, line: impl Into<String>) -> bool {
        self.lock()
            .outbox
            .as_ref()
            .is_some_and(|tx| tx.send(line.into()).is_ok())
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for VirtualPlotter {
    type Reader = VirtualReader;
    type Writer = VirtualWriter;

    fn open(&self, config: &SessionConfig) -> Result<(VirtualReader, VirtualWriter), ConnectError> {
        let mut shared = self.lock();
        if shared.fail_open {
            return Err(ConnectError::PortUnavailable {
                port: config.port.clone(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "simulated plotter refused to open",
                )),
            });
        }

        let (tx, rx) = mpsc::channel();
        shared.outbox = Some(tx);
        tracing::info!(port = %config.port, baud_rate = config.baud_rate, "simulated plotter opened");
        Ok((
            VirtualReader { lines: rx },
            VirtualWriter {
                plotter: Some(self.clone()),
            },
        ))
    }
}

/// Read half: lines the simulated device has sent.
pub struct VirtualReader {
    lines: mpsc::Receiver<String>,
}

impl LineReader for VirtualReader {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        match self.lines.recv_timeout(timeout) {
            Ok(line) => Ok(Some(line)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

/// Write half: feeds statements to the simulated device.
pub struct VirtualWriter {
    plotter: Option<VirtualPlotter>,
}

impl LineWriter for VirtualWriter {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let plotter = self.plotter.as_ref().ok_or(TransportError::Closed)?;
        let mut shared = plotter.lock();
        if shared.fail_writes {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "simulated write failure",
            )));
        }

        let text = String::from_utf8_lossy(bytes).into_owned();
        for command in Command::parse_program(&text) {
            if let Some(reply) = shared.device.apply(&command) {
                if let Some(tx) = shared.outbox.as_ref() {
                    // reader gone means the link is closing
                    let _ = tx.send(reply);
                }
            }
        }
        shared.written.push(text);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(plotter) = self.plotter.take() {
            plotter.lock().outbox = None;
            tracing::info!("simulated plotter closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(plotter: &VirtualPlotter) -> (VirtualReader, VirtualWriter) {
        plotter
            .open(&SessionConfig::for_port(VIRTUAL_PORT))
            .unwrap()
    }

    #[test]
    fn should_answer_query_on_read_side() {
        let plotter = VirtualPlotter::at(Position::new(1000, 2000, 0));
        let (mut reader, mut writer) = open(&plotter);

        writer.write(b"!ON0;").unwrap();

        let line = reader.read_line(Duration::from_millis(100)).unwrap();
        assert_eq!(line.as_deref(), Some("P1000,2000,0C"));
    }

    #[test]
    fn should_time_out_without_traffic() {
        let plotter = VirtualPlotter::default();
        let (mut reader, _writer) = open(&plotter);

        let line = reader.read_line(Duration::from_millis(10)).unwrap();

        assert!(line.is_none());
    }

    #[test]
    fn should_apply_every_statement_of_a_write() {
        let plotter = VirtualPlotter::default();
        let (_reader, mut writer) = open(&plotter);

        writer.write(b"!EM1;PD;PR5000,0;PR0,5000;").unwrap();

        let state = plotter.device_state();
        assert!(state.motor_enabled);
        assert!(state.pen_down);
        assert_eq!(state.position, Position::new(5000, 5000, 0));
        assert_eq!(plotter.written(), vec!["!EM1;PD;PR5000,0;PR0,5000;".to_string()]);
    }

    #[test]
    fn should_fail_open_when_asked() {
        let plotter = VirtualPlotter::default();
        plotter.set_fail_open(true);

        let result = plotter.open(&SessionConfig::for_port(VIRTUAL_PORT));

        assert!(matches!(result, Err(ConnectError::PortUnavailable { .. })));
    }

    #[test]
    fn should_fail_writes_when_asked() {
        let plotter = VirtualPlotter::default();
        let (_reader, mut writer) = open(&plotter);
        plotter.set_fail_writes(true);

        let result = writer.write(b"PD;");

        assert!(matches!(result, Err(TransportError::Io(_))));
        assert!(!plotter.device_state().pen_down);
    }

    #[test]
    fn should_reject_writes_after_close() {
        let plotter = VirtualPlotter::default();
        let (mut reader, mut writer) = open(&plotter);

        writer.close();

        assert!(matches!(writer.write(b"PU;"), Err(TransportError::Closed)));
        assert!(matches!(
            reader.read_line(Duration::from_millis(10)),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn should_deliver_injected_lines() {
        let plotter = VirtualPlotter::default();
        let (mut reader, _writer) = open(&plotter);

        assert!(plotter.inject_line("P1,2,3C"));

        let line = reader.read_line(Duration::from_millis(100)).unwrap();
        assert_eq!(line.as_deref(), Some("P1,2,3C"));
    }

    #[test]
    fn should_not_inject_without_open_link() {
        let plotter = VirtualPlotter::default();
        assert!(!plotter.inject_line("P1,2,3C"));
    }
}
