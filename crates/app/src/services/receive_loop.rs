//! Background receive loop for a live link.
//!
//! Runs on the blocking pool for the lifetime of a connection. Each line is
//! logged; position reports are applied to the store and fanned out to any
//! position refresh waiting for a reply. It is the only reader of the link.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use plotter_domain::command_record::CommandRecord;
use plotter_domain::position::Position;
use plotter_domain::report::decode_position;

use crate::log_bus::LogBus;
use crate::ports::LineReader;
use crate::state_store::StateStore;

pub(crate) struct ReceiveLoop<R> {
    pub(crate) reader: R,
    pub(crate) cancel: Arc<AtomicBool>,
    pub(crate) state: StateStore,
    pub(crate) log: LogBus,
    pub(crate) reports: broadcast::Sender<Position>,
    pub(crate) poll: Duration,
}

impl<R: LineReader> ReceiveLoop<R> {
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.run())
    }

    fn run(mut self) {
        tracing::debug!("receive loop started");
        while !self.cancel.load(Ordering::Acquire) {
            match self.reader.read_line(self.poll) {
                Ok(Some(line)) => self.handle_line(&line),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(%err, "serial read failed");
                    // avoid spinning on a persistently failing port
                    std::thread::sleep(self.poll);
                }
            }
        }
        tracing::debug!("receive loop stopped");
    }

    fn handle_line(&self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return;
        }
        self.log.publish(CommandRecord::received(line));

        match decode_position(line) {
            Ok(position) => {
                tracing::debug!(%position, "position report");
                self.state.apply_position(position);
                // no receiver just means no refresh is waiting
                let _ = self.reports.send(position);
            }
            Err(err) => tracing::trace!(%err, line, "not a position report"),
        }
    }
}
