//! Transport port: the byte link to a plotter.
//!
//! Opening a transport yields a read half and a write half. The read half is
//! owned by the background receive loop, the write half by the command path,
//! so the two never contend for the same handle.

use std::time::Duration;

use plotter_domain::error::{ConnectError, TransportError};
use plotter_domain::session_config::SessionConfig;

/// Something that can open a link to a plotter.
///
/// Implementations live in adapter crates (`serial`, `virtual`).
pub trait Transport: Send + Sync + 'static {
    type Reader: LineReader;
    type Writer: LineWriter;

    /// Open the link with the given framing.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] when the port is unavailable or the
    /// configuration cannot be applied.
    fn open(&self, config: &SessionConfig) -> Result<(Self::Reader, Self::Writer), ConnectError>;
}

/// Read half of an open link.
pub trait LineReader: Send + 'static {
    /// Wait up to `timeout` for one complete line, without its terminator.
    ///
    /// A timeout is not an error: it yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on an IO failure.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError>;
}

/// Write half of an open link.
pub trait LineWriter: Send + 'static {
    /// Write all bytes to the device.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on an IO failure or after [`close`](Self::close).
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Release the link. Further writes fail with [`TransportError::Closed`].
    fn close(&mut self);
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    type Reader = T::Reader;
    type Writer = T::Writer;

    fn open(&self, config: &SessionConfig) -> Result<(Self::Reader, Self::Writer), ConnectError> {
        (**self).open(config)
    }
}

impl<R: LineReader + ?Sized> LineReader for Box<R> {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        (**self).read_line(timeout)
    }
}

impl<W: LineWriter + ?Sized> LineWriter for Box<W> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }

    fn close(&mut self) {
        (**self).close();
    }
}
