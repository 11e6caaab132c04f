//! Serial adapter errors and their mapping onto the port-level errors.

use plotter_domain::error::{ConnectError, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("serial port error")]
    Port(#[from] serialport::Error),

    #[error("serial IO error")]
    Io(#[from] std::io::Error),
}

impl SerialError {
    /// Wrap as a failure to open `port`.
    #[must_use]
    pub fn into_connect(self, port: &str) -> ConnectError {
        ConnectError::PortUnavailable {
            port: port.to_string(),
            source: Box::new(self),
        }
    }
}

impl From<SerialError> for TransportError {
    fn from(err: SerialError) -> Self {
        match err {
            SerialError::Io(err) => Self::Io(err),
            SerialError::Port(err) => Self::Io(err.into()),
        }
    }
}
